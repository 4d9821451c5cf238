use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid render config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("replace function {0:?} is not a valid script identifier")]
    ReplaceFunction(String),
}

/// Output knobs for one render.
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes:
///
/// ```toml
/// doctype = false
/// replace_function = "swap"
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Emit `<!DOCTYPE html>` when the root node is an `html` element.
    pub doctype: bool,
    /// Name of the client function invoked by each deferred unit.
    pub replace_function: String,
    /// Emit the replace function's definition before the first deferred unit.
    pub inject_replace_runtime: bool,
    /// Tag wrapping providers whose value is serialized for the client.
    pub provider_tag: String,
    /// `shadowrootmode` used by custom-element hosts.
    pub shadow_root_mode: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            doctype: true,
            replace_function: "u$".to_string(),
            inject_replace_runtime: true,
            provider_tag: "context-provider".to_string(),
            shadow_root_mode: "open".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.replace_function;
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(ConfigError::ReplaceFunction(name.clone()));
        }
        Ok(())
    }

    /// Script defining the replace function: moves template `U:{id}` into the
    /// place of placeholder `S:{id}` and removes the calling script.
    pub fn replace_runtime(&self) -> String {
        format!(
            "<script>{}=function(id){{var t=document.getElementById('U:'+id),\
             s=document.getElementById('S:'+id),r=document.getElementById('R:'+id);\
             if(t&&s){{s.replaceWith(t.content);t.remove()}}if(r)r.remove()}}</script>",
            self.replace_function
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RenderConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, RenderConfig::default());
        assert!(config.doctype);
        assert_eq!(config.replace_function, "u$");
    }

    #[test]
    fn partial_document_overrides_named_keys() {
        let config = RenderConfig::from_toml_str(
            "doctype = false\nprovider_tag = \"ctx-scope\"\n",
        )
        .expect("partial config");
        assert!(!config.doctype);
        assert_eq!(config.provider_tag, "ctx-scope");
        assert_eq!(config.shadow_root_mode, "open");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = RenderConfig::from_toml_str("doctype = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn replace_function_must_be_identifier() {
        let err = RenderConfig::from_toml_str("replace_function = \"a b\"").unwrap_err();
        assert!(matches!(err, ConfigError::ReplaceFunction(name) if name == "a b"));
    }

    #[test]
    fn runtime_uses_configured_name() {
        let config = RenderConfig {
            replace_function: "swap".into(),
            ..RenderConfig::default()
        };
        let script = config.replace_runtime();
        assert!(script.starts_with("<script>swap=function(id){"));
        assert!(script.ends_with("</script>"));
    }
}
