use thiserror::Error;

/// Failure that ends a render stream.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A component failed and carried no error handler, or its handler
    /// failed as well.
    #[error("component `{component}` failed: {cause:#}")]
    Component {
        component: String,
        cause: anyhow::Error,
    },
    /// A provider value that would be serialized for the client could not
    /// be turned into JSON.
    #[error("value of context `{context}` cannot be serialized: {message}")]
    ContextValue { context: String, message: String },
}

impl RenderError {
    pub fn component(name: &str, cause: anyhow::Error) -> Self {
        RenderError::Component {
            component: name.to_string(),
            cause,
        }
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_error_message_includes_cause_chain() {
        let cause = anyhow::anyhow!("socket closed").context("loading user");
        let err = RenderError::component("Profile", cause);
        assert_eq!(
            err.to_string(),
            "component `Profile` failed: loading user: socket closed"
        );
    }
}
