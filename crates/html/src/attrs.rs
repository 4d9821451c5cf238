//! Attribute values and their default serialization.

use serde_json::Value;

use crate::entities::escape_attr;
use crate::format_number;

/// Value of an element attribute as authored in the node tree.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    /// `true` renders a bare attribute name, `false` omits the attribute.
    Bool(bool),
    /// Structured value, stringified as JSON before escaping.
    Json(Value),
    Null,
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Number(value as f64)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Number(f64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::String(s) => AttrValue::Text(s),
            Value::Number(n) => match n.as_f64() {
                Some(f) => AttrValue::Number(f),
                None => AttrValue::Json(Value::Number(n)),
            },
            other => AttrValue::Json(other),
        }
    }
}

/// Names that carry framework data rather than markup.
const RESERVED: &[&str] = &["children", "key", "ref"];

/// Serialize attributes in order, each prefixed by a single space.
///
/// Reserved names, invalid names and omitted values (`false`, `Null`) produce
/// nothing. Returns an empty string when no attribute renders.
pub fn render_attributes(attrs: &[(String, AttrValue)]) -> String {
    let mut out = String::new();
    for (name, value) in attrs {
        write_attribute(&mut out, name, value);
    }
    out
}

pub fn write_attribute(out: &mut String, name: &str, value: &AttrValue) {
    if RESERVED.contains(&name) {
        return;
    }
    if !is_valid_attr_name(name) {
        log::warn!(target: "html.attrs", "skipping invalid attribute name {name:?}");
        return;
    }
    match value {
        AttrValue::Null | AttrValue::Bool(false) => {}
        AttrValue::Bool(true) => {
            out.push(' ');
            out.push_str(name);
        }
        AttrValue::Text(text) => push_pair(out, name, text),
        AttrValue::Number(n) => push_pair(out, name, &format_number(*n)),
        AttrValue::Json(json) => push_pair(out, name, &json.to_string()),
    }
}

fn push_pair(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attr(value));
    out.push('"');
}

fn is_valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name.bytes().any(|b| {
            b.is_ascii_whitespace() || matches!(b, b'"' | b'\'' | b'>' | b'/' | b'=' | b'<')
        })
}

/// Look up an attribute value by case-insensitive name.
pub fn get_attr<'a>(attrs: &'a [(String, AttrValue)], key: &str) -> Option<&'a AttrValue> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}
