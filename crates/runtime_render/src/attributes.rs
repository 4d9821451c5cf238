use html::AttrValue;

use crate::request::RequestContext;

/// Turns an element's attributes into the text between tag name and `>`.
///
/// The result must be empty or start with a space.
pub trait AttributeRenderer {
    fn render(&self, attributes: &[(String, AttrValue)], ctx: &RequestContext, tag: &str) -> String;
}

/// Escapes values and drops reserved or omitted attributes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAttributes;

impl AttributeRenderer for DefaultAttributes {
    fn render(&self, attributes: &[(String, AttrValue)], _ctx: &RequestContext, _tag: &str) -> String {
        html::render_attributes(attributes)
    }
}

impl<F> AttributeRenderer for F
where
    F: Fn(&[(String, AttrValue)], &RequestContext, &str) -> String,
{
    fn render(&self, attributes: &[(String, AttrValue)], ctx: &RequestContext, tag: &str) -> String {
        self(attributes, ctx, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_renderer_escapes_values() {
        let attrs = vec![
            ("class".to_string(), AttrValue::from("a\"b")),
            ("hidden".to_string(), AttrValue::Bool(true)),
            ("key".to_string(), AttrValue::from("k1")),
        ];
        let out = DefaultAttributes.render(&attrs, &RequestContext::new(), "div");
        assert_eq!(out, " class=\"a&quot;b\" hidden");
    }

    #[test]
    fn closures_are_renderers() {
        let upper = |attrs: &[(String, AttrValue)], _: &RequestContext, tag: &str| {
            format!(" data-tag=\"{tag}\" data-count=\"{}\"", attrs.len())
        };
        let out = upper.render(&[], &RequestContext::new(), "p");
        assert_eq!(out, " data-tag=\"p\" data-count=\"0\"");
    }
}
