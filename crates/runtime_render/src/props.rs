use std::rc::Rc;

use html::AttrValue;
use serde_json::{Map, Value};

use crate::node::Node;

/// Arguments of one component invocation.
#[derive(Clone, Debug, Default)]
pub struct Props {
    values: Map<String, Value>,
    children: Option<Box<Node>>,
    error: Option<Rc<anyhow::Error>>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: impl Into<Node>) -> Self {
        self.children = Some(Box::new(children.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn children(&self) -> Option<&Node> {
        self.children.as_deref()
    }

    /// Failure that triggered an error handler. Only set for error handlers.
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_deref()
    }

    pub(crate) fn with_error(mut self, error: anyhow::Error) -> Self {
        self.error = Some(Rc::new(error));
        self
    }

    /// Values as element attributes, in insertion order when serde_json
    /// preserves it, alphabetical otherwise.
    pub fn attributes(&self) -> Vec<(String, AttrValue)> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), AttrValue::from(v.clone())))
            .collect()
    }
}
