use std::any::Any;
use std::fmt;
use std::rc::Rc;

use core_types::ContextId;
use serde::Serialize;
use serde_json::Value;

use crate::node::{ContextProvider, Node};

/// A typed context with its static default.
///
/// Contexts are identified by name: two `Context` values created with the
/// same name address the same provider stack.
#[derive(Clone, Debug)]
pub struct Context<T> {
    id: ContextId,
    default: T,
}

impl<T: Clone + 'static> Context<T> {
    pub fn new(name: &str, default: T) -> Self {
        Self {
            id: ContextId::from(name),
            default,
        }
    }

    pub fn id(&self) -> &ContextId {
        &self.id
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Provider node whose value is also serialized for the client.
    pub fn provide(&self, value: T, children: impl Into<Node>) -> Node
    where
        T: Serialize,
    {
        Node::Provider(ContextProvider {
            context: self.id.clone(),
            value: ContextValue::serialized(value),
            server_only: false,
            children: children.into().into_items(),
        })
    }

    /// Provider node visible only during the server render.
    pub fn provide_server_only(&self, value: T, children: impl Into<Node>) -> Node {
        Node::Provider(ContextProvider {
            context: self.id.clone(),
            value: ContextValue::server_only(value),
            server_only: true,
            children: children.into().into_items(),
        })
    }
}

/// Type-erased provider value as stored in the context store.
#[derive(Clone)]
pub struct ContextValue {
    value: Rc<dyn Any>,
    json: Result<Value, String>,
}

impl ContextValue {
    pub fn serialized<T: Serialize + 'static>(value: T) -> Self {
        let json = serde_json::to_value(&value).map_err(|e| e.to_string());
        Self {
            value: Rc::new(value),
            json,
        }
    }

    pub fn server_only<T: 'static>(value: T) -> Self {
        Self {
            value: Rc::new(value),
            json: Ok(Value::Null),
        }
    }

    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }

    /// JSON form for the provider wrapper, or the serializer's message.
    pub fn json(&self) -> Result<&Value, &str> {
        self.json.as_ref().map_err(String::as_str)
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.json {
            Ok(json) => write!(f, "ContextValue({json})"),
            Err(_) => f.write_str("ContextValue(<unserializable>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn serialized_value_keeps_both_forms() {
        let value = ContextValue::serialized("dark".to_string());
        assert_eq!(value.downcast::<String>().as_deref(), Some("dark"));
        assert_eq!(value.json(), Ok(&Value::from("dark")));
        assert_eq!(value.downcast::<i32>(), None);
    }

    #[test]
    fn unserializable_value_reports_message() {
        // Non-string map keys cannot become JSON object keys.
        let mut map = BTreeMap::new();
        map.insert((1, 2), "x");
        let value = ContextValue::serialized(map);
        assert!(value.json().is_err());
    }

    #[test]
    fn provide_builds_provider_node() {
        let theme = Context::new("theme", "light".to_string());
        let node = theme.provide("dark".to_string(), "child");
        match node {
            Node::Provider(p) => {
                assert_eq!(p.context.as_str(), "theme");
                assert!(!p.server_only);
                assert_eq!(p.children.len(), 1);
            }
            other => panic!("expected provider, got {other:?}"),
        }
    }
}
