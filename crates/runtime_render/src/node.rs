//! The node tree consumed by the renderer.
//!
//! Nodes are plain data. Whatever produced the tree (a compiler, a router,
//! hand-written code) has already decided what to render; the renderer only
//! decides when and where each piece reaches the output.

use std::fmt;
use std::future::Future;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use html::AttrValue;

use crate::component::Component;
use crate::props::Props;
use crate::provide::ContextValue;
use core_types::ContextId;

#[derive(Clone, Debug)]
pub enum Node {
    /// Escaped on output.
    Text(String),
    Number(f64),
    /// Pre-escaped markup, written verbatim.
    RawHtml(String),
    Element(Element),
    /// Children only; counts as a tag pair that writes nothing.
    Fragment(Vec<Node>),
    /// Sibling output, e.g. a component returning several nodes.
    List(Vec<Node>),
    Provider(ContextProvider),
    Component(ComponentInvocation),
    Slot(Slot),
    /// A node that is itself still being computed.
    Pending(PendingNode),
    /// Renders nothing.
    Empty,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn raw(html: impl Into<String>) -> Self {
        Node::RawHtml(html.into())
    }

    pub fn fragment(children: impl IntoIterator<Item = Node>) -> Self {
        Node::Fragment(children.into_iter().collect())
    }

    pub fn list(items: impl IntoIterator<Item = Node>) -> Self {
        Node::List(items.into_iter().collect())
    }

    pub fn slot(name: Option<&str>) -> Self {
        Node::Slot(Slot {
            name: name.map(str::to_string),
            children: Vec::new(),
        })
    }

    /// Wrap a future producing a node. The future is polled by the renderer
    /// when the node's turn comes; clones share the same result.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Node> + 'static,
    {
        Node::Pending(PendingNode(future.boxed_local().shared()))
    }

    /// Flatten a sibling list into its items; any other node is a single item.
    pub fn into_items(self) -> Vec<Node> {
        match self {
            Node::List(items) => items,
            Node::Empty => Vec::new(),
            other => vec![other],
        }
    }

    /// Slot this node is projected into when used as a host's light child.
    pub fn slot_name(&self) -> &str {
        match self {
            Node::Element(el) => el.get_attr("slot").and_then(AttrValue::as_str).unwrap_or(""),
            _ => "",
        }
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Number(n as f64)
    }
}

impl From<i32> for Node {
    fn from(n: i32) -> Self {
        Node::Number(f64::from(n))
    }
}

impl From<f64> for Node {
    fn from(n: f64) -> Self {
        Node::Number(n)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(items)
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map_or(Node::Empty, Into::into)
    }
}

#[derive(Clone, Debug)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, AttrValue)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Case-insensitive attribute lookup.
    pub fn get_attr(&self, name: &str) -> Option<&AttrValue> {
        html::get_attr(&self.attributes, name)
    }
}

#[derive(Clone, Debug)]
pub struct ContextProvider {
    pub context: ContextId,
    pub value: ContextValue,
    /// Server-only providers never reach the client and render no wrapper.
    pub server_only: bool,
    pub children: Vec<Node>,
}

#[derive(Clone, Debug)]
pub struct ComponentInvocation {
    pub component: Component,
    pub props: Props,
}

/// Insertion point inside a custom element's shadow template.
#[derive(Clone, Debug, Default)]
pub struct Slot {
    /// `None` is the default slot.
    pub name: Option<String>,
    /// Fallback content.
    pub children: Vec<Node>,
}

#[derive(Clone)]
pub struct PendingNode(pub(crate) Shared<LocalBoxFuture<'static, Node>>);

impl PendingNode {
    pub(crate) fn into_future(self) -> Shared<LocalBoxFuture<'static, Node>> {
        self.0
    }
}

impl fmt::Debug for PendingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PendingNode(..)")
    }
}
