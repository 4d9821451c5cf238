//! # runtime_render
//!
//! Streams a node tree as HTML text.
//!
//! [`render_to_stream`] walks the tree and yields chunks as soon as they are
//! known. Components carrying a suspense fallback become boundaries: the
//! fallback is written in place inside `<div id="S:{n}">`, and the real
//! output follows later in the same stream as
//! `<template id="U:{n}">…</template><script id="R:{n}">…</script>`, which a
//! small client script swaps into the placeholder.
//!
//! Rendering is single-threaded and cooperative. Drive the stream from any
//! local executor; the [`AbortSignal`] in the [`RequestContext`] may be fired
//! from another thread to stop the render.

mod abort;
mod attributes;
mod component;
mod config;
mod controller;
mod error;
mod node;
mod props;
mod provide;
mod renderer;
mod request;
mod stream;
mod suspense;

use std::rc::Rc;

use futures::FutureExt;
use futures::channel::mpsc;
use futures::stream::StreamExt;

pub use crate::abort::{AbortSignal, Aborted};
pub use crate::attributes::{AttributeRenderer, DefaultAttributes};
pub use crate::component::{Component, ComponentFn, FallbackFn};
pub use crate::config::{ConfigError, RenderConfig};
pub use crate::controller::StreamController;
pub use crate::error::{RenderError, Result};
pub use crate::node::{ComponentInvocation, ContextProvider, Element, Node, PendingNode, Slot};
pub use crate::props::Props;
pub use crate::provide::{Context, ContextValue};
pub use crate::request::{
    ChannelRegistry, ConnectionRegistry, Locale, RequestContext, RequestContextBuilder,
    RequestStore, StoreKey,
};
pub use crate::stream::RenderStream;
pub use html::AttrValue;

use crate::renderer::Renderer;

/// Everything about a render that is not the tree or the request.
#[derive(Clone, Default)]
pub struct RenderOptions {
    pub config: RenderConfig,
    /// Rendered as the first content of `<head>`.
    pub head: Option<Component>,
    /// Defaults to [`DefaultAttributes`].
    pub attributes: Option<Rc<dyn AttributeRenderer>>,
}

impl RenderOptions {
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_head(mut self, head: Component) -> Self {
        self.head = Some(head);
        self
    }

    pub fn with_attributes(mut self, attributes: impl AttributeRenderer + 'static) -> Self {
        self.attributes = Some(Rc::new(attributes));
        self
    }
}

/// Render `root` as a stream of HTML chunks.
pub fn render_to_stream(root: Node, ctx: RequestContext, options: RenderOptions) -> RenderStream {
    let RenderOptions {
        config,
        head,
        attributes,
    } = options;
    let (tx, rx) = mpsc::unbounded();
    let controller = Rc::new(StreamController::new(tx, &config));
    let attributes = attributes.unwrap_or_else(|| Rc::new(DefaultAttributes));
    let signal = ctx.abort_signal().clone();
    let request_id = ctx.request_id();
    log::debug!(target: "render.stream", "request {request_id} started");

    let renderer = Renderer::new(ctx, Rc::clone(&controller), attributes, Rc::new(config), head);
    RenderStream::new(
        renderer.render_root(root).boxed_local(),
        controller,
        signal,
        rx,
        request_id,
    )
}

/// Render `root` to one string. Fails with the first unrecovered error.
pub async fn render_to_string(root: Node, ctx: RequestContext, options: RenderOptions) -> Result<String> {
    let mut stream = render_to_stream(root, ctx, options);
    let mut out = String::new();
    while let Some(chunk) = stream.next().await {
        out.push_str(&chunk?);
    }
    Ok(out)
}
