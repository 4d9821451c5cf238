//! Tree walker.
//!
//! Walks the node tree depth first and drives the [`StreamController`].
//! Siblings are rendered strictly one after another; the only concurrency
//! comes from suspense boundaries, whose real output is rendered by a
//! background task registered with the controller.

use std::cell::RefCell;
use std::rc::Rc;

use context::ProviderHandle;
use core_types::{BoundaryId, ScopeTag};
use futures::future::{FutureExt, LocalBoxFuture};
use html::{AttrValue, escape_attr, escape_text, format_number, get_attr, is_void_element};
use serde_json::Value;

use crate::attributes::AttributeRenderer;
use crate::component::{Component, FallbackFn};
use crate::config::RenderConfig;
use crate::controller::StreamController;
use crate::error::{RenderError, Result};
use crate::node::{ComponentInvocation, ContextProvider, Element, Node, Slot};
use crate::props::Props;
use crate::provide::ContextValue;
use crate::request::RequestContext;

type Handle = ProviderHandle<ContextValue>;

/// Providers pushed inside one custom-element host.
struct HostScope {
    tag: ScopeTag,
    providers: RefCell<Vec<Handle>>,
}

/// Providers of the current host enclosing the walk position, innermost first.
struct ProviderLink {
    handle: Handle,
    next: Option<Rc<ProviderLink>>,
}

/// Where in the tree the walker is.
#[derive(Clone, Default)]
struct Frame {
    boundary: Option<BoundaryId>,
    host: Option<Rc<HostScope>>,
    providers: Option<Rc<ProviderLink>>,
}

struct Inner {
    ctx: RequestContext,
    controller: Rc<StreamController>,
    attributes: Rc<dyn AttributeRenderer>,
    config: Rc<RenderConfig>,
    head: Option<Component>,
}

#[derive(Clone)]
pub(crate) struct Renderer {
    inner: Rc<Inner>,
}

impl Renderer {
    pub(crate) fn new(
        ctx: RequestContext,
        controller: Rc<StreamController>,
        attributes: Rc<dyn AttributeRenderer>,
        config: Rc<RenderConfig>,
        head: Option<Component>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                ctx,
                controller,
                attributes,
                config,
                head,
            }),
        }
    }

    pub(crate) async fn render_root(self, root: Node) -> Result<()> {
        let is_document = matches!(&root, Node::Element(el) if el.tag.eq_ignore_ascii_case("html"));
        if self.inner.config.doctype && is_document {
            self.inner.controller.enqueue("<!DOCTYPE html>", None);
        }
        self.render(root, Frame::default()).await
    }

    fn render(&self, node: Node, frame: Frame) -> LocalBoxFuture<'static, Result<()>> {
        let this = self.clone();
        async move { this.render_node(node, frame).await }.boxed_local()
    }

    async fn render_node(&self, node: Node, frame: Frame) -> Result<()> {
        let controller = &self.inner.controller;
        match node {
            Node::Empty => Ok(()),
            Node::Text(text) => {
                controller.enqueue(&escape_text(&text), frame.boundary);
                Ok(())
            }
            Node::Number(n) => {
                controller.enqueue(&format_number(n), frame.boundary);
                Ok(())
            }
            Node::RawHtml(html) => {
                controller.enqueue(&html, frame.boundary);
                Ok(())
            }
            Node::List(items) => self.render_children(items, &frame).await,
            Node::Fragment(children) => {
                controller.start_tag(None, frame.boundary);
                self.render_children(children, &frame).await?;
                controller.end_tag(None, frame.boundary);
                Ok(())
            }
            Node::Pending(pending) => {
                let resolved = pending.into_future().await;
                self.render(resolved, frame).await
            }
            Node::Element(el) => self.render_element(el, frame).await,
            Node::Provider(provider) => self.render_provider(provider, frame).await,
            Node::Component(invocation) => self.render_component(invocation, frame).await,
            Node::Slot(slot) => self.render_slot(slot, frame).await,
        }
    }

    async fn render_children(&self, children: Vec<Node>, frame: &Frame) -> Result<()> {
        for child in children {
            self.render(child, frame.clone()).await?;
        }
        Ok(())
    }

    async fn render_element(&self, el: Element, frame: Frame) -> Result<()> {
        let Element {
            tag,
            attributes,
            children,
        } = el;
        let inner = &self.inner;
        let controller = &inner.controller;
        let boundary = frame.boundary;
        let is_head = tag.eq_ignore_ascii_case("head");

        if tag.eq_ignore_ascii_case("body") && !controller.has_head_tag() {
            if let Some(head) = &inner.head {
                self.render_synthetic_head(head, &frame).await?;
            }
        }

        if controller.inside_head_tag() && !is_head {
            let id = get_attr(&attributes, "id").and_then(AttrValue::as_str);
            if !controller.admit_id(id) {
                log::debug!(target: "render.walk", "duplicate <{tag}> with id {id:?} in head skipped");
                return Ok(());
            }
        }

        let attrs = inner.attributes.render(&attributes, &inner.ctx, &tag);
        controller.start_tag(Some(&format!("<{tag}{attrs}>")), boundary);

        if is_void_element(&tag) {
            if !children.is_empty() {
                log::warn!(target: "render.walk", "children of void element <{tag}> ignored");
            }
            controller.end_tag(None, boundary);
            return Ok(());
        }

        if is_head {
            controller.set_has_head_tag();
            controller.set_inside_head_tag(true);
        }
        let result = async {
            if is_head {
                if let Some(head) = &inner.head {
                    self.render(head.invoke(Props::new()), frame.clone()).await?;
                }
            }
            self.render_children(children, &frame).await
        }
        .await;
        if is_head {
            controller.set_inside_head_tag(false);
        }
        result?;

        controller.end_tag(Some(&format!("</{tag}>")), boundary);
        Ok(())
    }

    /// `<head>` holding only the head override, for documents whose body
    /// opens without one.
    async fn render_synthetic_head(&self, head: &Component, frame: &Frame) -> Result<()> {
        let controller = &self.inner.controller;
        controller.start_tag(Some("<head>"), frame.boundary);
        controller.set_inside_head_tag(true);
        let result = self.render(head.invoke(Props::new()), frame.clone()).await;
        controller.set_inside_head_tag(false);
        result?;
        controller.end_tag(Some("</head>"), frame.boundary);
        Ok(())
    }

    async fn render_provider(&self, provider: ContextProvider, frame: Frame) -> Result<()> {
        let ContextProvider {
            context,
            value,
            server_only,
            children,
        } = provider;
        let inner = &self.inner;

        let json = if server_only {
            None
        } else {
            let json = value.json().map_err(|message| RenderError::ContextValue {
                context: context.to_string(),
                message: message.to_string(),
            })?;
            Some(json.to_string())
        };

        let scope = frame.host.as_ref().map(|host| host.tag);
        let handle = inner.ctx.contexts().push(context.clone(), value, scope);
        let mut child_frame = frame.clone();
        if let Some(host) = &frame.host {
            host.providers.borrow_mut().push(handle.clone());
            child_frame.providers = Some(Rc::new(ProviderLink {
                handle: handle.clone(),
                next: frame.providers.clone(),
            }));
        }

        let tag = &inner.config.provider_tag;
        let open = json.map(|value| {
            format!(
                "<{tag} context=\"{}\" value=\"{}\" cid=\"{}\">",
                escape_attr(&Value::from(context.as_str()).to_string()),
                escape_attr(&value),
                handle.id()
            )
        });
        let close = open.as_ref().map(|_| format!("</{tag}>"));

        inner.controller.start_tag(open.as_deref(), frame.boundary);
        let result = self.render_children(children, &child_frame).await;
        // A provider around a slot stays around for the content projected
        // into that slot.
        if handle.has_some_slot() {
            handle.pause();
        } else {
            handle.clear();
        }
        result?;
        inner.controller.end_tag(close.as_deref(), frame.boundary);
        Ok(())
    }

    async fn render_component(&self, invocation: ComponentInvocation, frame: Frame) -> Result<()> {
        let ComponentInvocation { component, props } = invocation;
        match component.fallback().cloned() {
            Some(fallback) => self.suspend(component, props, fallback, frame).await,
            None => self.render_resolved(component, props, frame).await,
        }
    }

    /// Write the placeholder with its fallback now and schedule the real
    /// output as a deferred unit.
    async fn suspend(&self, component: Component, props: Props, fallback: FallbackFn, frame: Frame) -> Result<()> {
        let inner = &self.inner;
        let controller = &inner.controller;
        let id = controller.next_suspense_index(frame.boundary);
        log::debug!(target: "render.walk", "{} suspended as boundary {id}", component.name());

        controller.start_tag(Some(&format!("<div id=\"S:{id}\">")), frame.boundary);
        let placeholder = fallback(&props, &inner.ctx);
        self.render(placeholder, frame.clone()).await?;
        controller.end_tag(Some("</div>"), frame.boundary);

        let deferred = Frame {
            boundary: Some(id),
            ..frame
        };
        let this = self.clone();
        let task = async move {
            let controller = Rc::clone(&this.inner.controller);
            controller.open_deferred(id);
            let name = component.name().to_string();
            match this.render_resolved(component, props, deferred).await {
                Ok(()) => controller.close_deferred(id),
                Err(err) => {
                    log::warn!(target: "render.walk", "suspended boundary {id} ({name}) failed: {err}");
                    controller.discard_boundary(id);
                }
            }
        };
        let contexts = inner.ctx.contexts();
        controller.suspense_promise(contexts.scoped(contexts.snapshot(), task).boxed_local());
        Ok(())
    }

    async fn render_resolved(&self, component: Component, props: Props, frame: Frame) -> Result<()> {
        if let Some(tag) = component.host_tag() {
            let tag = tag.to_string();
            return self.render_host(&tag, component, props, frame).await;
        }
        let output = self.resolve(&component, props).await?;
        self.render(output, frame).await
    }

    /// Call the component, falling back to its error handler on failure.
    async fn resolve(&self, component: &Component, props: Props) -> Result<Node> {
        let ctx = &self.inner.ctx;
        match component.call(props.clone(), ctx.clone()).await {
            Ok(node) => Ok(node),
            Err(cause) => {
                let Some(handler) = component.error_handler() else {
                    return Err(RenderError::component(component.name(), cause));
                };
                log::debug!(
                    target: "render.walk",
                    "{} failed, rendering its error handler: {cause:#}",
                    component.name()
                );
                handler(props.with_error(cause), ctx.clone())
                    .await
                    .map_err(|cause| RenderError::component(component.name(), cause))
            }
        }
    }

    async fn render_host(&self, tag: &str, component: Component, props: Props, frame: Frame) -> Result<()> {
        let inner = &self.inner;
        let controller = &inner.controller;
        let boundary = frame.boundary;

        let attrs = inner.attributes.render(&props.attributes(), &inner.ctx, tag);
        controller.start_tag(Some(&format!("<{tag}{attrs}>")), boundary);
        controller.start_tag(
            Some(&format!(
                "<template shadowrootmode=\"{}\">",
                escape_attr(&inner.config.shadow_root_mode)
            )),
            boundary,
        );

        let scope = Rc::new(HostScope {
            tag: inner.ctx.contexts().next_scope_tag(),
            providers: RefCell::new(Vec::new()),
        });
        let shadow = Frame {
            boundary,
            host: Some(Rc::clone(&scope)),
            providers: None,
        };

        let result = async {
            let template = self.resolve(&component, props.clone()).await?;
            self.render(template, shadow).await?;
            controller.end_tag(Some("</template>"), boundary);

            let light = props.children().cloned().map(Node::into_items).unwrap_or_default();
            for child in light {
                self.project(&scope, child, frame.clone()).await?;
            }
            Ok::<(), RenderError>(())
        }
        .await;

        let swept = inner.ctx.contexts().clear_scope(scope.tag);
        log::trace!(target: "render.walk", "<{tag}> closed, {swept} provider(s) swept");
        result?;
        controller.end_tag(Some(&format!("</{tag}>")), boundary);
        Ok(())
    }

    /// Render one light child of a host with the host's providers that wrap
    /// the child's slot made visible again.
    async fn project(&self, scope: &HostScope, child: Node, frame: Frame) -> Result<()> {
        let slot = child.slot_name().to_string();
        let reopened: Vec<Handle> = scope
            .providers
            .borrow()
            .iter()
            .filter(|h| h.is_paused() && h.has_slot(&slot))
            .cloned()
            .collect();
        for handle in &reopened {
            handle.restore();
        }
        let result = self.render(child, frame).await;
        for handle in &reopened {
            handle.pause();
        }
        result
    }

    async fn render_slot(&self, slot: Slot, frame: Frame) -> Result<()> {
        let controller = &self.inner.controller;
        let name = slot.name.as_deref().unwrap_or("");
        let mut link = frame.providers.clone();
        while let Some(current) = link {
            current.handle.add_slot(name);
            link = current.next.clone();
        }

        let open = match &slot.name {
            Some(name) => format!("<slot name=\"{}\">", escape_attr(name)),
            None => "<slot>".to_string(),
        };
        controller.start_tag(Some(&open), frame.boundary);
        self.render_children(slot.children, &frame).await?;
        controller.end_tag(Some("</slot>"), frame.boundary);
        Ok(())
    }
}
