use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::node::{ComponentInvocation, Node};
use crate::props::Props;
use crate::request::RequestContext;

/// Body of a component or of its error handler.
pub type ComponentFn =
    Rc<dyn Fn(Props, RequestContext) -> LocalBoxFuture<'static, anyhow::Result<Node>>>;

/// Fallback shown in place of a suspended component.
pub type FallbackFn = Rc<dyn Fn(&Props, &RequestContext) -> Node>;

/// A functional component plus its optional companions.
///
/// `suspense` turns every invocation into a suspense boundary: the fallback
/// is written at once and the real output is streamed later. `error`
/// replaces the output when the body fails.
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    render: ComponentFn,
    suspense: Option<FallbackFn>,
    error: Option<ComponentFn>,
    host: Option<Rc<str>>,
}

impl Component {
    pub fn new<F, Fut>(name: &str, render: F) -> Self
    where
        F: Fn(Props, RequestContext) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<Node>> + 'static,
    {
        Self {
            name: Rc::from(name),
            render: boxed(render),
            suspense: None,
            error: None,
            host: None,
        }
    }

    /// Component whose body is synchronous and infallible.
    pub fn pure<F>(name: &str, render: F) -> Self
    where
        F: Fn(&Props, &RequestContext) -> Node + 'static,
    {
        Self::new(name, move |props, ctx| future::ready(Ok(render(&props, &ctx))))
    }

    /// Custom-element host: `render` produces the shadow template and the
    /// invocation's children are projected into its slots.
    pub fn custom_element<F, Fut>(tag: &str, render: F) -> Self
    where
        F: Fn(Props, RequestContext) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<Node>> + 'static,
    {
        let mut component = Self::new(tag, render);
        component.host = Some(Rc::from(tag));
        component
    }

    pub fn with_suspense<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&Props, &RequestContext) -> Node + 'static,
    {
        self.suspense = Some(Rc::new(fallback));
        self
    }

    /// Synchronous error handler; the failure is available as
    /// [`Props::error`].
    pub fn with_error<F>(self, handler: F) -> Self
    where
        F: Fn(&Props, &RequestContext) -> Node + 'static,
    {
        self.with_async_error(move |props, ctx| future::ready(Ok(handler(&props, &ctx))))
    }

    pub fn with_async_error<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Props, RequestContext) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<Node>> + 'static,
    {
        self.error = Some(boxed(handler));
        self
    }

    pub fn invoke(&self, props: Props) -> Node {
        Node::Component(ComponentInvocation {
            component: self.clone(),
            props,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host_tag(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub(crate) fn call(&self, props: Props, ctx: RequestContext) -> LocalBoxFuture<'static, anyhow::Result<Node>> {
        (self.render)(props, ctx)
    }

    pub(crate) fn fallback(&self) -> Option<&FallbackFn> {
        self.suspense.as_ref()
    }

    pub(crate) fn error_handler(&self) -> Option<&ComponentFn> {
        self.error.as_ref()
    }
}

fn boxed<F, Fut>(f: F) -> ComponentFn
where
    F: Fn(Props, RequestContext) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<Node>> + 'static,
{
    Rc::new(move |props, ctx| f(props, ctx).boxed_local())
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("suspense", &self.suspense.is_some())
            .field("error", &self.error.is_some())
            .field("host", &self.host)
            .finish()
    }
}
