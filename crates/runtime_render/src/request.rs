//! Per-render request state handed to every component.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use context::ContextStore;
use core_types::RequestId;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::abort::AbortSignal;
use crate::provide::{Context, ContextValue};

/// Typed key into the request store.
pub struct StoreKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StoreKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Key/value data attached to a request by the embedding server.
#[derive(Default)]
pub struct RequestStore {
    values: HashMap<&'static str, Box<dyn Any>>,
}

impl RequestStore {
    pub fn get<T: Clone + 'static>(&self, key: &StoreKey<T>) -> Option<T> {
        self.values.get(key.name)?.downcast_ref::<T>().cloned()
    }

    pub fn set<T: 'static>(&mut self, key: &StoreKey<T>, value: T) {
        self.values.insert(key.name, Box::new(value));
    }

    /// True when the key holds a value of the key's type.
    pub fn has<T: 'static>(&self, key: &StoreKey<T>) -> bool {
        self.values.get(key.name).is_some_and(|v| v.is::<T>())
    }

    pub fn remove<T: 'static>(&mut self, key: &StoreKey<T>) -> Option<T> {
        let value = self.values.remove(key.name)?;
        value.downcast::<T>().ok().map(|b| *b)
    }
}

/// Locale data carried for components; translation itself happens elsewhere.
#[derive(Clone, Debug)]
pub struct Locale {
    pub locale: String,
    pub default_locale: String,
    pub locales: Vec<String>,
    messages: HashMap<String, HashMap<String, String>>,
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en")
    }
}

impl Locale {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
            default_locale: locale.to_string(),
            locales: vec![locale.to_string()],
            messages: HashMap::new(),
        }
    }

    pub fn with_default(mut self, default_locale: &str) -> Self {
        self.default_locale = default_locale.to_string();
        if !self.locales.iter().any(|l| l == default_locale) {
            self.locales.push(default_locale.to_string());
        }
        self
    }

    pub fn with_messages(mut self, locale: &str, messages: HashMap<String, String>) -> Self {
        if !self.locales.iter().any(|l| l == locale) {
            self.locales.push(locale.to_string());
        }
        self.messages.insert(locale.to_string(), messages);
        self
    }

    /// Message for `key` in the active locale, falling back to the default one.
    pub fn translate(&self, key: &str) -> Option<&str> {
        [&self.locale, &self.default_locale]
            .into_iter()
            .find_map(|l| self.messages.get(l)?.get(key))
            .map(String::as_str)
    }
}

/// Live connections components may push messages to (e.g. a reload channel).
pub trait ConnectionRegistry {
    /// Returns `false` when `connection` is unknown or gone.
    fn send(&self, connection: &str, message: &str) -> bool;
    fn is_connected(&self, connection: &str) -> bool;
}

/// In-process registry backed by unbounded channels.
#[derive(Default)]
pub struct ChannelRegistry {
    senders: RefCell<HashMap<String, UnboundedSender<String>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection`, replacing any previous receiver.
    pub fn connect(&self, connection: &str) -> UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded();
        self.senders.borrow_mut().insert(connection.to_string(), tx);
        rx
    }

    pub fn disconnect(&self, connection: &str) {
        self.senders.borrow_mut().remove(connection);
    }
}

impl ConnectionRegistry for ChannelRegistry {
    fn send(&self, connection: &str, message: &str) -> bool {
        let mut senders = self.senders.borrow_mut();
        let Some(tx) = senders.get(connection) else {
            return false;
        };
        if tx.unbounded_send(message.to_string()).is_ok() {
            return true;
        }
        senders.remove(connection);
        false
    }

    fn is_connected(&self, connection: &str) -> bool {
        self.senders
            .borrow()
            .get(connection)
            .is_some_and(|tx| !tx.is_closed())
    }
}

struct RequestInner {
    id: RequestId,
    abort: AbortSignal,
    store: RefCell<RequestStore>,
    locale: Locale,
    contexts: ContextStore<ContextValue>,
    connections: Option<Rc<dyn ConnectionRegistry>>,
}

/// Shared handle to the state of one render.
///
/// Cheap to clone; every clone sees the same store and provider stacks.
#[derive(Clone)]
pub struct RequestContext {
    inner: Rc<RequestInner>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    pub fn request_id(&self) -> RequestId {
        self.inner.id
    }

    pub fn abort_signal(&self) -> &AbortSignal {
        &self.inner.abort
    }

    pub fn locale(&self) -> &Locale {
        &self.inner.locale
    }

    pub fn connections(&self) -> Option<&Rc<dyn ConnectionRegistry>> {
        self.inner.connections.as_ref()
    }

    pub fn contexts(&self) -> &ContextStore<ContextValue> {
        &self.inner.contexts
    }

    /// Value of the innermost provider of `context` around the caller, or
    /// the context's default.
    pub fn use_context<T: Clone + 'static>(&self, context: &Context<T>) -> T {
        let Some(value) = self.inner.contexts.current(context.id()) else {
            return context.default_value().clone();
        };
        value.downcast::<T>().unwrap_or_else(|| {
            log::warn!(
                target: "render.context",
                "provider of {} holds a different type, using default",
                context.id()
            );
            context.default_value().clone()
        })
    }

    pub fn get<T: Clone + 'static>(&self, key: &StoreKey<T>) -> Option<T> {
        self.inner.store.borrow().get(key)
    }

    pub fn set<T: 'static>(&self, key: &StoreKey<T>, value: T) {
        self.inner.store.borrow_mut().set(key, value);
    }

    pub fn has<T: 'static>(&self, key: &StoreKey<T>) -> bool {
        self.inner.store.borrow().has(key)
    }

    pub fn remove<T: 'static>(&self, key: &StoreKey<T>) -> Option<T> {
        self.inner.store.borrow_mut().remove(key)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.inner.id)
            .field("locale", &self.inner.locale.locale)
            .field("aborted", &self.inner.abort.is_aborted())
            .finish()
    }
}

#[derive(Default)]
pub struct RequestContextBuilder {
    id: RequestId,
    abort: Option<AbortSignal>,
    store: RequestStore,
    locale: Option<Locale>,
    connections: Option<Rc<dyn ConnectionRegistry>>,
}

impl RequestContextBuilder {
    pub fn request_id(mut self, id: RequestId) -> Self {
        self.id = id;
        self
    }

    pub fn abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn value<T: 'static>(mut self, key: &StoreKey<T>, value: T) -> Self {
        self.store.set(key, value);
        self
    }

    pub fn connections(mut self, registry: Rc<dyn ConnectionRegistry>) -> Self {
        self.connections = Some(registry);
        self
    }

    pub fn build(self) -> RequestContext {
        RequestContext {
            inner: Rc::new(RequestInner {
                id: self.id,
                abort: self.abort.unwrap_or_default(),
                store: RefCell::new(self.store),
                locale: self.locale.unwrap_or_default(),
                contexts: ContextStore::new(),
                connections: self.connections,
            }),
        }
    }
}
