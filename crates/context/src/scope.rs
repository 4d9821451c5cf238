use crate::store::{ContextStore, EntryId};
use core_types::ContextId;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Current-provider pointers of every context at one moment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ScopeSnapshot {
    currents: HashMap<ContextId, EntryId>,
}

impl ScopeSnapshot {
    pub(crate) fn from_pointers(iter: impl IntoIterator<Item = (ContextId, EntryId)>) -> Self {
        Self {
            currents: iter.into_iter().collect(),
        }
    }

    pub fn pointer(&self, context: &ContextId) -> Option<EntryId> {
        self.currents.get(context).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.currents.is_empty()
    }
}

impl fmt::Debug for ScopeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.currents.iter().map(|(k, v)| (k.as_str(), v.as_raw())))
            .finish()
    }
}

/// Future adapter that polls `inner` under its own provider view.
///
/// Before each poll the stored view is swapped into the store; afterwards the
/// caller's view is put back and the (possibly changed) inner view is kept for
/// the next poll.
pub struct Scoped<V, F> {
    store: ContextStore<V>,
    view: Option<ScopeSnapshot>,
    inner: Pin<Box<F>>,
}

impl<V: Clone, F> Scoped<V, F> {
    pub(crate) fn new(store: ContextStore<V>, view: ScopeSnapshot, inner: F) -> Self {
        Self {
            store,
            view: Some(view),
            inner: Box::pin(inner),
        }
    }
}

impl<V: Clone, F: Future> Future for Scoped<V, F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<F::Output> {
        // All fields are Unpin (inner is boxed).
        let this = self.get_mut();
        let view = this.view.take().unwrap_or_default();
        let outer = this.store.swap_view(view);
        let out = this.inner.as_mut().poll(cx);
        this.view = Some(this.store.swap_view(outer));
        out
    }
}
