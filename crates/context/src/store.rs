//! Provider stacks and the handles that end a provider's scope.

use crate::scope::{ScopeSnapshot, Scoped};
use core_types::{ContextId, ScopeTag};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Identifier of one pushed provider. Unique within a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

impl EntryId {
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a provider entry.
///
/// `Active → Paused → Restored → Paused → … → Cleared`. Only `Paused`
/// entries are invisible to lookups; `Cleared` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderState {
    Active,
    Paused,
    Restored,
    Cleared,
}

#[derive(Debug)]
struct ProviderEntry<V> {
    value: V,
    previous: Option<EntryId>,
    state: ProviderState,
    slots: HashSet<String>,
    scope: Option<ScopeTag>,
}

#[derive(Debug)]
struct ProviderStack<V> {
    entries: HashMap<EntryId, ProviderEntry<V>>,
    current: Option<EntryId>,
}

impl<V> Default for ProviderStack<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            current: None,
        }
    }
}

impl<V> ProviderStack<V> {
    /// Walk from `start` through predecessors, skipping paused entries.
    fn visible_from(&self, start: Option<EntryId>) -> Option<&ProviderEntry<V>> {
        let mut cursor = start;
        while let Some(id) = cursor {
            let entry = self.entries.get(&id)?;
            if entry.state != ProviderState::Paused {
                return Some(entry);
            }
            cursor = entry.previous;
        }
        None
    }

    /// Mark `id` cleared and, if it is current, make the entry that was
    /// current when it was pushed current again. That entry may itself be
    /// cleared already: under a snapshot view it is still the enclosing
    /// scope, and lookups resolve tombstones.
    fn clear(&mut self, id: EntryId) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if entry.state == ProviderState::Cleared {
            return false;
        }
        entry.state = ProviderState::Cleared;
        if self.current == Some(id) {
            self.current = entry.previous;
        }
        true
    }
}

#[derive(Debug)]
struct StoreInner<V> {
    stacks: HashMap<ContextId, ProviderStack<V>>,
    next_entry: u64,
    next_scope: u64,
}

/// Per-render registry of provider stacks keyed by context identity.
///
/// Each context keeps a flat map of entries plus one "current" pointer. Every
/// entry remembers the entry that was current when it was pushed, so clearing
/// restores scopes last-in-first-out without a real call stack.
///
/// Cleared entries stay in the map (as `Cleared`) until the store is dropped
/// with the render: a [`ScopeSnapshot`] taken while the entry was in scope may
/// still point at it.
///
/// # Example
///
/// ```
/// use context::ContextStore;
/// use core_types::ContextId;
///
/// let store = ContextStore::new();
/// let theme = ContextId::from("theme");
///
/// let outer = store.push(theme.clone(), "dark", None);
/// let inner = store.push(theme.clone(), "light", None);
/// assert_eq!(store.current(&theme), Some("light"));
///
/// inner.clear();
/// assert_eq!(store.current(&theme), Some("dark"));
/// outer.clear();
/// assert_eq!(store.current(&theme), None);
/// ```
pub struct ContextStore<V> {
    inner: Rc<RefCell<StoreInner<V>>>,
}

impl<V> Clone for ContextStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> Default for ContextStore<V> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                stacks: HashMap::new(),
                next_entry: 1,
                next_scope: 1,
            })),
        }
    }
}

impl<V> fmt::Debug for ContextStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ContextStore")
            .field("contexts", &inner.stacks.len())
            .field("next_entry", &inner.next_entry)
            .finish()
    }
}

impl<V: Clone> ContextStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a provider for `context` and make it current.
    ///
    /// `scope` tags the entry for [`ContextStore::clear_scope`].
    pub fn push(&self, context: ContextId, value: V, scope: Option<ScopeTag>) -> ProviderHandle<V> {
        let mut inner = self.inner.borrow_mut();
        let id = EntryId(inner.next_entry);
        inner.next_entry += 1;

        let stack = inner.stacks.entry(context.clone()).or_default();
        let previous = stack.current;
        stack.entries.insert(
            id,
            ProviderEntry {
                value,
                previous,
                state: ProviderState::Active,
                slots: HashSet::new(),
                scope,
            },
        );
        stack.current = Some(id);
        log::trace!(target: "render.context", "push {context} entry={id} previous={previous:?}");

        ProviderHandle {
            store: self.clone(),
            context,
            entry: id,
        }
    }

    /// Value of the innermost visible provider for `context`, if any.
    ///
    /// Callers fall back to the context's static default on `None`.
    pub fn current(&self, context: &ContextId) -> Option<V> {
        let inner = self.inner.borrow();
        let stack = inner.stacks.get(context)?;
        stack.visible_from(stack.current).map(|e| e.value.clone())
    }

    /// Entry the current pointer of `context` refers to (paused or not).
    pub fn current_entry(&self, context: &ContextId) -> Option<EntryId> {
        let inner = self.inner.borrow();
        inner.stacks.get(context).and_then(|s| s.current)
    }

    /// Number of entries of `context` that have not been cleared.
    pub fn live_entries(&self, context: &ContextId) -> usize {
        let inner = self.inner.borrow();
        inner.stacks.get(context).map_or(0, |s| {
            s.entries
                .values()
                .filter(|e| e.state != ProviderState::Cleared)
                .count()
        })
    }

    /// Allocate a fresh scope tag for a custom-element host.
    pub fn next_scope_tag(&self) -> ScopeTag {
        let mut inner = self.inner.borrow_mut();
        let tag = ScopeTag::from_raw(inner.next_scope);
        inner.next_scope += 1;
        tag
    }

    /// Clear every entry tagged with `tag`, across all contexts.
    ///
    /// Returns how many entries were cleared.
    pub fn clear_scope(&self, tag: ScopeTag) -> usize {
        let mut inner = self.inner.borrow_mut();
        let mut cleared = 0;
        for stack in inner.stacks.values_mut() {
            let mut ids: Vec<EntryId> = stack
                .entries
                .iter()
                .filter(|(_, e)| e.scope == Some(tag) && e.state != ProviderState::Cleared)
                .map(|(id, _)| *id)
                .collect();
            // Newest first keeps the current pointer walking backwards.
            ids.sort_unstable_by(|a, b| b.0.cmp(&a.0));
            for id in ids {
                if stack.clear(id) {
                    cleared += 1;
                }
            }
        }
        log::trace!(target: "render.context", "clear scope {} entries={cleared}", tag.as_raw());
        cleared
    }

    /// Capture the current pointer of every context.
    pub fn snapshot(&self) -> ScopeSnapshot {
        let inner = self.inner.borrow();
        ScopeSnapshot::from_pointers(
            inner
                .stacks
                .iter()
                .filter_map(|(id, stack)| stack.current.map(|entry| (id.clone(), entry))),
        )
    }

    /// Install `view` as the current pointers and return the replaced ones.
    pub(crate) fn swap_view(&self, view: ScopeSnapshot) -> ScopeSnapshot {
        let previous = self.snapshot();
        let mut inner = self.inner.borrow_mut();
        for (id, stack) in inner.stacks.iter_mut() {
            stack.current = view.pointer(id);
        }
        previous
    }

    /// Wrap `future` so that every poll runs under `snapshot`.
    ///
    /// Pushes and clears made by the future stay in its own view; the view of
    /// whoever polls it is restored after each poll.
    pub fn scoped<F: Future>(&self, snapshot: ScopeSnapshot, future: F) -> Scoped<V, F> {
        Scoped::new(self.clone(), snapshot, future)
    }

    fn with_entry<R>(
        &self,
        context: &ContextId,
        id: EntryId,
        f: impl FnOnce(&mut ProviderEntry<V>) -> R,
    ) -> Option<R> {
        let mut inner = self.inner.borrow_mut();
        let entry = inner.stacks.get_mut(context)?.entries.get_mut(&id)?;
        Some(f(entry))
    }
}

/// Handle to one pushed provider entry.
pub struct ProviderHandle<V> {
    store: ContextStore<V>,
    context: ContextId,
    entry: EntryId,
}

impl<V> Clone for ProviderHandle<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            context: self.context.clone(),
            entry: self.entry,
        }
    }
}

impl<V> fmt::Debug for ProviderHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("context", &self.context)
            .field("entry", &self.entry)
            .finish()
    }
}

impl<V: Clone> ProviderHandle<V> {
    pub fn id(&self) -> EntryId {
        self.entry
    }

    pub fn context(&self) -> &ContextId {
        &self.context
    }

    pub fn state(&self) -> ProviderState {
        self.store
            .with_entry(&self.context, self.entry, |e| e.state)
            .unwrap_or(ProviderState::Cleared)
    }

    /// End the provider's scope and restore the entry that was current
    /// when it was pushed. Clearing twice is a no-op.
    pub fn clear(&self) {
        let mut inner = self.store.inner.borrow_mut();
        let Some(stack) = inner.stacks.get_mut(&self.context) else {
            return;
        };
        if stack.clear(self.entry) {
            log::trace!(target: "render.context", "clear {} entry={}", self.context, self.entry);
        }
    }

    /// Hide the entry from lookups without removing it.
    pub fn pause(&self) {
        self.transition(ProviderState::Paused, |s| {
            matches!(s, ProviderState::Active | ProviderState::Restored)
        });
    }

    /// Make a paused entry visible again.
    pub fn restore(&self) {
        self.transition(ProviderState::Restored, |s| s == ProviderState::Paused);
    }

    pub fn is_paused(&self) -> bool {
        self.state() == ProviderState::Paused
    }

    /// Record that a slot named `name` was rendered inside this provider.
    pub fn add_slot(&self, name: &str) {
        self.store.with_entry(&self.context, self.entry, |e| {
            e.slots.insert(name.to_string());
        });
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.store
            .with_entry(&self.context, self.entry, |e| e.slots.contains(name))
            .unwrap_or(false)
    }

    pub fn has_some_slot(&self) -> bool {
        self.store
            .with_entry(&self.context, self.entry, |e| !e.slots.is_empty())
            .unwrap_or(false)
    }

    fn transition(&self, to: ProviderState, allowed: impl FnOnce(ProviderState) -> bool) {
        let changed = self
            .store
            .with_entry(&self.context, self.entry, |e| {
                if allowed(e.state) {
                    e.state = to;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);
        if changed {
            log::trace!(target: "render.context", "{:?} {} entry={}", to, self.context, self.entry);
        }
    }
}
