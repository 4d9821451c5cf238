//! # context
//!
//! Per-render registry of context providers.
//!
//! The renderer pushes a provider entry when it enters a provider node and
//! clears it when the provider's subtree is done. Components look values up
//! through the store, which always answers with the innermost non-paused
//! provider enclosing the current position.
//!
//! - [`ContextStore`]: provider stacks keyed by [`core_types::ContextId`]
//! - [`ProviderHandle`]: clear/pause/restore/slot operations on one entry
//! - [`ScopeSnapshot`] and [`Scoped`]: run a future under a captured view of
//!   the current providers, so interleaved async work keeps its own scope
//!
//! The store is generic over the value type and single-threaded
//! (`Rc`/`RefCell`). A store lives exactly as long as one render.

mod scope;
mod store;

pub use scope::{ScopeSnapshot, Scoped};
pub use store::{ContextStore, EntryId, ProviderHandle, ProviderState};
