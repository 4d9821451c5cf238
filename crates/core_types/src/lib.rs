use std::fmt;
use std::sync::Arc;

pub type RequestId = u64;

/// Suspense boundary id. Assigned 1, 2, 3, ... per render and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoundaryId(u32);

impl BoundaryId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a context. Two contexts with the same name are the same context,
/// which is also how the client side matches serialized providers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(Arc<str>);

impl ContextId {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Opaque tag grouping provider entries that belong to one custom-element host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeTag(u64);

impl ScopeTag {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}
