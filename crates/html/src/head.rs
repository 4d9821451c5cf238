use std::collections::HashSet;

/// Bookkeeping for the document `<head>` while it streams out.
///
/// Inside the head, element ids are remembered so a second element carrying
/// an id that was already emitted can be dropped (first occurrence wins).
/// Outside the head nothing is tracked.
#[derive(Debug, Default)]
pub struct HeadTracker {
    inside: bool,
    seen: bool,
    ids: HashSet<String>,
}

impl HeadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_inside(&mut self, inside: bool) {
        self.inside = inside;
        if inside {
            self.seen = true;
        }
    }

    pub fn inside_head(&self) -> bool {
        self.inside
    }

    pub fn set_has_head(&mut self) {
        self.seen = true;
    }

    /// Returns `true` once a `<head>` element has been opened in this document.
    pub fn has_head(&self) -> bool {
        self.seen
    }

    pub fn add_id(&mut self, id: &str) {
        if self.inside {
            self.ids.insert(id.to_string());
        }
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.inside && self.ids.contains(id)
    }

    /// Decide whether an element with the given id may be emitted, recording
    /// the id when it is admitted.
    pub fn admit(&mut self, id: Option<&str>) -> bool {
        let Some(id) = id else {
            return true;
        };
        if !self.inside {
            return true;
        }
        self.ids.insert(id.to_string())
    }
}
