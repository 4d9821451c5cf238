//! The only writer of the output sink.
//!
//! Top-level output goes straight to the sink. Output of a suspended boundary
//! is buffered per boundary id and released as one deferred unit once the
//! boundary's own tag counts balance. Units are only released while the
//! top-level tag counts are balanced too, so a unit never lands in the middle
//! of an open top-level element.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::poll_fn;
use std::task::{Context, Poll};

use core_types::BoundaryId;
use futures::channel::mpsc::UnboundedSender;
use futures::future::LocalBoxFuture;
use html::HeadTracker;

use crate::config::RenderConfig;
use crate::suspense::SuspenseTasks;

#[derive(Debug, Default)]
struct Accumulator {
    chunk: String,
    open: usize,
    close: usize,
}

struct ControllerState {
    sink: Option<UnboundedSender<String>>,
    open: usize,
    close: usize,
    next_boundary: u32,
    parents: HashMap<BoundaryId, Option<BoundaryId>>,
    pending: HashMap<BoundaryId, Accumulator>,
    completed: HashSet<BoundaryId>,
    discarded: HashSet<BoundaryId>,
    ready: VecDeque<(BoundaryId, String)>,
    runtime_sent: bool,
    head: HeadTracker,
}

impl ControllerState {
    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let Some(sink) = &self.sink else {
            log::trace!(target: "render.controller", "sink closed, dropping {} bytes", text.len());
            return;
        };
        if sink.unbounded_send(text.to_string()).is_err() {
            log::debug!(target: "render.controller", "receiver gone, closing sink");
            self.sink = None;
        }
    }

    fn is_dead(&self, id: BoundaryId) -> bool {
        self.completed.contains(&id) || self.discarded.contains(&id)
    }

    /// Accumulator for a live boundary, created on first use.
    fn accumulator(&mut self, id: BoundaryId) -> Option<&mut Accumulator> {
        if self.is_dead(id) {
            log::warn!(target: "render.controller", "write to finished boundary {id} dropped");
            return None;
        }
        Some(self.pending.entry(id).or_default())
    }

    fn top_level_balanced(&self) -> bool {
        self.open == self.close
    }
}

pub struct StreamController {
    state: RefCell<ControllerState>,
    tasks: SuspenseTasks,
    replace_function: String,
    runtime: Option<String>,
}

impl StreamController {
    pub fn new(sink: UnboundedSender<String>, config: &RenderConfig) -> Self {
        Self {
            state: RefCell::new(ControllerState {
                sink: Some(sink),
                open: 0,
                close: 0,
                next_boundary: 0,
                parents: HashMap::new(),
                pending: HashMap::new(),
                completed: HashSet::new(),
                discarded: HashSet::new(),
                ready: VecDeque::new(),
                runtime_sent: false,
                head: HeadTracker::new(),
            }),
            tasks: SuspenseTasks::default(),
            replace_function: config.replace_function.clone(),
            runtime: config
                .inject_replace_runtime
                .then(|| config.replace_runtime()),
        }
    }

    pub fn enqueue(&self, text: &str, boundary: Option<BoundaryId>) {
        let mut state = self.state.borrow_mut();
        match boundary {
            None => state.write(text),
            Some(id) => {
                if let Some(acc) = state.accumulator(id) {
                    acc.chunk.push_str(text);
                }
            }
        }
    }

    /// Count an opening tag. `None` counts without writing anything.
    pub fn start_tag(&self, text: Option<&str>, boundary: Option<BoundaryId>) {
        let mut state = self.state.borrow_mut();
        match boundary {
            None => {
                state.open += 1;
                if let Some(text) = text {
                    state.write(text);
                }
            }
            Some(id) => {
                if let Some(acc) = state.accumulator(id) {
                    acc.open += 1;
                    if let Some(text) = text {
                        acc.chunk.push_str(text);
                    }
                }
            }
        }
    }

    /// Count a closing tag, releasing whatever became complete.
    pub fn end_tag(&self, text: Option<&str>, boundary: Option<BoundaryId>) {
        let mut state = self.state.borrow_mut();
        match boundary {
            None => {
                state.close += 1;
                if let Some(text) = text {
                    state.write(text);
                }
                if state.top_level_balanced() {
                    self.flush_ready(&mut state);
                }
            }
            Some(id) => {
                let Some(acc) = state.accumulator(id) else {
                    return;
                };
                acc.close += 1;
                if let Some(text) = text {
                    acc.chunk.push_str(text);
                }
                if acc.open == acc.close {
                    self.complete(&mut state, id);
                }
            }
        }
    }

    /// Allocate the next boundary id under `parent`.
    pub fn next_suspense_index(&self, parent: Option<BoundaryId>) -> BoundaryId {
        let mut state = self.state.borrow_mut();
        state.next_boundary += 1;
        let id = BoundaryId::from_raw(state.next_boundary);
        state.parents.insert(id, parent);
        log::trace!(target: "render.controller", "boundary {id} allocated under {parent:?}");
        id
    }

    /// Opening wrapper of a boundary's deferred unit.
    pub fn open_deferred(&self, id: BoundaryId) {
        self.start_tag(Some(&format!("<template id=\"U:{id}\">")), Some(id));
    }

    /// Closing wrapper plus the replace invocation. Balances the boundary
    /// once everything rendered inside it has closed.
    pub fn close_deferred(&self, id: BoundaryId) {
        let text = format!(
            "</template><script id=\"R:{id}\">{}('{id}')</script>",
            self.replace_function
        );
        self.end_tag(Some(&text), Some(id));
    }

    /// Drop a boundary that will never complete. Its placeholder keeps the
    /// fallback and its nested boundaries are dropped when they finish.
    pub fn discard_boundary(&self, id: BoundaryId) {
        let mut state = self.state.borrow_mut();
        state.pending.remove(&id);
        state.discarded.insert(id);
        log::debug!(target: "render.controller", "boundary {id} discarded");
    }

    /// Register the background render of a suspended boundary.
    pub fn suspense_promise(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.push(task);
        log::trace!(target: "render.controller", "{} suspended render(s) in flight", self.tasks.len());
    }

    /// Make progress on registered renders; `Ready` when none is left.
    pub fn poll_suspended(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.tasks.poll_drain(cx)
    }

    /// Wait for every registered render, then release all ready units.
    pub async fn wait_suspensed_promises(&self) {
        poll_fn(|cx| self.tasks.poll_drain(cx)).await;
        let mut state = self.state.borrow_mut();
        let leftovers = state.pending.len();
        if leftovers > 0 {
            log::warn!(target: "render.controller", "{leftovers} boundary(ies) never balanced");
        }
        self.flush_ready(&mut state);
    }

    /// Close the sink. Later writes are silent no-ops and pending background
    /// renders are dropped.
    pub fn close(&self) {
        {
            let mut state = self.state.borrow_mut();
            if state.sink.take().is_some() {
                log::debug!(
                    target: "render.controller",
                    "sink closed with {} boundary(ies) pending",
                    state.pending.len()
                );
            }
            state.ready.clear();
        }
        self.tasks.close();
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().sink.is_none()
    }

    pub fn add_id(&self, id: &str) {
        self.state.borrow_mut().head.add_id(id);
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.state.borrow().head.has_id(id)
    }

    /// Record `id` if it may be emitted; `false` for a duplicate in the head.
    pub fn admit_id(&self, id: Option<&str>) -> bool {
        self.state.borrow_mut().head.admit(id)
    }

    pub fn inside_head_tag(&self) -> bool {
        self.state.borrow().head.inside_head()
    }

    pub fn set_inside_head_tag(&self, inside: bool) {
        self.state.borrow_mut().head.set_inside(inside);
    }

    pub fn has_head_tag(&self) -> bool {
        self.state.borrow().head.has_head()
    }

    pub fn set_has_head_tag(&self) {
        self.state.borrow_mut().head.set_has_head();
    }

    fn complete(&self, state: &mut ControllerState, id: BoundaryId) {
        let unit = state.pending.remove(&id).map(|acc| acc.chunk).unwrap_or_default();
        state.completed.insert(id);

        let mut cursor = state.parents.get(&id).copied().flatten();
        while let Some(parent) = cursor {
            if state.discarded.contains(&parent) {
                log::debug!(target: "render.controller", "boundary {id} dropped with discarded {parent}");
                return;
            }
            if let Some(acc) = state.pending.get_mut(&parent) {
                log::trace!(target: "render.controller", "boundary {id} merged into {parent}");
                acc.chunk.push_str(&unit);
                return;
            }
            cursor = state.parents.get(&parent).copied().flatten();
        }

        log::trace!(target: "render.controller", "boundary {id} ready ({} bytes)", unit.len());
        state.ready.push_back((id, unit));
        if state.top_level_balanced() {
            self.flush_ready(state);
        }
    }

    fn flush_ready(&self, state: &mut ControllerState) {
        while let Some((id, unit)) = state.ready.pop_front() {
            if !state.runtime_sent {
                state.runtime_sent = true;
                if let Some(runtime) = &self.runtime {
                    state.write(runtime);
                }
            }
            log::debug!(target: "render.controller", "flushing boundary {id}");
            state.write(&unit);
        }
    }
}
