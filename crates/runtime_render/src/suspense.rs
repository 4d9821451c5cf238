use std::cell::{Cell, RefCell};
use std::task::{Context, Poll, Waker};

use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

/// Background renders of suspended boundaries.
///
/// Works like a wait group: tasks may be added at any time, including from
/// inside a task being polled, and [`SuspenseTasks::poll_drain`] completes
/// only once every task added so far has finished.
#[derive(Default)]
pub(crate) struct SuspenseTasks {
    running: RefCell<FuturesUnordered<LocalBoxFuture<'static, ()>>>,
    incoming: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    waker: RefCell<Option<Waker>>,
    closed: Cell<bool>,
}

impl SuspenseTasks {
    pub(crate) fn push(&self, task: LocalBoxFuture<'static, ()>) {
        if self.closed.get() {
            return;
        }
        self.incoming.borrow_mut().push(task);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    pub(crate) fn len(&self) -> usize {
        let running = self.running.try_borrow().map_or(0, |r| r.len());
        running + self.incoming.borrow().len()
    }

    /// Poll every task; `Ready` once none is left.
    pub(crate) fn poll_drain(&self, cx: &mut Context<'_>) -> Poll<()> {
        *self.waker.borrow_mut() = Some(cx.waker().clone());
        // Re-entrant polls from inside a task see the set as busy.
        let Ok(mut running) = self.running.try_borrow_mut() else {
            return Poll::Pending;
        };
        loop {
            let fresh = std::mem::take(&mut *self.incoming.borrow_mut());
            running.extend(fresh);
            match running.poll_next_unpin(cx) {
                Poll::Ready(Some(())) => continue,
                Poll::Ready(None) | Poll::Pending if !self.incoming.borrow().is_empty() => continue,
                Poll::Ready(None) => return Poll::Ready(()),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    /// Drop every task and refuse new ones. Tasks hold handles back to the
    /// controller, so this also breaks those reference cycles.
    pub(crate) fn close(&self) {
        self.closed.set(true);
        let running = self
            .running
            .try_borrow_mut()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default();
        let incoming = std::mem::take(&mut *self.incoming.borrow_mut());
        self.waker.borrow_mut().take();
        drop(running);
        drop(incoming);
    }
}
