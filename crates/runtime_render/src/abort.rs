use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

#[derive(Default)]
struct Shared {
    aborted: AtomicBool,
    wakers: Mutex<Vec<Waker>>,
}

/// Client-disconnect signal for one render.
///
/// Clones observe the same flag. Unlike the rest of a render this type is
/// `Send + Sync`, so a connection layer running elsewhere can fire it.
#[derive(Clone, Default)]
pub struct AbortSignal {
    shared: Arc<Shared>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Repeated calls are ignored.
    pub fn abort(&self) {
        if self.shared.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        let wakers = std::mem::take(&mut *self.lock());
        log::debug!(target: "render.stream", "abort signalled, waking {} waiter(s)", wakers.len());
        for waker in wakers {
            waker.wake();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::SeqCst)
    }

    /// Future resolving once [`AbortSignal::abort`] has been called.
    pub fn aborted(&self) -> Aborted {
        Aborted {
            signal: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Waker>> {
        self.shared
            .wakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

pub struct Aborted {
    signal: AbortSignal,
}

impl Future for Aborted {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut wakers = self.signal.lock();
        // Checked under the lock so an abort racing this poll cannot be missed.
        if self.signal.is_aborted() {
            return Poll::Ready(());
        }
        if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
            wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn aborted_future_resolves_after_abort() {
        let signal = AbortSignal::new();
        let mut fut = signal.aborted();
        assert!((&mut fut).now_or_never().is_none());
        signal.abort();
        assert!(fut.now_or_never().is_some());
        assert!(signal.is_aborted());
    }

    #[test]
    fn abort_is_visible_across_threads() {
        let signal = AbortSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || remote.abort())
            .join()
            .expect("abort thread panicked");
        futures::executor::block_on(signal.aborted());
    }

    #[test]
    fn repeated_abort_is_ignored() {
        let signal = AbortSignal::new();
        signal.abort();
        signal.abort();
        assert!(signal.is_aborted());
    }
}
