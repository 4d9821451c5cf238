//! Test helpers shared by the render crates.
//!
//! Everything here is executor-agnostic and single-threaded; tests drive it
//! with `futures::executor::block_on`.

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use futures::stream::{Stream, StreamExt};
use std::fmt::Write;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Escape control characters so a chunk prints on one line.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' => {
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Describe where two chunk sequences first diverge, with two lines of context.
pub fn diff_lines<E: AsRef<str>, A: AsRef<str>>(expected: &[E], actual: &[A]) -> String {
    let max = expected.len().max(actual.len());
    let mut out = String::new();
    let missing = "<missing>";
    let exp = |i: usize| expected.get(i).map(|s| s.as_ref());
    let act = |i: usize| actual.get(i).map(|s| s.as_ref());
    let line = |v: Option<&str>| v.map(escape_text).unwrap_or_else(|| missing.to_string());

    let mismatch = (0..max).find(|&i| exp(i) != act(i));
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(
            &mut out,
            "first mismatch at chunk {} (showing {}..={}):",
            i + 1,
            start + 1,
            end
        );
        for idx in start..end {
            let left = line(exp(idx));
            let right = line(act(idx));
            let marker = if idx == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {left}", idx + 1);
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {right}", idx + 1);
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} chunks, actual {} chunks",
        expected.len(),
        actual.len()
    );
    out
}

/// Output of a fully drained chunk stream.
#[derive(Debug)]
pub struct Collected<E> {
    pub chunks: Vec<String>,
    pub error: Option<E>,
    /// Items the stream produced after its first error. Should stay zero.
    pub after_error: usize,
}

impl<E> Collected<E> {
    pub fn concat(&self) -> String {
        self.chunks.concat()
    }
}

/// Drain a render stream, splitting successful chunks from the first error.
pub async fn collect_chunks<S, E>(stream: S) -> Collected<E>
where
    S: Stream<Item = Result<String, E>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut collected = Collected {
        chunks: Vec::new(),
        error: None,
        after_error: 0,
    };
    while let Some(item) = stream.next().await {
        if collected.error.is_some() {
            collected.after_error += 1;
            continue;
        }
        match item {
            Ok(chunk) => collected.chunks.push(chunk),
            Err(err) => collected.error = Some(err),
        }
    }
    collected
}

/// Future that stays pending until its [`GateOpener`] fires. Clones share
/// the same gate.
#[derive(Clone)]
pub struct Gate {
    inner: Shared<oneshot::Receiver<()>>,
}

impl Gate {
    /// Resolves once the gate is opened. A dropped opener also opens it.
    pub async fn wait(self) {
        let _ = self.inner.await;
    }
}

pub struct GateOpener {
    tx: Option<oneshot::Sender<()>>,
}

impl GateOpener {
    pub fn open(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Create a manually released gate for ordering async components in tests.
pub fn gate() -> (GateOpener, Gate) {
    let (tx, rx) = oneshot::channel();
    (GateOpener { tx: Some(tx) }, Gate { inner: rx.shared() })
}

/// Return `Pending` exactly once, waking immediately.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Yield `n` times in a row.
pub async fn yield_times(n: usize) {
    for _ in 0..n {
        yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::stream;

    #[test]
    fn diff_reports_first_mismatch() {
        let report = diff_lines(&["a", "b", "c"], &["a", "x", "c"]);
        assert!(report.contains("first mismatch at chunk 2"));
        assert!(report.contains("expected: b"));
        assert!(report.contains("actual: x"));
    }

    #[test]
    fn diff_of_equal_sequences_has_no_mismatch() {
        let report = diff_lines(&["a"], &["a".to_string()]);
        assert!(!report.contains("mismatch"));
    }

    #[test]
    fn collect_stops_recording_after_error() {
        let items: Vec<Result<String, &str>> =
            vec![Ok("a".into()), Err("boom"), Ok("late".into())];
        let got = block_on(collect_chunks(stream::iter(items)));
        assert_eq!(got.chunks, vec!["a".to_string()]);
        assert_eq!(got.error, Some("boom"));
        assert_eq!(got.after_error, 1);
    }

    #[test]
    fn gate_releases_all_waiters() {
        let (mut opener, gate) = gate();
        let a = gate.clone().wait();
        let b = gate.wait();
        opener.open();
        block_on(futures::future::join(a, b));
    }

    #[test]
    fn yield_now_completes_on_second_poll() {
        block_on(yield_times(3));
    }
}
