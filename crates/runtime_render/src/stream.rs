use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use core_types::RequestId;
use futures::channel::mpsc::UnboundedReceiver;
use futures::future::{Either, FutureExt, LocalBoxFuture, select};
use futures::stream::{Stream, StreamExt};

use crate::abort::AbortSignal;
use crate::controller::StreamController;
use crate::error::{RenderError, Result};

/// Chunks of one render, in output order.
///
/// Ends after the last chunk. An unrecovered failure is yielded once, after
/// every chunk written before it, and then the stream ends. An abort ends
/// the stream without an error.
pub struct RenderStream {
    driver: Option<LocalBoxFuture<'static, Result<()>>>,
    chunks: UnboundedReceiver<String>,
    error: Option<RenderError>,
    controller: Rc<StreamController>,
}

impl RenderStream {
    pub(crate) fn new(
        main: LocalBoxFuture<'static, Result<()>>,
        controller: Rc<StreamController>,
        signal: AbortSignal,
        chunks: UnboundedReceiver<String>,
        request_id: RequestId,
    ) -> Self {
        let driver = {
            let controller = Rc::clone(&controller);
            async move {
                if signal.is_aborted() {
                    log::debug!(target: "render.stream", "request {request_id} aborted before start");
                    controller.close();
                    return Ok(());
                }
                let work = drive(main, Rc::clone(&controller)).boxed_local();
                // Abort is polled first so nothing is produced once it fired.
                let outcome = match select(signal.aborted(), work).await {
                    Either::Left(((), _unfinished)) => {
                        log::debug!(target: "render.stream", "request {request_id} aborted");
                        Ok(())
                    }
                    Either::Right((outcome, _)) => outcome,
                };
                controller.close();
                match &outcome {
                    Ok(()) => log::debug!(target: "render.stream", "request {request_id} finished"),
                    Err(err) => log::debug!(target: "render.stream", "request {request_id} failed: {err}"),
                }
                outcome
            }
            .boxed_local()
        };
        Self {
            driver: Some(driver),
            chunks,
            error: None,
            controller,
        }
    }
}

/// Run the main render and every suspended render together until both are
/// done, then release the remaining units. A main failure stops at once.
async fn drive(main: LocalBoxFuture<'static, Result<()>>, controller: Rc<StreamController>) -> Result<()> {
    let mut main = Some(main);
    poll_fn(|cx| {
        if let Some(fut) = main.as_mut() {
            match fut.as_mut().poll(cx) {
                Poll::Ready(Ok(())) => main = None,
                Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                Poll::Pending => {}
            }
        }
        match controller.poll_suspended(cx) {
            Poll::Ready(()) if main.is_none() => Poll::Ready(Ok(())),
            _ => Poll::Pending,
        }
    })
    .await?;
    controller.wait_suspensed_promises().await;
    Ok(())
}

impl Stream for RenderStream {
    type Item = Result<String, RenderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(driver) = this.driver.as_mut() {
            if let Poll::Ready(outcome) = driver.as_mut().poll(cx) {
                this.driver = None;
                if let Err(err) = outcome {
                    this.error = Some(err);
                }
            }
        }
        match this.chunks.poll_next_unpin(cx) {
            Poll::Ready(Some(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(None) => Poll::Ready(this.error.take().map(Err)),
            Poll::Pending if this.driver.is_none() => Poll::Ready(this.error.take().map(Err)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for RenderStream {
    fn drop(&mut self) {
        // Suspended renders hold the controller; dropping them breaks the cycle.
        self.controller.close();
    }
}
