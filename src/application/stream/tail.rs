//! Adapts a renderer's chunk handle into the body stream of a response.
//!
//! Pull failures and failures the renderer reports through its callback are
//! the same logical event: both end the stream with one [`TailFailure`] and
//! are reported to the sink once. A report that arrives while a pull is
//! pending wins the race and ends the stream without waiting for the pull.

use std::{
    fmt,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream::BoxStream};
use metrics::counter;
use tokio::sync::mpsc::UnboundedReceiver;

use super::{
    METRIC_TAIL_FAILURE_TOTAL,
    error::TailFailure,
    sink::FailureSink,
    types::{ChunkStream, RenderCause},
};

const PULL_FAILED_MESSAGE: &str = "stream failed after the shell was sent";
const REPORTED_FAILURE_MESSAGE: &str = "renderer reported an error after the shell was sent";
pub(crate) const UNOBSERVED_REPORT_MESSAGE: &str =
    "renderer reported an error after the response body was released";

/// Lazy, ordered, single-pass sequence of body chunks.
///
/// Yields at most one `Err`, after which it is exhausted for good.
pub struct TailStream {
    inner: Option<BoxStream<'static, Result<Bytes, TailFailure>>>,
}

impl TailStream {
    pub(crate) fn adapt(
        handle: ChunkStream,
        reports: UnboundedReceiver<RenderCause>,
        sink: Arc<dyn FailureSink>,
    ) -> Self {
        Self {
            inner: Some(pull_chunks(handle, reports, sink).boxed()),
        }
    }

    /// True once the sequence has ended, either by exhaustion or failure.
    pub fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}

impl Stream for TailStream {
    type Item = Result<Bytes, TailFailure>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Err(failure))) => {
                // Dropping the handle here guarantees it is never pulled again.
                this.inner = None;
                Poll::Ready(Some(Err(failure)))
            }
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
        }
    }
}

impl fmt::Debug for TailStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailStream")
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Owns the report receiver for the lifetime of the tail.
///
/// Reports still queued when it drops, including those left behind when the
/// transport abandons the body, go to the sink.
struct PendingReports {
    receiver: UnboundedReceiver<RenderCause>,
    sink: Arc<dyn FailureSink>,
}

impl PendingReports {
    fn absorb(&mut self) {
        while self.receiver.try_recv().is_ok() {}
    }
}

impl Drop for PendingReports {
    fn drop(&mut self) {
        self.receiver.close();
        while let Ok(cause) = self.receiver.try_recv() {
            self.sink.error(UNOBSERVED_REPORT_MESSAGE, cause.as_ref());
        }
    }
}

enum Next {
    Reported(RenderCause),
    Pulled(Option<Result<Bytes, RenderCause>>),
}

fn pull_chunks(
    mut handle: ChunkStream,
    receiver: UnboundedReceiver<RenderCause>,
    sink: Arc<dyn FailureSink>,
) -> impl Stream<Item = Result<Bytes, TailFailure>> + Send + 'static {
    let mut reports = PendingReports { receiver, sink };
    stream! {
        loop {
            let next = tokio::select! {
                biased;
                Some(cause) = reports.receiver.recv() => Next::Reported(cause),
                item = handle.next() => Next::Pulled(item),
            };

            match next {
                Next::Reported(cause) => {
                    yield Err(fail(reports.sink.as_ref(), REPORTED_FAILURE_MESSAGE, cause, Severity::Error));
                    break;
                }
                Next::Pulled(Some(Ok(chunk))) => yield Ok(chunk),
                Next::Pulled(Some(Err(cause))) => {
                    // A callback report raised during this same pull describes this failure.
                    reports.absorb();
                    yield Err(fail(reports.sink.as_ref(), PULL_FAILED_MESSAGE, cause, Severity::Warning));
                    break;
                }
                Next::Pulled(None) => {
                    if let Ok(cause) = reports.receiver.try_recv() {
                        yield Err(fail(reports.sink.as_ref(), REPORTED_FAILURE_MESSAGE, cause, Severity::Error));
                    }
                    break;
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Severity {
    Warning,
    Error,
}

fn fail(
    sink: &dyn FailureSink,
    message: &str,
    cause: RenderCause,
    severity: Severity,
) -> TailFailure {
    match severity {
        Severity::Warning => sink.warning(message, cause.as_ref()),
        Severity::Error => sink.error(message, cause.as_ref()),
    }
    counter!(METRIC_TAIL_FAILURE_TOTAL).increment(1);
    TailFailure::new(cause)
}
