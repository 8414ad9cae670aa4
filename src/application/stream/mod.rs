//! Streams a document tree through a [`Renderer`] into a [`NodeResponse`].
//!
//! Rendering fails in one of two phases. A shell failure happens before any
//! byte exists and is answered with a fixed 500 page. A tail failure happens
//! after the status line went out; the body stream ends early and the
//! transport sees a truncated response.

mod error;
mod response;
mod sink;
mod tail;
mod types;

use std::sync::Arc;

use metrics::counter;
use tokio::sync::mpsc::{self, UnboundedReceiver, error::SendError};

pub use error::{AssemblyError, ShellFailure, TailFailure};
pub use response::{
    INTERNAL_ERROR_BODY, NodeResponse, ResponseBody, ResponseConfig, SHELL_ERROR_BODY,
};
pub use sink::{FailureSink, TracingSink};
pub use tail::TailStream;
use tail::UNOBSERVED_REPORT_MESSAGE;
pub use types::{ChunkStream, ErrorReporter, RenderCause, RenderOptions, RenderRequest, Renderer};

pub const METRIC_STREAM_STARTED_TOTAL: &str = "shellstream_stream_started_total";
pub const METRIC_SHELL_FAILURE_TOTAL: &str = "shellstream_shell_failure_total";
pub const METRIC_TAIL_FAILURE_TOTAL: &str = "shellstream_tail_failure_total";
pub const METRIC_SETUP_FAILURE_TOTAL: &str = "shellstream_setup_failure_total";

/// Render `node` and wrap the output in a response, logging failures through `tracing`.
///
/// Never fails: every failure is encoded in the returned response.
pub async fn stream_node<R>(
    renderer: &R,
    node: R::Node,
    options: RenderOptions,
    config: ResponseConfig,
) -> NodeResponse
where
    R: Renderer + ?Sized,
{
    stream_node_with_sink(renderer, node, options, config, Arc::new(TracingSink)).await
}

/// Same as [`stream_node`], reporting failures to `sink`.
pub async fn stream_node_with_sink<R>(
    renderer: &R,
    node: R::Node,
    options: RenderOptions,
    config: ResponseConfig,
    sink: Arc<dyn FailureSink>,
) -> NodeResponse
where
    R: Renderer + ?Sized,
{
    match invoke_shell(renderer, RenderRequest::new(node, options), &sink).await {
        Ok(shell) => assemble_stream(shell, &config, sink),
        Err(failure) => {
            sink.error(
                "shell rendering failed; sending 500 response",
                failure.cause(),
            );
            counter!(METRIC_SHELL_FAILURE_TOTAL).increment(1);
            NodeResponse::shell_error()
        }
    }
}

struct Shell {
    handle: ChunkStream,
    reports: UnboundedReceiver<RenderCause>,
}

async fn invoke_shell<R>(
    renderer: &R,
    request: RenderRequest<R::Node>,
    sink: &Arc<dyn FailureSink>,
) -> Result<Shell, ShellFailure>
where
    R: Renderer + ?Sized,
{
    let RenderRequest { node, mut options } = request;

    let (reports_tx, reports) = mpsc::unbounded_channel();
    let unobserved = Arc::clone(sink);
    options.on_error = Some(ErrorReporter::new(move |cause| {
        // The receiver is gone once the tail settles or the body is dropped.
        if let Err(SendError(cause)) = reports_tx.send(cause) {
            unobserved.error(UNOBSERVED_REPORT_MESSAGE, cause.as_ref());
        }
    }));

    let handle = renderer
        .render(node, options)
        .await
        .map_err(ShellFailure::new)?;

    Ok(Shell { handle, reports })
}

fn assemble_stream(
    shell: Shell,
    config: &ResponseConfig,
    sink: Arc<dyn FailureSink>,
) -> NodeResponse {
    let tail = TailStream::adapt(shell.handle, shell.reports, Arc::clone(&sink));

    match NodeResponse::streaming(config, tail) {
        Ok(response) => {
            counter!(METRIC_STREAM_STARTED_TOTAL).increment(1);
            response
        }
        Err(error) => {
            sink.error(
                "unexpected error during stream setup; sending 500 response",
                &error,
            );
            counter!(METRIC_SETUP_FAILURE_TOTAL).increment(1);
            NodeResponse::internal_error()
        }
    }
}
