use std::error::Error as StdError;

use tracing::{error, warn};

/// Best-effort destination for failure reports. Implementations must not block.
pub trait FailureSink: Send + Sync {
    fn error(&self, message: &str, cause: &(dyn StdError + 'static));

    fn warning(&self, message: &str, cause: &(dyn StdError + 'static));
}

/// Sink that emits `tracing` events under the `shellstream::stream` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn error(&self, message: &str, cause: &(dyn StdError + 'static)) {
        let chain = cause_chain(cause);
        error!(
            target: "shellstream::stream",
            cause = %cause,
            chain = ?chain,
            "{message}"
        );
    }

    fn warning(&self, message: &str, cause: &(dyn StdError + 'static)) {
        let chain = cause_chain(cause);
        warn!(
            target: "shellstream::stream",
            cause = %cause,
            chain = ?chain,
            "{message}"
        );
    }
}

fn cause_chain(cause: &(dyn StdError + 'static)) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = cause.source();
    while let Some(inner) = current {
        messages.push(inner.to_string());
        current = inner.source();
    }
    messages
}
