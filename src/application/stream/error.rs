use std::error::Error as StdError;

use thiserror::Error;

use super::types::RenderCause;

/// The renderer could not produce its shell. No bytes have been emitted.
#[derive(Debug, Error)]
#[error("shell rendering failed: {source}")]
pub struct ShellFailure {
    #[source]
    source: RenderCause,
}

impl ShellFailure {
    pub fn new(cause: RenderCause) -> Self {
        Self { source: cause }
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

/// A chunk pull failed after the shell was sent. The body is truncated at this point.
#[derive(Debug, Error)]
#[error("stream failed after the shell was sent: {source}")]
pub struct TailFailure {
    #[source]
    source: RenderCause,
}

impl TailFailure {
    pub fn new(cause: RenderCause) -> Self {
        Self { source: cause }
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

/// Faults in the adapter's own response assembly.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("invalid status code {0}")]
    InvalidStatus(u16),
    #[error("invalid header name `{name}`")]
    InvalidHeaderName { name: String },
    #[error("invalid value for header `{name}`")]
    InvalidHeaderValue { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_failure_exposes_cause() {
        let failure = ShellFailure::new("test".into());
        assert_eq!(failure.cause().to_string(), "test");
        assert_eq!(
            failure.source().map(|inner| inner.to_string()).as_deref(),
            Some("test")
        );
        assert_eq!(failure.to_string(), "shell rendering failed: test");
    }

    #[test]
    fn tail_failure_exposes_cause() {
        let failure = TailFailure::new("test".into());
        assert_eq!(failure.cause().to_string(), "test");
        assert!(failure.source().is_some());
        assert_eq!(
            failure.to_string(),
            "stream failed after the shell was sent: test"
        );
    }
}
