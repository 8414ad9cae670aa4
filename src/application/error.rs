use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_exit_with_usage_code() {
        let error = AppError::from(LoadError::invalid("server.port", "must be greater than zero"));
        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.to_string(),
            "failed to load configuration: invalid configuration for `server.port`: must be greater than zero"
        );
    }

    #[test]
    fn infra_errors_are_transparent() {
        let error = AppError::from(InfraError::telemetry("subscriber already set"));
        assert_eq!(
            error.to_string(),
            "telemetry initialization failed: subscriber already set"
        );
        assert_eq!(error.exit_code(), 1);
    }
}
