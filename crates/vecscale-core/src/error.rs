//! Error types for configuration loading and validation.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),
}
