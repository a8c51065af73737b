//! Error types shared by the resilience policies

use std::time::Duration;

use thiserror::Error;

/// Simple configuration error for validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur in resilience operations
///
/// Generic over the underlying operation error type `E` so the original
/// failure survives the trip through the policies. A breaker rejection is a
/// separate variant and never carries an operation error.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// Circuit breaker is open (or a half-open trial is already running)
    #[error("Circuit breaker is open, rejecting calls (retry after {retry_after:?})")]
    CircuitOpen { retry_after: Duration },

    /// The underlying operation failed on every permitted attempt
    #[error("Operation failed after {attempts} attempt(s)")]
    OperationFailed {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The caller cancelled the operation while it was pending
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;
