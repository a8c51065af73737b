//! Common error types and utilities
//!
//! This module provides the error primitives shared by every Faultline crate:
//!
//! 1. **`CommonError`**: standard error patterns that show up in more than one
//!    crate (configuration, timeouts, internal invariants).
//!
//! 2. **`ErrorClassification` trait**: a standard interface for classifying
//!    errors by retryability and severity.
//!
//! 3. **`ErrorSeverity` enum**: a unified severity scale used to pick log
//!    levels.
//!
//! ## ErrorSeverity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Handled edge case |
//! | **Warning** | Caller-caused or degraded | Business rule violated |
//! | **Error** | Failure requiring attention | Data store unreachable |
//! | **Critical** | System integrity at risk | Circuit breaker open |
//!
//! ## Composition
//!
//! Crate-specific errors should compose with `CommonError` rather than
//! duplicating the common variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum PrunerError {
//!     #[error("Sweep failed: {0}")]
//!     Sweep(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```

use std::fmt;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Common error variants that appear across multiple crates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Configuration or lifecycle misuse
    Config { message: String },

    /// Timeout errors
    Timeout { operation: String, duration: Duration },

    /// Internal errors that shouldn't normally occur
    Internal { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message } => write!(f, "Configuration error: {}", message),
            Self::Timeout { operation, duration } => {
                write!(f, "Operation '{}' timed out after {:?}", operation, duration)
            }
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }
}

/// Error classification trait for consistent error handling across crates
///
/// Implementors describe whether an error is worth retrying and how loudly it
/// should be reported. The dispatch layer routes retryable failures through
/// the resilience pipeline and uses `severity()` to choose the log level.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient infrastructure issues that may succeed
    /// if attempted again.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for common error primitives.
    use super::*;

    /// Validates the display text of each `CommonError` variant.
    #[test]
    fn test_common_error_display() {
        assert_eq!(
            CommonError::config("Metrics pruner already running").to_string(),
            "Configuration error: Metrics pruner already running"
        );
        assert_eq!(
            CommonError::timeout("pruner_shutdown", Duration::from_secs(5)).to_string(),
            "Operation 'pruner_shutdown' timed out after 5s"
        );
        assert_eq!(
            CommonError::internal("join failed").to_string(),
            "Internal error: join failed"
        );
    }

    /// Severity ordering drives log-level selection, so it must be monotonic.
    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }
}
