//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Faultline
///
/// Covers the service's own failures (bad configuration, metrics
/// bookkeeping). Failures raised by request handlers are
/// [`crate::Failure`]s, not this type.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum FaultlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Faultline operations
pub type Result<T> = std::result::Result<T, FaultlineError>;
