//! Failures raised by downstream handlers
//!
//! Handlers raise either a [`ClassifiedError`] or something the taxonomy does
//! not know about. The latter is captured as an [`UnexpectedFailure`] so its
//! details can be shown in diagnostic builds and hidden everywhere else.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::classified::ClassifiedError;
use crate::constants::CODE_UNEXPECTED;
use crate::taxonomy::ErrorCategory;

/// A failure outside the taxonomy, with its diagnostics captured as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnexpectedFailure {
    pub kind: String,
    pub message: String,
    /// Messages of the source chain, outermost first, excluding `message`
    pub chain: Vec<String>,
    pub backtrace: Option<String>,
}

impl UnexpectedFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: kind.into(), message: message.into(), chain: Vec::new(), backtrace: None }
    }

    /// Capture an `anyhow::Error` and its context chain
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        Self {
            kind: "anyhow::Error".to_string(),
            message: error.to_string(),
            chain: error.chain().skip(1).map(ToString::to_string).collect(),
            backtrace: captured_backtrace(),
        }
    }

    /// Capture a panic payload from `catch_unwind`
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked with a non-string payload".to_string());

        Self { kind: "panic".to_string(), message, chain: Vec::new(), backtrace: None }
    }
}

fn captured_backtrace() -> Option<String> {
    let backtrace = Backtrace::capture();
    (backtrace.status() == BacktraceStatus::Captured).then(|| backtrace.to_string())
}

impl fmt::Display for UnexpectedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for UnexpectedFailure {}

/// Any failure that reaches the dispatch coordinator
#[derive(Debug, Clone)]
pub enum Failure {
    Classified(ClassifiedError),
    Unexpected(UnexpectedFailure),
}

impl Failure {
    /// Category the failure is handled under; unexpected failures are System
    pub fn category(&self) -> ErrorCategory {
        match self {
            Failure::Classified(err) => err.category(),
            Failure::Unexpected(_) => ErrorCategory::System,
        }
    }

    /// Code reported for the failure; unexpected failures report 4000
    pub fn code(&self) -> i32 {
        match self {
            Failure::Classified(err) => err.code(),
            Failure::Unexpected(_) => CODE_UNEXPECTED,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Classified(err) => write!(f, "[{}] {}", err.code(), err),
            Failure::Unexpected(err) => write!(f, "[{CODE_UNEXPECTED}] {err}"),
        }
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Failure::Classified(err) => Some(err),
            Failure::Unexpected(err) => Some(err),
        }
    }
}

impl From<ClassifiedError> for Failure {
    fn from(err: ClassifiedError) -> Self {
        Failure::Classified(err)
    }
}

impl From<UnexpectedFailure> for Failure {
    fn from(err: UnexpectedFailure) -> Self {
        Failure::Unexpected(err)
    }
}

impl From<anyhow::Error> for Failure {
    /// Keeps a `ClassifiedError` that was bubbled through `anyhow`
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ClassifiedError>() {
            Ok(classified) => Failure::Classified(classified),
            Err(other) => Failure::Unexpected(UnexpectedFailure::from_anyhow(&other)),
        }
    }
}
