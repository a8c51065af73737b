//! Classified errors
//!
//! A [`ClassifiedError`] is a failure tagged with a category, a code from that
//! category's range and the transport status to answer with. The range is
//! checked at construction; an out-of-range code never produces a value.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use faultline_common::{ErrorClassification, ErrorSeverity};
use thiserror::Error;

use crate::constants::{
    CIRCUIT_BREAKER_OPEN_MESSAGE, CODE_BUSINESS_RULE_VIOLATION, CODE_CIRCUIT_BREAKER_OPEN,
    CODE_CONFIGURATION_FILE_MISSING, CODE_DATA_CONNECTION_FAILED, CODE_RESOURCE_EXHAUSTED,
    CONFIGURATION_FILE_MISSING_MESSAGE, DATA_CONNECTION_FAILED_MESSAGE,
};
use crate::taxonomy::{CodeRange, ErrorCategory, TransportStatus};

/// Shared, type-erased underlying failure
type ErrorCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Constructing a classified error with a code outside its category's range
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("error code {code} is outside the {category} range {range}")]
pub struct RangeViolation {
    pub code: i32,
    pub category: ErrorCategory,
    pub range: CodeRange,
}

/// Failure tagged with a category, code and transport status
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    code: i32,
    category: ErrorCategory,
    status: TransportStatus,
    message: String,
    cause: Option<ErrorCause>,
    breaker_rejection: bool,
}

// Well-known codes must sit inside their category's range.
const _: () = {
    assert!(ErrorCategory::Configuration.range().contains(CODE_CONFIGURATION_FILE_MISSING));
    assert!(ErrorCategory::Data.range().contains(CODE_DATA_CONNECTION_FAILED));
    assert!(ErrorCategory::Logical.range().contains(CODE_BUSINESS_RULE_VIOLATION));
    assert!(ErrorCategory::System.range().contains(CODE_RESOURCE_EXHAUSTED));
    assert!(ErrorCategory::System.range().contains(CODE_CIRCUIT_BREAKER_OPEN));
};

impl ClassifiedError {
    /// Create an error with the category's default transport status
    pub fn new(
        category: ErrorCategory,
        code: i32,
        message: impl Into<String>,
    ) -> Result<Self, RangeViolation> {
        Self::with_status(category, code, category.default_status(), message)
    }

    /// Create an error with an explicit transport status
    pub fn with_status(
        category: ErrorCategory,
        code: i32,
        status: TransportStatus,
        message: impl Into<String>,
    ) -> Result<Self, RangeViolation> {
        let range = category.range();
        if !range.contains(code) {
            return Err(RangeViolation { code, category, range });
        }
        Ok(Self::in_range(category, code, status, message))
    }

    pub fn configuration(code: i32, message: impl Into<String>) -> Result<Self, RangeViolation> {
        Self::new(ErrorCategory::Configuration, code, message)
    }

    pub fn data(code: i32, message: impl Into<String>) -> Result<Self, RangeViolation> {
        Self::new(ErrorCategory::Data, code, message)
    }

    pub fn logical(code: i32, message: impl Into<String>) -> Result<Self, RangeViolation> {
        Self::new(ErrorCategory::Logical, code, message)
    }

    pub fn system(code: i32, message: impl Into<String>) -> Result<Self, RangeViolation> {
        Self::new(ErrorCategory::System, code, message)
    }

    /// 1001: configuration file missing or unreadable
    pub fn configuration_file_missing() -> Self {
        Self::in_range(
            ErrorCategory::Configuration,
            CODE_CONFIGURATION_FILE_MISSING,
            TransportStatus::BadRequest,
            CONFIGURATION_FILE_MISSING_MESSAGE,
        )
    }

    /// 2001: the data store could not be reached
    pub fn data_connection_failed() -> Self {
        Self::in_range(
            ErrorCategory::Data,
            CODE_DATA_CONNECTION_FAILED,
            TransportStatus::ServiceUnavailable,
            DATA_CONNECTION_FAILED_MESSAGE,
        )
    }

    /// 3001: the request violates a business rule
    pub fn business_rule_violation(message: impl Into<String>) -> Self {
        Self::in_range(
            ErrorCategory::Logical,
            CODE_BUSINESS_RULE_VIOLATION,
            TransportStatus::BadRequest,
            message,
        )
    }

    /// 4001: a system resource is exhausted or unavailable
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::in_range(
            ErrorCategory::System,
            CODE_RESOURCE_EXHAUSTED,
            TransportStatus::ServiceUnavailable,
            message,
        )
    }

    /// 4500: the circuit breaker rejected the call
    ///
    /// Only this constructor marks an error as a breaker rejection; a handler
    /// raising code 4500 through [`ClassifiedError::system`] is an ordinary
    /// system failure.
    pub fn circuit_breaker_open() -> Self {
        let mut err = Self::in_range(
            ErrorCategory::System,
            CODE_CIRCUIT_BREAKER_OPEN,
            TransportStatus::ServiceUnavailable,
            CIRCUIT_BREAKER_OPEN_MESSAGE,
        );
        err.breaker_rejection = true;
        err
    }

    // Codes are range-checked by the constructor or the const block above.
    fn in_range(
        category: ErrorCategory,
        code: i32,
        status: TransportStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            category,
            status,
            message: message.into(),
            cause: None,
            breaker_rejection: false,
        }
    }

    /// Attach the underlying failure
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn status(&self) -> TransportStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Whether this error was produced by a breaker rejection
    pub fn is_circuit_breaker(&self) -> bool {
        self.breaker_rejection
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ClassifiedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl ErrorClassification for ClassifiedError {
    /// System failures go through retry and the breaker; breaker rejections
    /// never re-enter it
    fn is_retryable(&self) -> bool {
        self.category.is_retryable() && !self.is_circuit_breaker()
    }

    fn severity(&self) -> ErrorSeverity {
        if self.is_circuit_breaker() {
            return ErrorSeverity::Critical;
        }
        match self.category {
            ErrorCategory::Logical => ErrorSeverity::Warning,
            ErrorCategory::Configuration | ErrorCategory::Data | ErrorCategory::System => {
                ErrorSeverity::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_out_of_range_construction_fails() {
        let err = ClassifiedError::configuration(2001, "wrong range").expect_err("should fail");
        assert_eq!(err.code, 2001);
        assert_eq!(err.category, ErrorCategory::Configuration);
        assert_eq!(
            err.to_string(),
            "error code 2001 is outside the Configuration Error range [1000, 1999]"
        );

        assert!(ClassifiedError::system(5000, "too high").is_err());
        assert!(ClassifiedError::data(1999, "too low").is_err());
    }

    #[test]
    fn test_in_range_construction_uses_default_status() {
        let err = ClassifiedError::logical(3999, "rule broken").expect("in range");
        assert_eq!(err.category(), ErrorCategory::Logical);
        assert_eq!(err.status(), TransportStatus::BadRequest);

        let err = ClassifiedError::system(4000, "disk full").expect("in range");
        assert_eq!(err.status(), TransportStatus::InternalServerError);

        let err = ClassifiedError::with_status(
            ErrorCategory::System,
            4002,
            TransportStatus::ServiceUnavailable,
            "queue saturated",
        )
        .expect("in range");
        assert_eq!(err.status(), TransportStatus::ServiceUnavailable);
    }

    /// Well-known constructors skip the runtime check; confirm they would pass it.
    #[test]
    fn test_well_known_errors_respect_ranges() {
        for err in [
            ClassifiedError::configuration_file_missing(),
            ClassifiedError::data_connection_failed(),
            ClassifiedError::business_rule_violation("nope"),
            ClassifiedError::resource_exhausted("pool empty"),
            ClassifiedError::circuit_breaker_open(),
        ] {
            assert!(err.category().range().contains(err.code()), "{} out of range", err.code());
            let rebuilt = ClassifiedError::with_status(
                err.category(),
                err.code(),
                err.status(),
                err.message(),
            );
            assert!(rebuilt.is_ok());
        }

        let missing = ClassifiedError::configuration_file_missing();
        assert_eq!(missing.code(), 1001);
        assert_eq!(missing.message(), "Configuration file is missing or invalid");
        assert_eq!(ClassifiedError::data_connection_failed().status().as_u16(), 503);
    }

    #[test]
    fn test_cause_is_exposed_as_source() {
        let err = ClassifiedError::data_connection_failed()
            .with_cause(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"));

        assert_eq!(err.cause().map(ToString::to_string).as_deref(), Some("connection refused"));
        assert_eq!(
            StdError::source(&err).map(ToString::to_string).as_deref(),
            Some("connection refused")
        );
    }

    #[test]
    fn test_resilience_eligibility_and_severity() {
        let system = ClassifiedError::resource_exhausted("pool empty");
        assert!(system.is_retryable());
        assert_eq!(system.severity(), ErrorSeverity::Error);

        let breaker = ClassifiedError::circuit_breaker_open();
        assert!(!breaker.is_retryable(), "breaker errors must not re-enter resilience");
        assert_eq!(breaker.severity(), ErrorSeverity::Critical);

        assert!(!ClassifiedError::configuration_file_missing().is_retryable());
        assert_eq!(
            ClassifiedError::business_rule_violation("nope").severity(),
            ErrorSeverity::Warning
        );
    }

    /// Code 4500 raised by a handler is a plain system failure.
    #[test]
    fn test_handler_raised_breaker_code_is_not_a_rejection() {
        let raised =
            ClassifiedError::system(4500, "handler-defined system code").expect("in range");
        assert_eq!(raised.code(), 4500);
        assert!(!raised.is_circuit_breaker());
        assert!(raised.is_retryable());
        assert_eq!(raised.severity(), ErrorSeverity::Error);

        let rejection = ClassifiedError::circuit_breaker_open();
        assert_eq!(rejection.code(), raised.code());
        assert!(rejection.is_circuit_breaker());
        assert!(!rejection.is_retryable());
        assert!(rejection.clone().is_circuit_breaker(), "origin survives clone");
    }
}
