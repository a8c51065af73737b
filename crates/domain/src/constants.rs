//! Domain constants
//!
//! Well-known error codes and the fixed strings that appear on the wire.

// Well-known error codes
pub const CODE_CONFIGURATION_FILE_MISSING: i32 = 1001;
pub const CODE_DATA_CONNECTION_FAILED: i32 = 2001;
pub const CODE_BUSINESS_RULE_VIOLATION: i32 = 3001;
pub const CODE_UNEXPECTED: i32 = 4000;
pub const CODE_RESOURCE_EXHAUSTED: i32 = 4001;
pub const CODE_CIRCUIT_BREAKER_OPEN: i32 = 4500;

// Messages
pub const CONFIGURATION_FILE_MISSING_MESSAGE: &str = "Configuration file is missing or invalid";
pub const DATA_CONNECTION_FAILED_MESSAGE: &str = "Unable to connect to the data store";
pub const CIRCUIT_BREAKER_OPEN_MESSAGE: &str =
    "Service temporarily unavailable: too many consecutive system failures";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

// Headers
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";
pub const USER_AGENT_HEADER: &str = "User-Agent";
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

// Metrics defaults
pub const DEFAULT_METRICS_MAX_LABELS: usize = 4096;

// Response defaults
pub const DEFAULT_DOCUMENTATION_BASE_URL: &str = "https://docs.faultline.dev/errors";

// Request context capture
pub const MAX_CAPTURED_HEADERS: usize = 16;
pub const MAX_CAPTURED_HEADER_LEN: usize = 256;
