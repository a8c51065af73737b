//! Error taxonomy
//!
//! Four disjoint failure categories, each owning a numeric code sub-range and
//! a default transport status. Ranges live in one table so that classifying a
//! code and validating a constructor read the same data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label returned for codes outside every category range
pub const UNKNOWN_CATEGORY_LABEL: &str = "Unknown";

/// Inclusive numeric code range owned by a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    pub min: i32,
    pub max: i32,
}

impl CodeRange {
    pub const fn contains(&self, code: i32) -> bool {
        code >= self.min && code <= self.max
    }
}

impl fmt::Display for CodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Operator or user misconfiguration
    Configuration,
    /// Persistence or connectivity problem
    Data,
    /// Caller or business-rule violation
    Logical,
    /// Infrastructure or resource problem; the only retryable category
    System,
}

const CATEGORY_RANGES: [(ErrorCategory, CodeRange); 4] = [
    (ErrorCategory::Configuration, CodeRange { min: 1000, max: 1999 }),
    (ErrorCategory::Data, CodeRange { min: 2000, max: 2999 }),
    (ErrorCategory::Logical, CodeRange { min: 3000, max: 3999 }),
    (ErrorCategory::System, CodeRange { min: 4000, max: 4999 }),
];

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 4] =
        [Self::Configuration, Self::Data, Self::Logical, Self::System];

    /// Category whose range contains `code`
    pub fn from_code(code: i32) -> Option<Self> {
        CATEGORY_RANGES
            .iter()
            .find(|(_, range)| range.contains(code))
            .map(|(category, _)| *category)
    }

    pub const fn range(self) -> CodeRange {
        // Table rows follow declaration order.
        CATEGORY_RANGES[self as usize].1
    }

    /// Human-readable label used in responses
    pub fn label(self) -> &'static str {
        match self {
            Self::Configuration => "Configuration Error",
            Self::Data => "Data Issue",
            Self::Logical => "Logical Error",
            Self::System => "System Issue",
        }
    }

    /// Short name used in metric labels (`category:<name>`)
    pub fn name(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Data => "data",
            Self::Logical => "logical",
            Self::System => "system",
        }
    }

    /// Default transport status for errors of this category
    pub fn default_status(self) -> TransportStatus {
        match self {
            Self::Configuration | Self::Logical => TransportStatus::BadRequest,
            Self::Data => TransportStatus::ServiceUnavailable,
            Self::System => TransportStatus::InternalServerError,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::System)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category label for a code, or `"Unknown"` when no range contains it
pub fn category_label(code: i32) -> &'static str {
    ErrorCategory::from_code(code).map_or(UNKNOWN_CATEGORY_LABEL, ErrorCategory::label)
}

/// URL path segment for a category label: lowercased, spaces to hyphens
pub fn category_slug(label: &str) -> String {
    label.to_lowercase().replace(' ', "-")
}

/// Transport status carried by a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum TransportStatus {
    BadRequest,
    InternalServerError,
    ServiceUnavailable,
}

impl TransportStatus {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::InternalServerError => 500,
            Self::ServiceUnavailable => 503,
        }
    }
}

impl From<TransportStatus> for u16 {
    fn from(status: TransportStatus) -> Self {
        status.as_u16()
    }
}

impl TryFrom<u16> for TransportStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            400 => Ok(Self::BadRequest),
            500 => Ok(Self::InternalServerError),
            503 => Ok(Self::ServiceUnavailable),
            other => Err(format!("unsupported transport status {other}")),
        }
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
