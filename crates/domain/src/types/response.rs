//! JSON error response contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::RequestContext;

/// Body written for every failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub correlation_id: String,
    pub error_code: i32,
    pub error_category: String,
    pub http_status_code: u16,
    pub message: String,
    pub detailed_message: String,
    pub timestamp: DateTime<Utc>,
    pub request_context: RequestContext,
    pub documentation_url: String,
    pub suggestions: Vec<String>,
    /// Diagnostics, present only when detailed diagnostics are enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
