//! Error response construction

use chrono::{DateTime, Utc};
use faultline_domain::constants::UNEXPECTED_ERROR_MESSAGE;
use faultline_domain::taxonomy::category_slug;
use faultline_domain::{
    category_label, ClassifiedError, ErrorCategory, ErrorResponse, Failure, RequestContext,
    ResponseConfig, UnexpectedFailure,
};
use serde_json::json;

use super::suggestions::SuggestionCatalog;

/// Maps a failure and its request context onto the wire error format
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    documentation_base_url: String,
    include_diagnostics: bool,
    suggestions: SuggestionCatalog,
}

impl ResponseBuilder {
    pub fn new(config: &ResponseConfig) -> Self {
        Self {
            documentation_base_url: config.documentation_base_url.trim_end_matches('/').to_string(),
            include_diagnostics: config.include_diagnostics,
            suggestions: SuggestionCatalog::default(),
        }
    }

    /// Build the response, stamped with the current time
    pub fn build(&self, failure: &Failure, context: &RequestContext) -> ErrorResponse {
        self.build_at(failure, context, Utc::now())
    }

    /// Build the response with an explicit timestamp
    ///
    /// Deterministic: the same inputs always produce the same response.
    pub fn build_at(
        &self,
        failure: &Failure,
        context: &RequestContext,
        timestamp: DateTime<Utc>,
    ) -> ErrorResponse {
        let code = failure.code();
        let (status, message, detailed_message, details) = match failure {
            Failure::Classified(err) => (
                err.status().as_u16(),
                err.message().to_string(),
                detailed_message(err),
                self.include_diagnostics.then(|| classified_details(err)),
            ),
            Failure::Unexpected(err) => (
                ErrorCategory::System.default_status().as_u16(),
                UNEXPECTED_ERROR_MESSAGE.to_string(),
                UNEXPECTED_ERROR_MESSAGE.to_string(),
                self.include_diagnostics.then(|| unexpected_details(err)),
            ),
        };

        ErrorResponse {
            correlation_id: context.correlation_id.clone(),
            error_code: code,
            error_category: category_label(code).to_string(),
            http_status_code: status,
            message,
            detailed_message,
            timestamp,
            request_context: context.clone(),
            documentation_url: self.documentation_url(code),
            suggestions: self.suggestions.suggestions_for(code),
            details,
        }
    }

    /// `<base>/<category-slug>/<code>`
    pub fn documentation_url(&self, code: i32) -> String {
        format!("{}/{}/{}", self.documentation_base_url, category_slug(category_label(code)), code)
    }
}

/// Message, then the cause's message, then the code annotation
fn detailed_message(err: &ClassifiedError) -> String {
    let mut detailed = err.message().to_string();
    if let Some(cause) = err.cause() {
        detailed.push_str(&format!(" Inner exception: {cause}"));
    }
    detailed.push_str(&format!(" (Error Code: {})", err.code()));
    detailed
}

fn classified_details(err: &ClassifiedError) -> serde_json::Value {
    json!({
        "errorType": "ClassifiedError",
        "category": err.category().name(),
        "cause": err.cause().map(ToString::to_string),
    })
}

fn unexpected_details(err: &UnexpectedFailure) -> serde_json::Value {
    json!({
        "errorType": err.kind,
        "message": err.message,
        "sourceChain": err.chain,
        "stackTrace": err.backtrace,
    })
}
