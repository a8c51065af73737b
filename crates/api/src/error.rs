//! Handler error type
//!
//! Handlers return `Result<_, ApiError>`. The error never reaches the wire
//! as-is: its response carries the [`Failure`] in an extension and the
//! error-handling middleware replaces it with the built error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use faultline_domain::{ClassifiedError, Failure, UnexpectedFailure};

/// Failure raised by a request handler
#[derive(Debug, Clone)]
pub struct ApiError(pub Failure);

impl ApiError {
    pub fn failure(&self) -> &Failure {
        &self.0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self.0);
        response
    }
}

impl From<Failure> for ApiError {
    fn from(failure: Failure) -> Self {
        Self(failure)
    }
}

impl From<ClassifiedError> for ApiError {
    fn from(err: ClassifiedError) -> Self {
        Self(Failure::Classified(err))
    }
}

impl From<UnexpectedFailure> for ApiError {
    fn from(err: UnexpectedFailure) -> Self {
        Self(Failure::Unexpected(err))
    }
}

/// Classified errors wrapped in `anyhow` keep their classification
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(Failure::from(err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
