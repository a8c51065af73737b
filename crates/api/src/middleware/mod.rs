//! Error-handling middleware
//!
//! Wraps every route: captures the request context, runs the rest of the
//! stack through the dispatch coordinator, and replaces any failure (an
//! [`ApiError`](crate::error::ApiError) or a panic) with a JSON error
//! response. Every response, successful or not, echoes `X-Correlation-ID`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use faultline_core::DispatchOutcome;
use faultline_domain::constants::FORWARDED_FOR_HEADER;
use faultline_domain::{ErrorResponse, Failure, RequestDescriptor};

use crate::context::AppContext;

/// Identity of the caller, inserted by an authentication layer when present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// `axum::middleware::from_fn_with_state` entry point
pub async fn handle_errors(
    State(ctx): State<Arc<AppContext>>,
    request: Request,
    next: Next,
) -> Response {
    let descriptor = describe(&request);

    let dispatched = ctx
        .coordinator
        .dispatch(&descriptor, |context| async move {
            let mut request = request;
            request.extensions_mut().insert(context);

            let mut response = next.run(request).await;
            match response.extensions_mut().remove::<Failure>() {
                Some(failure) => Err(failure),
                None => Ok(response),
            }
        })
        .await;

    let mut response = match dispatched.outcome {
        DispatchOutcome::Completed(response) => response,
        DispatchOutcome::Failed(error) => render(*error),
    };

    match HeaderValue::from_str(&dispatched.context.correlation_id) {
        Ok(value) => {
            response.headers_mut().insert(HeaderName::from_static("x-correlation-id"), value);
        }
        Err(err) => tracing::warn!(error = %err, "Correlation id is not a valid header value"),
    }

    response
}

/// Serialize the error response with its own status code
pub fn render(error: ErrorResponse) -> Response {
    let status =
        StatusCode::from_u16(error.http_status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error)).into_response()
}

/// Transport-neutral view of the inbound request
fn describe(request: &Request) -> RequestDescriptor {
    let uri = request.uri();
    let mut descriptor = RequestDescriptor::new(request.method().as_str(), uri.path());

    if let Some(query) = uri.query() {
        descriptor = descriptor.with_query(query);
    }
    if let Some(ip) = client_ip(request) {
        descriptor = descriptor.with_client_ip(ip);
    }
    if let Some(AuthenticatedUser(user)) = request.extensions().get::<AuthenticatedUser>() {
        descriptor = descriptor.with_user(user.clone());
    }

    header_pairs(request.headers())
        .fold(descriptor, |descriptor, (name, value)| descriptor.with_header(name, value))
}

/// First `X-Forwarded-For` hop, else the socket peer
fn client_ip(request: &Request) -> Option<String> {
    let forwarded = request
        .headers()
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(ToString::to_string);

    forwarded.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    })
}

/// Headers with visible-ASCII values
fn header_pairs(headers: &HeaderMap) -> impl Iterator<Item = (String, String)> + '_ {
    headers.iter().filter_map(|(name, value)| {
        value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
    })
}
