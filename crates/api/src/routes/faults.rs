//! Fault-injection routes
//!
//! One route per failure kind, for exercising the error pipeline from the
//! outside. Mounted under `/faults` only when enabled in configuration.

use std::sync::Arc;

use axum::extract::Extension;
use axum::routing::get;
use axum::{Json, Router};
use faultline_domain::{ClassifiedError, RequestContext};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::error::ApiResult;

pub fn routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/configuration", get(configuration))
        .route("/data", get(data))
        .route("/logical", get(logical))
        .route("/system", get(system))
        .route("/unexpected", get(unexpected))
        .route("/panic", get(panics))
        .route("/ok", get(ok))
}

async fn configuration() -> ApiResult<Json<Value>> {
    Err(ClassifiedError::configuration_file_missing().into())
}

async fn data() -> ApiResult<Json<Value>> {
    let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
    Err(ClassifiedError::data_connection_failed().with_cause(refused).into())
}

async fn logical() -> ApiResult<Json<Value>> {
    Err(ClassifiedError::business_rule_violation("Order total exceeds the approved credit limit")
        .into())
}

async fn system() -> ApiResult<Json<Value>> {
    Err(ClassifiedError::resource_exhausted("Worker pool exhausted").into())
}

/// Failure outside the taxonomy, bubbled through `anyhow`
async fn unexpected() -> ApiResult<Json<Value>> {
    let parsed: u16 = "seventy".parse().map_err(anyhow::Error::from)?;
    Ok(Json(json!({ "parsed": parsed })))
}

async fn panics() -> Json<Value> {
    panic!("fault route panicked")
}

async fn ok(Extension(context): Extension<Arc<RequestContext>>) -> Json<Value> {
    Json(json!({ "status": "ok", "correlationId": context.correlation_id }))
}
