//! End-to-end tests for the HTTP surface
//!
//! Drives the full router (middleware, coordinator, metrics) with
//! `tower::ServiceExt::oneshot`; no socket is bound.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use faultline_api::{router, AppContext};
use faultline_domain::constants::UNEXPECTED_ERROR_MESSAGE;
use faultline_domain::{Config, ResilienceConfig};
use serde_json::Value;
use tower::ServiceExt;

fn test_config(enable_fault_routes: bool) -> Config {
    let mut config = Config::default();
    config.server.enable_fault_routes = enable_fault_routes;
    config.responses.include_diagnostics = false;
    config.resilience = ResilienceConfig {
        max_retries: 2,
        backoff_base: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        failure_threshold: 5,
        break_duration: Duration::from_secs(30),
    };
    config
}

async fn app(enable_fault_routes: bool) -> (Arc<AppContext>, Router) {
    let ctx = Arc::new(AppContext::new(test_config(enable_fault_routes)).await.expect("context"));
    let app = router(Arc::clone(&ctx));
    (ctx, app)
}

/// Send a GET and return status, correlation header and JSON body
async fn get(app: &Router, uri: &str, correlation_id: Option<&str>) -> (StatusCode, String, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(id) = correlation_id {
        builder = builder.header("X-Correlation-ID", id);
    }
    let request = builder.body(Body::empty()).expect("request");

    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let header = response
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .unwrap_or_default();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };

    (status, header, body)
}

#[tokio::test]
async fn test_configuration_failure() {
    let (_ctx, app) = app(true).await;

    let (status, header, body) = get(&app, "/faults/configuration", Some("cfg-1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(header, "cfg-1");
    assert_eq!(body["correlationId"], "cfg-1");
    assert_eq!(body["errorCode"], 1001);
    assert_eq!(body["errorCategory"], "Configuration Error");
    assert_eq!(body["httpStatusCode"], 400);
    assert_eq!(body["message"], "Configuration file is missing or invalid");
    assert_eq!(body["requestContext"]["path"], "/faults/configuration");
    assert!(body["documentationUrl"].as_str().is_some_and(|url| url.ends_with("/1001")));
}

#[tokio::test]
async fn test_data_failure_is_not_retried() {
    let (ctx, app) = app(true).await;

    let (status, _, body) = get(&app, "/faults/data", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["errorCode"], 2001);
    assert_eq!(body["errorCategory"], "Data Issue");
    assert_eq!(
        body["detailedMessage"],
        "Unable to connect to the data store Inner exception: connection refused (Error Code: 2001)"
    );
    // Data failures never touch the breaker
    assert_eq!(ctx.coordinator.pipeline().breaker().metrics().total_calls, 0);
}

#[tokio::test]
async fn test_unexpected_failure_is_generic() {
    let (_ctx, app) = app(true).await;

    let (status, _, body) = get(&app, "/faults/unexpected", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errorCode"], 4000);
    assert_eq!(body["errorCategory"], "System Issue");
    assert_eq!(body["message"], UNEXPECTED_ERROR_MESSAGE);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_handler_panic_becomes_response() {
    let (_ctx, app) = app(true).await;

    let (status, header, body) = get(&app, "/faults/panic", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errorCode"], 4000);
    assert!(!header.is_empty());
    assert_eq!(body["correlationId"], header.as_str());
}

/// Six consecutive system failures: the sixth reports the open breaker.
///
/// # Test Steps
/// 1. Five system failures, each exhausting its retries, report 4001
/// 2. The sixth request is rejected by the open breaker and reports 4500
/// 3. Health and metrics endpoints reflect both
#[tokio::test]
async fn test_sustained_system_failure_opens_breaker() {
    let (_ctx, app) = app(true).await;

    for _ in 0..5 {
        let (status, _, body) = get(&app, "/faults/system", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["errorCode"], 4001);
    }

    let (status, _, body) = get(&app, "/faults/system", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["errorCode"], 4500);
    assert_eq!(body["errorCategory"], "System Issue");
    assert!(body["detailedMessage"]
        .as_str()
        .is_some_and(|msg| msg.contains("Inner exception: Worker pool exhausted")));

    let (status, _, health) = get(&app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["circuitState"], "OPEN");
    assert_eq!(health["rejectedCalls"], 1);
    assert_eq!(health["metricsPrunerRunning"], true);

    let (_, _, metrics) = get(&app, "/metrics/errors", None).await;
    assert_eq!(metrics["labels"]["total"]["count"], 6);
    assert_eq!(metrics["labels"]["code:4001"]["count"], 5);
    assert_eq!(metrics["labels"]["code:4500"]["count"], 1);
    assert_eq!(metrics["labels"]["category:system"]["inWindow"], 6);
}

#[tokio::test]
async fn test_success_echoes_generated_correlation_id() {
    let (_ctx, app) = app(true).await;

    let (status, header, body) = get(&app, "/faults/ok", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(!header.is_empty());
    assert_eq!(body["correlationId"], header.as_str());
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_fault_routes_can_be_disabled() {
    let (_ctx, app) = app(false).await;

    let (status, header, _) = get(&app, "/faults/configuration", Some("off-1")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(header, "off-1");
}

/// Same failure and correlation id give the same body apart from time fields.
#[tokio::test]
async fn test_error_response_is_repeatable() {
    let (_ctx, app) = app(true).await;

    let strip = |mut body: Value| {
        if let Some(obj) = body.as_object_mut() {
            obj.remove("timestamp");
        }
        if let Some(ctx) = body["requestContext"].as_object_mut() {
            ctx.remove("requestTime");
        }
        body
    };

    let (_, _, first) = get(&app, "/faults/logical", Some("same-id")).await;
    let (_, _, second) = get(&app, "/faults/logical", Some("same-id")).await;

    assert_eq!(first["errorCode"], 3001);
    assert_eq!(first["httpStatusCode"], 400);
    assert_eq!(strip(first), strip(second));
}

#[tokio::test]
async fn test_shutdown_stops_pruner() {
    let (ctx, _app) = app(true).await;
    assert!(ctx.pruner_running().await);

    ctx.shutdown().await.expect("shutdown");
    assert!(!ctx.pruner_running().await);
    assert!(ctx.shutdown_token().is_cancelled());

    // Second call is a no-op
    ctx.shutdown().await.expect("second shutdown");
}
