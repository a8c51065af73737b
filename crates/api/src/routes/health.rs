//! Health and metrics endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use faultline_common::CircuitState;
use faultline_infra::ErrorMetricsSnapshot;
use serde::Serialize;

use crate::context::AppContext;

/// Service health plus circuit breaker state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// `ok` while the breaker is closed, `degraded` otherwise
    pub status: &'static str,
    pub circuit_state: String,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub rejected_calls: u64,
    pub metrics_pruner_running: bool,
}

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<HealthReport> {
    let breaker = ctx.coordinator.pipeline().breaker().metrics();

    Json(HealthReport {
        status: if breaker.state == CircuitState::Closed { "ok" } else { "degraded" },
        circuit_state: breaker.state.to_string(),
        consecutive_failures: breaker.consecutive_failures,
        total_calls: breaker.total_calls,
        rejected_calls: breaker.rejected_calls,
        metrics_pruner_running: ctx.pruner_running().await,
    })
}

pub async fn error_metrics(State(ctx): State<Arc<AppContext>>) -> Json<ErrorMetricsSnapshot> {
    Json(ctx.metrics.snapshot())
}
