//! Shared test helpers for `faultline-core` integration tests.
//!
//! Lightweight port implementations so the dispatch tests can focus on
//! behaviour instead of wiring.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use faultline_common::resilience::{
    BackoffStrategy, CircuitBreakerConfig, ResiliencePipeline, RetryConfig,
};
use faultline_common::MockClock;
use faultline_core::{DispatchCoordinator, ErrorMetricsPort, ResponseBuilder, RetryProbe};
use faultline_domain::{ClassifiedError, ErrorCategory, FaultlineError, ResponseConfig, Result};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Metrics port that keeps every call for inspection
#[derive(Default)]
pub struct RecordingMetrics {
    pub recorded: Mutex<Vec<(ErrorCategory, i32, String)>>,
}

impl RecordingMetrics {
    pub fn codes(&self) -> Vec<i32> {
        self.recorded.lock().iter().map(|(_, code, _)| *code).collect()
    }
}

#[async_trait]
impl ErrorMetricsPort for RecordingMetrics {
    async fn record_error(
        &self,
        category: ErrorCategory,
        code: i32,
        correlation_id: &str,
    ) -> Result<()> {
        self.recorded.lock().push((category, code, correlation_id.to_string()));
        Ok(())
    }
}

/// Metrics port that always fails
pub struct FailingMetrics;

#[async_trait]
impl ErrorMetricsPort for FailingMetrics {
    async fn record_error(&self, _: ErrorCategory, _: i32, _: &str) -> Result<()> {
        Err(FaultlineError::Metrics("metrics backend unavailable".into()))
    }
}

/// Probe that fails a fixed number of times, then succeeds
pub struct FlakyProbe {
    pub failures_before_success: u32,
    pub attempts: AtomicU32,
}

impl FlakyProbe {
    pub fn new(failures_before_success: u32) -> Self {
        Self { failures_before_success, attempts: AtomicU32::new(0) }
    }
}

#[async_trait]
impl RetryProbe for FlakyProbe {
    async fn attempt(
        &self,
        failure: &ClassifiedError,
        _cancel: CancellationToken,
    ) -> std::result::Result<(), ClassifiedError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures_before_success {
            Err(failure.clone())
        } else {
            Ok(())
        }
    }
}

/// Probe that never answers until cancelled
pub struct HangingProbe;

#[async_trait]
impl RetryProbe for HangingProbe {
    async fn attempt(
        &self,
        failure: &ClassifiedError,
        cancel: CancellationToken,
    ) -> std::result::Result<(), ClassifiedError> {
        cancel.cancelled().await;
        Err(failure.clone())
    }
}

/// Coordinator with fast retries and a mock clock for the breaker
pub fn coordinator(
    clock: MockClock,
    metrics: Arc<dyn ErrorMetricsPort>,
    failure_threshold: u32,
) -> DispatchCoordinator<MockClock> {
    let retry = RetryConfig {
        max_retries: 5,
        backoff: BackoffStrategy::doubling(Duration::from_millis(1), Duration::from_millis(10)),
    };
    let breaker = CircuitBreakerConfig {
        failure_threshold,
        break_duration: Duration::from_millis(500),
    };
    let pipeline = ResiliencePipeline::with_clock(retry, breaker, clock).expect("valid pipeline");
    let builder = ResponseBuilder::new(&ResponseConfig {
        documentation_base_url: "https://docs.example.test/errors".to_string(),
        include_diagnostics: false,
    });
    DispatchCoordinator::new(Arc::new(pipeline), builder, metrics)
}
