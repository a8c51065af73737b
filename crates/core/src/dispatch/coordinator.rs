//! Dispatch coordinator
//!
//! Per request: capture the context once, run the downstream handler, and on
//! failure decide what the caller sees. System failures go through the
//! resilience pipeline with a diagnostic probe; every other failure goes
//! straight to the response builder. Metrics are recorded once, after the
//! reported error is final.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use faultline_common::resilience::policies::AlwaysRetry;
use faultline_common::resilience::{
    BackoffStrategy, CircuitBreakerConfig, CircuitState, ResilienceError, ResiliencePipeline,
    RetryConfig,
};
use faultline_common::{Clock, ErrorClassification, ErrorSeverity, SystemClock};
use faultline_domain::{
    ClassifiedError, Config, ErrorResponse, Failure, FaultlineError, RequestContext,
    RequestDescriptor, ResilienceConfig, Result, UnexpectedFailure,
};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use super::ports::{ReplayProbe, RetryProbe};
use crate::error_metrics_ports::ErrorMetricsPort;
use crate::response::ResponseBuilder;

/// Result of dispatching one request
#[derive(Debug)]
pub struct Dispatched<T> {
    pub context: Arc<RequestContext>,
    pub outcome: DispatchOutcome<T>,
}

/// Terminal state of a dispatched request
#[derive(Debug)]
pub enum DispatchOutcome<T> {
    Completed(T),
    Failed(Box<ErrorResponse>),
}

/// Orchestrates failure handling for every request
pub struct DispatchCoordinator<C: Clock = SystemClock> {
    pipeline: Arc<ResiliencePipeline<AlwaysRetry, C>>,
    builder: ResponseBuilder,
    metrics: Arc<dyn ErrorMetricsPort>,
    probe: Arc<dyn RetryProbe>,
    allowed_headers: Vec<String>,
    shutdown: CancellationToken,
}

impl DispatchCoordinator<SystemClock> {
    /// Build a coordinator from application configuration
    pub fn from_config(config: &Config, metrics: Arc<dyn ErrorMetricsPort>) -> Result<Self> {
        let (retry, breaker) = resilience_policies(&config.resilience);
        let pipeline = ResiliencePipeline::new(retry, breaker)
            .map_err(|e| FaultlineError::Config(e.to_string()))?;

        Ok(Self::new(Arc::new(pipeline), ResponseBuilder::new(&config.responses), metrics)
            .with_allowed_headers(config.server.allowed_headers.clone()))
    }
}

impl<C: Clock> DispatchCoordinator<C> {
    pub fn new(
        pipeline: Arc<ResiliencePipeline<AlwaysRetry, C>>,
        builder: ResponseBuilder,
        metrics: Arc<dyn ErrorMetricsPort>,
    ) -> Self {
        Self {
            pipeline,
            builder,
            metrics,
            probe: Arc::new(ReplayProbe),
            allowed_headers: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the diagnostic retry probe
    pub fn with_probe(mut self, probe: Arc<dyn RetryProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Headers captured into each request context
    pub fn with_allowed_headers(mut self, allowed_headers: Vec<String>) -> Self {
        self.allowed_headers = allowed_headers;
        self
    }

    /// Token whose cancellation aborts pending retries
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn breaker_state(&self) -> CircuitState {
        self.pipeline.state()
    }

    pub fn pipeline(&self) -> &ResiliencePipeline<AlwaysRetry, C> {
        &self.pipeline
    }

    /// Snapshot the request
    pub fn capture(&self, descriptor: &RequestDescriptor) -> RequestContext {
        RequestContext::capture(descriptor, &self.allowed_headers)
    }

    /// Run `downstream` for one request and turn any failure into a response
    ///
    /// A panic in `downstream` is caught and handled as an unexpected failure.
    pub async fn dispatch<F, Fut, T>(
        &self,
        descriptor: &RequestDescriptor,
        downstream: F,
    ) -> Dispatched<T>
    where
        F: FnOnce(Arc<RequestContext>) -> Fut,
        Fut: Future<Output = std::result::Result<T, Failure>>,
    {
        let context = Arc::new(self.capture(descriptor));
        let span = dispatch_span(&context);

        async move {
            let outcome = AssertUnwindSafe(downstream(Arc::clone(&context))).catch_unwind().await;

            let failure = match outcome {
                Ok(Ok(value)) => {
                    return Dispatched { context, outcome: DispatchOutcome::Completed(value) };
                }
                Ok(Err(failure)) => failure,
                Err(panic) => {
                    error!("Request handler panicked");
                    Failure::Unexpected(UnexpectedFailure::from_panic(panic.as_ref()))
                }
            };

            let response = self.handle_failure(&context, failure).await;
            Dispatched { context, outcome: DispatchOutcome::Failed(Box::new(response)) }
        }
        .instrument(span)
        .await
    }

    /// Decide the reported error, build its response and record metrics
    pub async fn handle_failure(
        &self,
        context: &RequestContext,
        failure: Failure,
    ) -> ErrorResponse {
        let reported = match failure {
            Failure::Classified(err) if err.is_retryable() => {
                Failure::Classified(self.run_resilience(err).await)
            }
            other => other,
        };

        log_failure(&reported);
        let response = self.builder.build(&reported, context);

        if let Err(e) = self
            .metrics
            .record_error(reported.category(), reported.code(), &context.correlation_id)
            .await
        {
            warn!(error = %e, code = reported.code(), "Failed to record error metrics");
        }

        response
    }

    /// Route a system failure through retry and the breaker
    ///
    /// Only a breaker rejection replaces the original error.
    async fn run_resilience(&self, original: ClassifiedError) -> ClassifiedError {
        let cancel = self.shutdown.child_token();
        let probe = Arc::clone(&self.probe);
        let failing = original.clone();

        let outcome = self
            .pipeline
            .execute(
                |token| {
                    let probe = Arc::clone(&probe);
                    let failing = failing.clone();
                    async move { probe.attempt(&failing, token).await }
                },
                &cancel,
            )
            .await;

        match outcome {
            Ok(()) => {
                info!(
                    code = original.code(),
                    "Diagnostic retry recovered, reporting original failure"
                );
                original
            }
            Err(ResilienceError::OperationFailed { attempts, .. }) => {
                debug!(
                    attempts,
                    code = original.code(),
                    "Retries exhausted, reporting original failure"
                );
                original
            }
            Err(ResilienceError::Cancelled) => {
                debug!(code = original.code(), "Diagnostic retry cancelled");
                original
            }
            Err(ResilienceError::CircuitOpen { retry_after }) => {
                warn!(
                    code = original.code(),
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Circuit breaker open, superseding original failure"
                );
                ClassifiedError::circuit_breaker_open().with_cause(original)
            }
        }
    }
}

/// Tracing span every dispatch runs in
pub fn dispatch_span(context: &RequestContext) -> Span {
    info_span!(
        "dispatch",
        correlation_id = %context.correlation_id,
        method = %context.http_method,
        path = %context.path,
    )
}

/// Retry and breaker settings for a resilience configuration
pub fn resilience_policies(config: &ResilienceConfig) -> (RetryConfig, CircuitBreakerConfig) {
    let retry = RetryConfig {
        max_retries: config.max_retries,
        backoff: BackoffStrategy::doubling(config.backoff_base, config.max_backoff),
    };
    let breaker = CircuitBreakerConfig {
        failure_threshold: config.failure_threshold,
        break_duration: config.break_duration,
    };
    (retry, breaker)
}

fn log_failure(failure: &Failure) {
    match failure {
        Failure::Classified(err) => match err.severity() {
            ErrorSeverity::Info => {
                info!(
                    code = err.code(),
                    category = %err.category(),
                    error = %err,
                    "Request failed"
                );
            }
            ErrorSeverity::Warning => {
                warn!(
                    code = err.code(),
                    category = %err.category(),
                    error = %err,
                    "Request failed"
                );
            }
            ErrorSeverity::Error | ErrorSeverity::Critical => {
                error!(
                    code = err.code(),
                    category = %err.category(),
                    error = %err,
                    "Request failed"
                );
            }
        },
        Failure::Unexpected(err) => {
            error!(
                kind = %err.kind,
                error = %err.message,
                "Request failed with an unexpected error"
            );
        }
    }
}
