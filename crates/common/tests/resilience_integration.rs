//! Integration tests for resilience module
//!
//! Drives the retry executor, circuit breaker and composed pipeline through
//! outage and recovery scenarios using the public API only.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use faultline_common::resilience::{
    policies, CircuitBreaker, CircuitBreakerConfig, CircuitState, ResilienceError,
    ResiliencePipeline, RetryConfig, RetryError, RetryExecutor,
};
use faultline_common::time::MockClock;
use tokio_util::sync::CancellationToken;

/// Custom error type for testing
#[derive(Debug, Clone)]
struct TestError {
    message: String,
    retryable: bool,
}

impl TestError {
    fn transient() -> Self {
        Self { message: "dependency unavailable".to_string(), retryable: true }
    }

    fn permanent() -> Self {
        Self { message: "invalid request".to_string(), retryable: false }
    }
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TestError {}

/// Validates retry recovery with exponential backoff.
///
/// # Test Steps
/// 1. Configure 5 retries doubling from 5ms
/// 2. Fail the first 3 attempts, succeed on the 4th
/// 3. Verify exactly 4 attempts and that the waits (10+20+40ms) elapsed
#[tokio::test(flavor = "multi_thread")]
async fn test_retry_exponential_backoff_success() {
    let attempt_count = Arc::new(AtomicU32::new(0));
    let config = RetryConfig::builder()
        .max_retries(5)
        .exponential_backoff(Duration::from_millis(5), 2.0, Duration::from_millis(100))
        .build()
        .expect("Failed to build config");
    let executor = RetryExecutor::always(config);
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let result = executor
        .execute(
            |_| {
                let attempt_count = Arc::clone(&attempt_count);
                async move {
                    let attempt = attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt <= 3 {
                        Err(TestError::transient())
                    } else {
                        Ok("recovered")
                    }
                }
            },
            &cancel,
        )
        .await;

    assert_eq!(result.expect("retry should recover"), "recovered");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 4);
    assert!(started.elapsed() >= Duration::from_millis(70));
}

/// Validates that a predicate policy short-circuits permanent errors.
#[tokio::test(flavor = "multi_thread")]
async fn test_retry_predicate_policy() {
    let attempt_count = Arc::new(AtomicU32::new(0));
    let policy = policies::PredicateRetry::new(|error: &TestError, _| error.retryable);
    let config = RetryConfig::builder()
        .max_retries(5)
        .fixed_backoff(Duration::from_millis(1))
        .build()
        .expect("Failed to build config");
    let executor = RetryExecutor::new(config, policy);
    let cancel = CancellationToken::new();

    let result: Result<(), _> = executor
        .execute(
            |_| {
                let attempt_count = Arc::clone(&attempt_count);
                async move {
                    attempt_count.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::permanent())
                }
            },
            &cancel,
        )
        .await;

    match result {
        Err(RetryError::NonRetryable { attempts, source }) => {
            assert_eq!(attempts, 1);
            assert!(!source.retryable);
        }
        other => panic!("expected non-retryable error, got {other:?}"),
    }
    assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
}

/// Validates the full breaker lifecycle through an outage and recovery.
///
/// # Test Steps
/// 1. Fail 5 consecutive calls so the breaker opens
/// 2. Verify calls are rejected while open
/// 3. Advance the clock past the break duration
/// 4. Verify the trial call closes the breaker
#[tokio::test(flavor = "multi_thread")]
async fn test_circuit_breaker_outage_and_recovery() {
    let clock = MockClock::new();
    let config = CircuitBreakerConfig::builder()
        .failure_threshold(5)
        .break_duration(Duration::from_millis(500))
        .build()
        .expect("Failed to build config");
    let breaker = CircuitBreaker::with_clock(config, clock.clone()).expect("valid breaker");
    let mut transitions = breaker.subscribe();

    for _ in 0..5 {
        let result: Result<(), _> =
            breaker.execute(|| async { Err(TestError::transient()) }).await;
        assert!(result.is_err());
    }
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(*transitions.borrow_and_update(), CircuitState::Open);

    let rejected: Result<(), _> = breaker.execute(|| async { Ok::<_, TestError>(()) }).await;
    assert!(matches!(rejected, Err(ResilienceError::CircuitOpen { .. })));

    clock.advance(Duration::from_millis(500));
    let trial = breaker.execute(|| async { Ok::<_, TestError>("healthy") }).await;
    assert_eq!(trial.expect("trial should run"), "healthy");
    assert_eq!(breaker.state(), CircuitState::Closed);

    let metrics = breaker.metrics();
    assert_eq!(metrics.total_calls, 6);
    assert_eq!(metrics.rejected_calls, 1);
}

/// Validates that concurrent callers racing an open breaker admit a single
/// half-open trial.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_half_open_trial_under_contention() {
    let clock = MockClock::new();
    let config = CircuitBreakerConfig::builder()
        .failure_threshold(1)
        .break_duration(Duration::from_millis(100))
        .build()
        .expect("Failed to build config");
    let breaker = CircuitBreaker::with_clock(config, clock.clone()).expect("valid breaker");

    let _: Result<(), _> = breaker.execute(|| async { Err(TestError::transient()) }).await;
    clock.advance(Duration::from_millis(100));

    let admitted = Arc::new(AtomicU32::new(0));
    let release = CancellationToken::new();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let breaker = breaker.clone();
        let admitted = Arc::clone(&admitted);
        let release = release.clone();
        handles.push(tokio::spawn(async move {
            breaker
                .execute(|| async move {
                    admitted.fetch_add(1, Ordering::SeqCst);
                    release.cancelled().await;
                    Ok::<_, TestError>(())
                })
                .await
        }));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    release.cancel();

    let mut rejected = 0;
    for handle in handles {
        if let Err(ResilienceError::CircuitOpen { .. }) = handle.await.expect("task completed") {
            rejected += 1;
        }
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 1);
    assert_eq!(rejected, 15);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Validates the composed pipeline during a sustained outage: retries run
/// inside the breaker and rejected calls never reach the operation.
#[tokio::test(flavor = "multi_thread")]
async fn test_pipeline_sustained_outage() {
    let retry = RetryConfig::builder()
        .max_retries(2)
        .fixed_backoff(Duration::from_millis(1))
        .build()
        .expect("Failed to build retry config");
    let breaker = CircuitBreakerConfig::builder()
        .failure_threshold(3)
        .break_duration(Duration::from_secs(60))
        .build()
        .expect("Failed to build breaker config");
    let pipeline = ResiliencePipeline::new(retry, breaker).expect("valid pipeline");
    let cancel = CancellationToken::new();
    let calls = Arc::new(AtomicU32::new(0));

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        let result: Result<(), _> = pipeline
            .execute(
                |_| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(TestError::transient())
                    }
                },
                &cancel,
            )
            .await;
        outcomes.push(result);
    }

    let failed = outcomes
        .iter()
        .filter(|r| matches!(r, Err(ResilienceError::OperationFailed { attempts: 3, .. })))
        .count();
    let rejected =
        outcomes.iter().filter(|r| matches!(r, Err(ResilienceError::CircuitOpen { .. }))).count();

    assert_eq!(failed, 3);
    assert_eq!(rejected, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 9);
    assert_eq!(pipeline.state(), CircuitState::Open);
}
