//! Circuit breaker
//!
//! The breaker stops calling a failing operation after a threshold of
//! consecutive failures, waits out a fixed break duration, then lets a single
//! trial call decide whether to close again.
//!
//! All state lives behind one lock so transitions are linearizable: two
//! callers can never both observe `Closed` and independently trip the
//! breaker. The lock is never held across an `.await`; callers take a
//! [`BreakerPermit`] before running the operation and settle it afterwards.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
use crate::time::{Clock, SystemClock};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests until the break duration elapses
    Open,
    /// Circuit is half-open, allowing a single trial request
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time to stay open before admitting a half-open trial
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, break_duration: Duration::from_secs(30) }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".to_string(),
            });
        }

        if self.break_duration.is_zero() {
            return Err(ConfigError::Invalid {
                message: "break_duration must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    pub fn break_duration(mut self, duration: Duration) -> Self {
        self.config.break_duration = duration;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Circuit breaker metrics for monitoring
#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub rejected_calls: u64,
    pub opened_at: Option<Instant>,
}

/// Rejection returned when the breaker does not admit a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerRejected {
    /// Time left until a half-open trial will be admitted
    pub retry_after: Duration,
}

impl<E> From<BreakerRejected> for ResilienceError<E> {
    fn from(rejected: BreakerRejected) -> Self {
        ResilienceError::CircuitOpen { retry_after: rejected.retry_after }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Generic circuit breaker implementation
///
/// Cloning is cheap and clones share state, so one breaker can be handed to
/// every request task.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerInner>>,
    total_calls: Arc<AtomicU64>,
    rejected_calls: Arc<AtomicU64>,
    state_tx: Arc<watch::Sender<CircuitState>>,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &inner.state)
            .field("consecutive_failures", &inner.consecutive_failures)
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            total_calls: Arc::clone(&self.total_calls),
            rejected_calls: Arc::clone(&self.rejected_calls),
            state_tx: Arc::clone(&self.state_tx),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker using the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        let (state_tx, _) = watch::channel(CircuitState::Closed);

        Ok(Self {
            config,
            inner: Arc::new(Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            })),
            total_calls: Arc::new(AtomicU64::new(0)),
            rejected_calls: Arc::new(AtomicU64::new(0)),
            state_tx: Arc::new(state_tx),
            clock: Arc::new(clock),
        })
    }

    /// Breaker configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the current state of the circuit breaker
    ///
    /// An `Open` breaker whose break duration has elapsed still reports
    /// `Open` until the next call promotes it to `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Subscribe to state transitions
    pub fn subscribe(&self) -> watch::Receiver<CircuitState> {
        self.state_tx.subscribe()
    }

    /// Get circuit breaker metrics
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.inner.lock();
        CircuitBreakerMetrics {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            total_calls: self.total_calls.load(Ordering::Acquire),
            rejected_calls: self.rejected_calls.load(Ordering::Acquire),
            opened_at: inner.opened_at,
        }
    }

    /// Ask the breaker to admit one call
    ///
    /// An `Open` breaker whose break duration has elapsed moves to `HalfOpen`
    /// and admits the caller as the single trial. The returned permit must be
    /// settled with [`BreakerPermit::record_success`] or
    /// [`BreakerPermit::record_failure`]; dropping it unsettled releases the
    /// trial slot without counting an outcome.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_, C>, BreakerRejected> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let admitted = match inner.state {
            CircuitState::Closed => Ok(false),
            CircuitState::Open => {
                let opened_at = inner.opened_at.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed >= self.config.break_duration {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.trial_in_flight = true;
                    Ok(true)
                } else {
                    Err(BreakerRejected { retry_after: self.config.break_duration - elapsed })
                }
            }
            CircuitState::HalfOpen if inner.trial_in_flight => {
                Err(BreakerRejected { retry_after: Duration::ZERO })
            }
            CircuitState::HalfOpen => {
                inner.trial_in_flight = true;
                Ok(true)
            }
        };
        drop(inner);

        match admitted {
            Ok(trial) => {
                self.total_calls.fetch_add(1, Ordering::Relaxed);
                Ok(BreakerPermit { breaker: self, trial, settled: false })
            }
            Err(rejected) => {
                self.rejected_calls.fetch_add(1, Ordering::Relaxed);
                debug!(
                    retry_after_ms = rejected.retry_after.as_millis() as u64,
                    "Circuit breaker rejecting call"
                );
                Err(rejected)
            }
        }
    }

    /// Execute an operation with circuit breaker protection
    ///
    /// Every `Err` from the operation counts as one failure.
    #[instrument(skip(self, operation), fields(state = %self.state()))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire()?;

        match operation().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(source) => {
                permit.record_failure();
                Err(ResilienceError::OperationFailed { attempts: 1, source })
            }
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
        self.transition(&mut inner, CircuitState::Closed);
        info!("Circuit breaker manually reset to closed state");
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen if trial => {
                inner.consecutive_failures = 0;
                inner.trial_in_flight = false;
                inner.opened_at = None;
                self.transition(&mut inner, CircuitState::Closed);
            }
            // A call admitted before the breaker tripped finished late; only
            // the trial decides the half-open outcome.
            CircuitState::HalfOpen | CircuitState::Open => {
                debug!(state = %inner.state, "Ignoring success from a call admitted earlier");
            }
        }
    }

    fn on_failure(&self, trial: bool) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.opened_at = Some(now);
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen if trial => {
                inner.trial_in_flight = false;
                inner.opened_at = Some(now);
                self.transition(&mut inner, CircuitState::Open);
            }
            // The break timer runs from the moment the breaker opened.
            CircuitState::HalfOpen | CircuitState::Open => {
                debug!(state = %inner.state, "Ignoring failure from a call admitted earlier");
            }
        }
    }

    fn on_release(&self, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        self.state_tx.send_replace(to);

        match to {
            CircuitState::Open => warn!(
                from = %from,
                consecutive_failures = inner.consecutive_failures,
                break_duration_ms = self.config.break_duration.as_millis() as u64,
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => {
                info!(from = %from, "Circuit breaker half-open, admitting trial call");
            }
            CircuitState::Closed => info!(from = %from, "Circuit breaker closed"),
        }
    }
}

/// Admission ticket for one call through the breaker
#[must_use = "a permit must be settled with record_success or record_failure"]
pub struct BreakerPermit<'a, C: Clock> {
    breaker: &'a CircuitBreaker<C>,
    trial: bool,
    settled: bool,
}

impl<C: Clock> BreakerPermit<'_, C> {
    /// Whether this call is the half-open trial
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Record that the protected call succeeded
    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    /// Record that the protected call failed
    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl<C: Clock> Drop for BreakerPermit<'_, C> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_release(self.trial);
        }
    }
}
