//! Retry wrapped by a circuit breaker
//!
//! The breaker sees the whole retry sequence as one call: a permit is taken
//! before the first attempt and settled once the sequence finishes. A
//! sequence that is cancelled settles nothing, so abandoned requests neither
//! trip the breaker nor hold the half-open trial slot.

use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::error::{ConfigResult, ResilienceError, ResilienceResult};
use super::retry::{policies::AlwaysRetry, RetryConfig, RetryError, RetryExecutor, RetryPolicy};
use crate::time::{Clock, SystemClock};

/// Composed retry and circuit breaker policy
pub struct ResiliencePipeline<P = AlwaysRetry, C: Clock = SystemClock> {
    retry: RetryExecutor<P>,
    breaker: CircuitBreaker<C>,
}

impl<P: fmt::Debug, C: Clock> fmt::Debug for ResiliencePipeline<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResiliencePipeline")
            .field("retry", &self.retry)
            .field("breaker", &self.breaker)
            .finish()
    }
}

impl ResiliencePipeline {
    /// Pipeline that retries every failure, on the system clock
    pub fn new(retry: RetryConfig, breaker: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(retry, breaker, SystemClock)
    }
}

impl<C: Clock> ResiliencePipeline<AlwaysRetry, C> {
    /// Pipeline with a custom clock for the breaker timer
    pub fn with_clock(
        retry: RetryConfig,
        breaker: CircuitBreakerConfig,
        clock: C,
    ) -> ConfigResult<Self> {
        retry.validate()?;
        Ok(Self {
            retry: RetryExecutor::always(retry),
            breaker: CircuitBreaker::with_clock(breaker, clock)?,
        })
    }
}

impl<P, C: Clock> ResiliencePipeline<P, C> {
    /// Assemble a pipeline from an existing executor and breaker
    pub fn from_parts(retry: RetryExecutor<P>, breaker: CircuitBreaker<C>) -> Self {
        Self { retry, breaker }
    }

    pub fn breaker(&self) -> &CircuitBreaker<C> {
        &self.breaker
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Run `operation` under retry, inside the breaker
    ///
    /// Returns [`ResilienceError::CircuitOpen`] without invoking the
    /// operation when the breaker rejects the call.
    #[instrument(skip_all, fields(breaker_state = %self.breaker.state()))]
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> ResilienceResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.breaker.try_acquire()?;
        if permit.is_trial() {
            debug!("Running half-open trial sequence");
        }

        match self.retry.execute(operation, cancel).await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(RetryError::Cancelled { attempts }) => {
                debug!(attempts, "Resilience pipeline cancelled");
                drop(permit);
                Err(ResilienceError::Cancelled)
            }
            Err(RetryError::AttemptsExhausted { attempts, source })
            | Err(RetryError::NonRetryable { attempts, source }) => {
                permit.record_failure();
                Err(ResilienceError::OperationFailed { attempts, source })
            }
        }
    }
}
