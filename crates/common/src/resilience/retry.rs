//! Cancellable retry with exponential backoff
//!
//! An operation gets one initial attempt plus up to `max_retries` retries.
//! Before retry `n` the executor waits `backoff.calculate_delay(n)`; with the
//! default exponential strategy that is `initial_delay * 2^n`. Both the
//! attempt and the wait race against a [`CancellationToken`], so a caller
//! that gives up is never left waiting on a sleeping retry loop.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::error::{ConfigError, ConfigResult};

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// All retry attempts have been exhausted; `source` is the last failure
    #[error("All retry attempts exhausted after {attempts} tries")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The retry policy declined to retry the failure
    #[error("Operation failed with non-retryable error after {attempts} tries")]
    NonRetryable {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The cancellation token fired before the sequence finished
    #[error("Retry cancelled after {attempts} completed attempts")]
    Cancelled { attempts: u32 },
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Determine if the error should be retried
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Retry the operation after the backoff delay
    Retry,
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: `initial_delay * factor^attempt`, capped at
    /// `max_delay`
    Exponential { initial_delay: Duration, factor: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Exponential doubling from `initial_delay`
    pub fn doubling(initial_delay: Duration, max_delay: Duration) -> Self {
        BackoffStrategy::Exponential { initial_delay, factor: 2.0, max_delay }
    }

    /// Calculate the delay before the given retry (1 for the first retry)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Exponential { initial_delay, factor, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay = initial_delay.as_millis() as f64 * factor.powi(exponent);
                let delay_ms = delay.min(max_delay.as_millis() as f64) as u64;
                Duration::from_millis(delay_ms)
            }
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: BackoffStrategy::doubling(
                Duration::from_millis(200),
                Duration::from_secs(30),
            ),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Total attempts including the initial call
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        match &self.backoff {
            BackoffStrategy::Exponential { factor, .. } if *factor < 1.0 => {
                Err(ConfigError::Invalid {
                    message: "exponential factor must be at least 1.0".to_string(),
                })
            }
            BackoffStrategy::Exponential { initial_delay, max_delay, .. }
                if max_delay < initial_delay =>
            {
                Err(ConfigError::Invalid {
                    message: "max_delay must not be shorter than initial_delay".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        factor: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, factor, max_delay };
        self
    }

    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P = policies::AlwaysRetry> {
    config: RetryConfig,
    policy: P,
}

impl RetryExecutor {
    /// Executor that retries every failure
    pub fn always(config: RetryConfig) -> Self {
        Self::new(config, policies::AlwaysRetry)
    }
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    ///
    /// The operation receives a child of `cancel` for each attempt. On
    /// cancellation the in-flight attempt is dropped and
    /// [`RetryError::Cancelled`] is returned.
    #[instrument(skip_all, fields(max_attempts = self.config.max_attempts()))]
    pub async fn execute<F, Fut, T, E>(
        &self,
        mut operation: F,
        cancel: &CancellationToken,
    ) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts();
        let mut completed: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts: completed });
            }

            let attempt = completed + 1;
            debug!(attempt, max_attempts, "Executing operation");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts: completed });
                }
                result = operation(cancel.child_token()) => result,
            };
            completed = attempt;

            let error = match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(retries = attempt - 1, "Operation succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %error, "All retry attempts exhausted");
                return Err(RetryError::AttemptsExhausted { attempts: attempt, source: error });
            }

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt, error = %error, "Retry policy declined to retry");
                    return Err(RetryError::NonRetryable { attempts: attempt, source: error });
                }
                RetryDecision::Retry => self.config.backoff.calculate_delay(attempt),
            };

            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Operation failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts: completed });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::*;

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug, Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
