//! Resilience patterns for fault tolerance
//!
//! This module provides **generic, reusable** resilience patterns:
//! - **Retry**: cancellable retries with exponential backoff
//! - **Circuit Breaker**: stops calling an operation that keeps failing and
//!   probes it again with a single trial after a fixed break duration
//! - **Pipeline**: the two composed, with the breaker on the outside so one
//!   exhausted retry sequence counts as one breaker failure
//!
//! Everything here is generic over the operation's error type. Mapping a
//! breaker rejection onto an application error is left to the caller.
//!
//! ```no_run
//! use faultline_common::resilience::{
//!     CircuitBreakerConfig, ResiliencePipeline, RetryConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline =
//!     ResiliencePipeline::new(RetryConfig::default(), CircuitBreakerConfig::default())?;
//! let cancel = CancellationToken::new();
//!
//! let value = pipeline
//!     .execute(|_token| async { Ok::<_, std::io::Error>(42) }, &cancel)
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod error;
pub mod pipeline;
pub mod retry;

pub use circuit_breaker::{
    BreakerPermit, BreakerRejected, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitBreakerMetrics, CircuitState,
};
pub use error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
pub use pipeline::ResiliencePipeline;
pub use retry::{
    policies, BackoffStrategy, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError,
    RetryExecutor, RetryPolicy, RetryResult,
};
