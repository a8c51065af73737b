//! Error metrics aggregation and background pruning
//!
//! ## Design Principles
//!
//! 1. **Poison Recovery**: window queues sit behind `std::sync::Mutex` and
//!    every lock goes through explicit poison recovery (log a warning,
//!    continue with the recovered queue). A panic elsewhere never takes the
//!    metrics down with it.
//!
//! 2. **Fallible Records**: `record` returns `MetricsResult<()>`. The only
//!    failure today is the label cardinality cap; callers on the request path
//!    log and drop the error.
//!
//! 3. **Ring Buffers**: `VecDeque` per label, appended at the back and
//!    evicted from the front, so pruning and rate scans never shift memory.
//!
//! 4. **Fine-Grained Locking**: labels live in a `DashMap`; recording into
//!    `code:2001` never waits on a sweep of `code:4001`.
//!
//! ## Error Handling
//!
//! ```rust
//! use faultline_domain::ErrorCategory;
//! use faultline_infra::observability::metrics::ErrorMetrics;
//!
//! let metrics = ErrorMetrics::new(std::time::Duration::from_secs(300));
//!
//! if let Err(e) = metrics.record(ErrorCategory::Data, 2001) {
//!     tracing::warn!("Failed to record metric: {}", e);
//!     // Continue execution, metric dropped
//! }
//! ```

pub mod metrics;
pub mod pruner;

/// Metrics error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    /// Too many distinct labels; the new label was not tracked
    #[error("Label cardinality exceeded for '{label}': limit is {limit}")]
    CardinalityExceeded {
        /// Label that could not be added
        label: String,
        /// Configured limit
        limit: usize,
    },
}

/// Result type for metrics operations
pub type MetricsResult<T> = Result<T, MetricsError>;
