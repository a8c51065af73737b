//! # Faultline Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The sliding-window error metrics aggregator and its pruning service
//! - The configuration loader (files plus `FAULTLINE_*` overrides)
//!
//! ## Architecture
//! - Implements traits defined in `faultline-core`
//! - Contains the process-wide mutable state (counters, timestamp queues)

pub mod config;
pub mod observability;

// Re-export commonly used items
pub use observability::metrics::{ErrorMetrics, ErrorMetricsSnapshot, LabelStats};
pub use observability::pruner::MetricsPruner;
pub use observability::{MetricsError, MetricsResult};
