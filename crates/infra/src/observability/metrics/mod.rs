//! Metrics collection modules

pub mod errors;

pub use errors::{
    category_label, code_label, ErrorMetrics, ErrorMetricsSnapshot, LabelStats, TOTAL_LABEL,
};
