//! Error metrics port - records the final outcome of each failed request

use async_trait::async_trait;
use faultline_domain::{ErrorCategory, Result};

/// Port trait for error metrics recording
///
/// Called exactly once per failed request, after the reported error is
/// final. Implementations must be safe to call from many requests at once.
#[async_trait]
pub trait ErrorMetricsPort: Send + Sync {
    /// Record one occurrence of `code` in `category`
    ///
    /// Errors are logged by the caller and never fail the request.
    async fn record_error(
        &self,
        category: ErrorCategory,
        code: i32,
        correlation_id: &str,
    ) -> Result<()>;
}
