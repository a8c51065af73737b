//! Ports used by the dispatch coordinator

use async_trait::async_trait;
use faultline_domain::ClassifiedError;
use tokio_util::sync::CancellationToken;

/// Diagnostic retry of a failing system operation
///
/// The coordinator never re-runs the request handler. Instead it asks a probe
/// whether the failing dependency has recovered, once per retry attempt.
/// Whatever the probe returns, an exhausted sequence reports the original
/// error; only a breaker rejection changes what the caller sees.
#[async_trait]
pub trait RetryProbe: Send + Sync {
    /// One attempt; `Ok(())` means the dependency answered
    async fn attempt(
        &self,
        failure: &ClassifiedError,
        cancel: CancellationToken,
    ) -> Result<(), ClassifiedError>;
}

/// Probe that replays the original failure on every attempt
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayProbe;

#[async_trait]
impl RetryProbe for ReplayProbe {
    async fn attempt(
        &self,
        failure: &ClassifiedError,
        _cancel: CancellationToken,
    ) -> Result<(), ClassifiedError> {
        Err(failure.clone())
    }
}
