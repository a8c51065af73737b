//! Background pruning of expired error occurrences
//!
//! Recording only trims the labels it touches. This service sweeps every
//! window queue on a fixed cadence, so labels that stop receiving failures
//! release their expired instants too.
//!
//! # Lifecycle
//!
//! - `start` spawns the sweep loop and keeps its join handle
//! - `stop` cancels the loop and awaits it with a timeout
//! - a parent token (the application shutdown token) stops the loop too

use std::sync::Arc;
use std::time::Duration;

use faultline_common::error::{CommonError, CommonResult};
use faultline_common::time::{Clock, SystemClock};
use faultline_domain::MetricsConfig;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::metrics::ErrorMetrics;

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Periodic sweep over an [`ErrorMetrics`] instance
pub struct MetricsPruner<C: Clock = SystemClock> {
    metrics: Arc<ErrorMetrics<C>>,
    interval: Duration,
    parent_token: Option<CancellationToken>,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl<C: Clock> MetricsPruner<C> {
    pub fn new(metrics: Arc<ErrorMetrics<C>>, interval: Duration) -> Self {
        Self {
            metrics,
            interval,
            parent_token: None,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_config(metrics: Arc<ErrorMetrics<C>>, config: &MetricsConfig) -> Self {
        Self::new(metrics, config.prune_interval)
    }

    /// Tie the sweep loop to an outer shutdown token
    pub fn with_parent_token(mut self, token: CancellationToken) -> Self {
        self.parent_token = Some(token);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the sweep loop
    ///
    /// # Errors
    ///
    /// Returns error if the pruner is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> CommonResult<()> {
        if self.is_running().await {
            return Err(CommonError::config("Metrics pruner already running"));
        }

        // Fresh token so the pruner can restart after stop
        self.cancellation_token = match &self.parent_token {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        let metrics = Arc::clone(&self.metrics);
        let interval = self.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sweep_loop(metrics, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!(interval_ms = interval.as_millis() as u64, "Metrics pruner started");

        Ok(())
    }

    /// Stop the sweep loop and wait for it to finish
    ///
    /// # Errors
    ///
    /// Returns error if the pruner is not running, the task panicked, or it
    /// did not finish within the timeout
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> CommonResult<()> {
        if !self.is_running().await {
            return Err(CommonError::config("Metrics pruner not running"));
        }

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            match tokio::time::timeout(STOP_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Metrics pruner task panicked: {}", e);
                    return Err(CommonError::internal(format!("Pruner task panicked: {}", e)));
                }
                Err(_) => {
                    warn!("Metrics pruner did not stop within timeout");
                    return Err(CommonError::timeout("pruner_shutdown", STOP_TIMEOUT));
                }
            }
        }

        info!("Metrics pruner stopped");

        Ok(())
    }

    /// A pruner is running while its task handle is live
    pub async fn is_running(&self) -> bool {
        let guard = self.task_handle.lock().await;
        guard.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Run one sweep immediately
    pub fn sweep_once(&self) -> usize {
        self.metrics.prune_expired()
    }

    async fn sweep_loop(
        metrics: Arc<ErrorMetrics<C>>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Metrics pruner loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    let removed = metrics.prune_expired();
                    if removed > 0 {
                        debug!(removed, "Periodic metrics sweep completed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use faultline_common::time::MockClock;
    use faultline_domain::ErrorCategory;

    use super::*;

    fn pruner(clock: &MockClock, interval: Duration) -> MetricsPruner<MockClock> {
        let metrics = Arc::new(ErrorMetrics::with_clock(Duration::from_secs(60), clock.clone()));
        MetricsPruner::new(metrics, interval)
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let mut pruner = pruner(&MockClock::new(), Duration::from_millis(10));

        assert!(!pruner.is_running().await);
        pruner.start().await.expect("start");
        assert!(pruner.is_running().await);
        assert!(pruner.start().await.is_err(), "double start is rejected");

        pruner.stop().await.expect("stop");
        assert!(!pruner.is_running().await);
        assert!(pruner.stop().await.is_err(), "stop without start is rejected");

        // Restart after stop
        pruner.start().await.expect("restart");
        pruner.stop().await.expect("stop again");
    }

    /// The loop sweeps expired instants without a manual call.
    #[tokio::test]
    async fn test_loop_prunes_in_background() {
        let clock = MockClock::new();
        let mut pruner = pruner(&clock, Duration::from_millis(10));

        pruner.metrics.record(ErrorCategory::System, 4001).expect("record");
        clock.advance(Duration::from_secs(61));

        pruner.start().await.expect("start");
        tokio::time::sleep(Duration::from_millis(100)).await;
        pruner.stop().await.expect("stop");

        assert_eq!(pruner.sweep_once(), 0, "background sweep already removed everything");
        assert_eq!(pruner.metrics.count("code:4001"), 1);
    }

    #[tokio::test]
    async fn test_parent_token_stops_loop() {
        let parent = CancellationToken::new();
        let mut pruner = pruner(&MockClock::new(), Duration::from_secs(60))
            .with_parent_token(parent.clone());

        pruner.start().await.expect("start");
        parent.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!pruner.is_running().await);
    }
}
