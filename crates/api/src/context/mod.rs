//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use faultline_core::{DispatchCoordinator, ErrorMetricsPort};
use faultline_domain::{Config, FaultlineError, Result};
use faultline_infra::{ErrorMetrics, MetricsPruner};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const PRUNER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub metrics: Arc<ErrorMetrics>,
    pub coordinator: Arc<DispatchCoordinator>,
    pruner: Mutex<MetricsPruner>,
    shutdown: CancellationToken,
}

impl AppContext {
    /// Wire every service from `config` and start the metrics pruner
    ///
    /// # Errors
    ///
    /// Returns `FaultlineError::Config` for invalid resilience settings and
    /// `FaultlineError::Internal` if the pruner fails to start in time.
    pub async fn new(config: Config) -> Result<Self> {
        let shutdown = CancellationToken::new();

        let metrics = Arc::new(ErrorMetrics::from_config(&config.metrics));
        let port: Arc<dyn ErrorMetricsPort> = metrics.clone();
        let coordinator = Arc::new(
            DispatchCoordinator::from_config(&config, port)?.with_shutdown(shutdown.child_token()),
        );

        let mut pruner = MetricsPruner::from_config(Arc::clone(&metrics), &config.metrics)
            .with_parent_token(shutdown.clone());

        // Fail fast if the background task cannot be spawned
        tokio::time::timeout(PRUNER_START_TIMEOUT, pruner.start())
            .await
            .map_err(|_| {
                tracing::error!(timeout_secs = 10, "Metrics pruner start timed out");
                FaultlineError::Internal("Metrics pruner start timed out after 10s".into())
            })?
            .map_err(|err| {
                tracing::error!(error = %err, "failed to start metrics pruner");
                FaultlineError::Internal(format!("failed to start metrics pruner: {}", err))
            })?;

        tracing::info!(
            failure_threshold = config.resilience.failure_threshold,
            max_retries = config.resilience.max_retries,
            window_secs = config.metrics.window.as_secs(),
            "Application context initialised"
        );

        Ok(Self { config, metrics, coordinator, pruner: Mutex::new(pruner), shutdown })
    }

    /// Token cancelled when the application shuts down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn pruner_running(&self) -> bool {
        self.pruner.lock().await.is_running().await
    }

    /// Cancel pending retries and stop the pruner
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();

        let mut pruner = self.pruner.lock().await;
        if pruner.is_running().await {
            pruner.stop().await.map_err(|err| FaultlineError::Internal(err.to_string()))?;
        }

        tracing::info!("Application context shut down");
        Ok(())
    }
}
