//! Configuration structures
//!
//! Every section defaults field-by-field, so a config file only needs the
//! values it changes. Durations are written as integers: milliseconds for
//! retry and breaker timings, seconds for the metrics window.

use std::time::Duration;

use faultline_common::utils::{duration_millis, duration_secs};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DOCUMENTATION_BASE_URL, DEFAULT_METRICS_MAX_LABELS};
use crate::errors::{FaultlineError, Result};

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub resilience: ResilienceConfig,
    pub metrics: MetricsConfig,
    pub responses: ResponseConfig,
}

impl Config {
    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_address.trim().is_empty() {
            return Err(FaultlineError::Config("server.bind_address must not be empty".into()));
        }
        if self.resilience.failure_threshold == 0 {
            return Err(FaultlineError::Config(
                "resilience.failure_threshold must be greater than 0".into(),
            ));
        }
        if self.resilience.break_duration.is_zero() {
            return Err(FaultlineError::Config(
                "resilience.break_duration_ms must be greater than 0".into(),
            ));
        }
        if self.metrics.window.is_zero() {
            return Err(FaultlineError::Config("metrics.window_secs must be greater than 0".into()));
        }
        if self.metrics.prune_interval.is_zero() {
            return Err(FaultlineError::Config(
                "metrics.prune_interval_secs must be greater than 0".into(),
            ));
        }
        if self.metrics.max_labels == 0 {
            return Err(FaultlineError::Config("metrics.max_labels must be greater than 0".into()));
        }
        if self.responses.documentation_base_url.trim().is_empty() {
            return Err(FaultlineError::Config(
                "responses.documentation_base_url must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Extra request headers captured into the request context
    pub allowed_headers: Vec<String>,
    /// Mount the `/faults/*` routes that raise each failure kind
    pub enable_fault_routes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            allowed_headers: vec![
                "Accept".to_string(),
                "Accept-Language".to_string(),
                "Content-Type".to_string(),
                "X-Request-ID".to_string(),
            ],
            enable_fault_routes: cfg!(debug_assertions),
        }
    }
}

/// Retry and circuit breaker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff_base * 2^n`
    #[serde(rename = "backoff_base_ms", with = "duration_millis")]
    pub backoff_base: Duration,
    #[serde(rename = "max_backoff_ms", with = "duration_millis")]
    pub max_backoff: Duration,
    /// Consecutive failed sequences before the breaker opens
    pub failure_threshold: u32,
    #[serde(rename = "break_duration_ms", with = "duration_millis")]
    pub break_duration: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
            failure_threshold: 5,
            break_duration: Duration::from_secs(30),
        }
    }
}

impl ResilienceConfig {
    /// Short delays for tests and local development
    pub fn low_latency() -> Self {
        Self {
            backoff_base: Duration::from_millis(50),
            max_backoff: Duration::from_secs(5),
            break_duration: Duration::from_millis(500),
            ..Self::default()
        }
    }
}

/// Sliding-window metrics settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    #[serde(rename = "window_secs", with = "duration_secs")]
    pub window: Duration,
    #[serde(rename = "prune_interval_secs", with = "duration_secs")]
    pub prune_interval: Duration,
    /// Cap on distinct metric labels; only `code:<n>` labels grow with input
    pub max_labels: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(300),
            prune_interval: Duration::from_secs(60),
            max_labels: DEFAULT_METRICS_MAX_LABELS,
        }
    }
}

/// Error response settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub documentation_base_url: String,
    /// Attach diagnostics for unexpected failures to the response body
    pub include_diagnostics: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            documentation_base_url: DEFAULT_DOCUMENTATION_BASE_URL.to_string(),
            include_diagnostics: cfg!(debug_assertions),
        }
    }
}
