//! Sliding-window error metrics
//!
//! Every recorded failure bumps three labels: `total`, `category:<name>` and
//! `code:<n>`. Each label carries a monotonic count and a queue of
//! occurrence instants. Queues hold every occurrence still inside the
//! trailing window; memory is bounded by time, never by a sample count.
//!
//! ## Design
//! - **One entry per label** in a `DashMap`, so concurrent records only
//!   contend on the same label
//! - **VecDeque ring buffer** per label, ordered oldest-first
//! - **Poison-safe locking** with explicit match pattern (no .expect())
//! - **SeqCst ordering** for counts read back by snapshots

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use faultline_common::time::{Clock, SystemClock};
use faultline_core::ErrorMetricsPort;
use faultline_domain::constants::DEFAULT_METRICS_MAX_LABELS;
use faultline_domain::{ErrorCategory, FaultlineError, MetricsConfig, Result};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::observability::{MetricsError, MetricsResult};

/// Label counting every recorded failure
pub const TOTAL_LABEL: &str = "total";

/// `category:<name>`
pub fn category_label(category: ErrorCategory) -> String {
    format!("category:{}", category.name())
}

/// `code:<n>`
pub fn code_label(code: i32) -> String {
    format!("code:{code}")
}

#[derive(Default)]
struct LabelSeries {
    count: AtomicU64,
    window: Mutex<VecDeque<Instant>>,
}

/// Point-in-time view of one label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStats {
    /// Occurrences since startup
    pub count: u64,
    /// Occurrences inside the trailing window
    pub in_window: u64,
    pub rate_per_minute: f64,
}

/// Point-in-time view of every label
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMetricsSnapshot {
    pub window_secs: u64,
    pub labels: BTreeMap<String, LabelStats>,
}

impl ErrorMetricsSnapshot {
    pub fn get(&self, label: &str) -> Option<&LabelStats> {
        self.labels.get(label)
    }
}

/// Process-wide failure counters with a trailing time window
pub struct ErrorMetrics<C: Clock = SystemClock> {
    window: Duration,
    label_limit: usize,
    series: DashMap<String, LabelSeries>,
    clock: C,
}

impl ErrorMetrics<SystemClock> {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, SystemClock)
    }

    pub fn from_config(config: &MetricsConfig) -> Self {
        Self::new(config.window).with_label_limit(config.max_labels)
    }
}

impl<C: Clock> ErrorMetrics<C> {
    pub fn with_clock(window: Duration, clock: C) -> Self {
        Self { window, label_limit: DEFAULT_METRICS_MAX_LABELS, series: DashMap::new(), clock }
    }

    pub fn with_label_limit(mut self, label_limit: usize) -> Self {
        self.label_limit = label_limit;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of distinct labels seen so far
    pub fn label_count(&self) -> usize {
        self.series.len()
    }

    /// Record one failure under `total`, its category and its code
    ///
    /// Labels that fit are always updated, even when another label hits the
    /// cardinality cap.
    ///
    /// # Errors
    ///
    /// Returns `CardinalityExceeded` if a new label could not be tracked.
    pub fn record(&self, category: ErrorCategory, code: i32) -> MetricsResult<()> {
        let mut rejected = None;

        for label in [TOTAL_LABEL.to_string(), category_label(category), code_label(code)] {
            let series = match self.series_for(&label) {
                Ok(series) => series,
                Err(e) => {
                    rejected = Some(e);
                    continue;
                }
            };

            // SeqCst for consistency with snapshot reads
            series.count.fetch_add(1, Ordering::SeqCst);

            let mut window = lock_window(&series.window);
            // Read the clock under the lock so each queue stays ordered
            let now = self.clock.now();
            self.drop_expired(&mut window, now);
            window.push_back(now);
        }

        match rejected {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Occurrences per minute inside the trailing window
    ///
    /// Scans from the newest instant backwards and stops at the first one
    /// outside the window. Unknown labels report zero.
    pub fn error_rate(&self, label: &str) -> f64 {
        let Some(series) = self.series.get(label) else {
            return 0.0;
        };
        let in_window = self.in_window(&series, self.clock.now());
        self.per_minute(in_window)
    }

    /// Monotonic count for a label, zero if never recorded
    pub fn count(&self, label: &str) -> u64 {
        self.series.get(label).map_or(0, |series| series.count.load(Ordering::SeqCst))
    }

    pub fn snapshot(&self) -> ErrorMetricsSnapshot {
        let now = self.clock.now();
        let labels = self
            .series
            .iter()
            .map(|entry| {
                let in_window = self.in_window(entry.value(), now);
                let stats = LabelStats {
                    count: entry.count.load(Ordering::SeqCst),
                    in_window,
                    rate_per_minute: self.per_minute(in_window),
                };
                (entry.key().clone(), stats)
            })
            .collect();

        ErrorMetricsSnapshot { window_secs: self.window.as_secs(), labels }
    }

    /// Drop instants older than the window from every queue
    ///
    /// Locks one label at a time; recording into other labels proceeds
    /// concurrently. Counts are never touched.
    ///
    /// # Returns
    ///
    /// Number of instants removed
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        for entry in self.series.iter() {
            let mut window = lock_window(&entry.window);
            removed += self.drop_expired(&mut window, now);
        }

        debug!(removed, labels = self.series.len(), "Pruned expired error occurrences");
        removed
    }

    fn series_for(&self, label: &str) -> MetricsResult<Ref<'_, String, LabelSeries>> {
        if let Some(series) = self.series.get(label) {
            return Ok(series);
        }
        if self.series.len() >= self.label_limit {
            return Err(MetricsError::CardinalityExceeded {
                label: label.to_string(),
                limit: self.label_limit,
            });
        }
        Ok(self.series.entry(label.to_string()).or_default().downgrade())
    }

    fn drop_expired(&self, window: &mut VecDeque<Instant>, now: Instant) -> usize {
        let mut removed = 0;
        while window.front().is_some_and(|at| now.saturating_duration_since(*at) > self.window) {
            window.pop_front();
            removed += 1;
        }
        removed
    }

    fn in_window(&self, series: &LabelSeries, now: Instant) -> u64 {
        let window = lock_window(&series.window);
        window
            .iter()
            .rev()
            .take_while(|at| now.saturating_duration_since(**at) <= self.window)
            .count() as u64
    }

    fn per_minute(&self, occurrences: u64) -> f64 {
        let minutes = self.window.as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        occurrences as f64 / minutes
    }
}

impl<C: Clock> fmt::Debug for ErrorMetrics<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMetrics")
            .field("window", &self.window)
            .field("label_limit", &self.label_limit)
            .field("labels", &self.label_count())
            .finish()
    }
}

#[async_trait]
impl<C: Clock> ErrorMetricsPort for ErrorMetrics<C> {
    async fn record_error(
        &self,
        category: ErrorCategory,
        code: i32,
        correlation_id: &str,
    ) -> Result<()> {
        self.record(category, code).map_err(|e| FaultlineError::Metrics(e.to_string()))?;
        trace!(correlation_id, code, category = category.name(), "Recorded error occurrence");
        Ok(())
    }
}

fn lock_window(window: &Mutex<VecDeque<Instant>>) -> MutexGuard<'_, VecDeque<Instant>> {
    match window.lock() {
        Ok(guard) => guard,
        Err(poison_err) => {
            warn!("Error window mutex poisoned, recovering");
            poison_err.into_inner()
        }
    }
}
