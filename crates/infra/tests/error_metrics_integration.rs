//! Integration tests for the error metrics aggregator
//!
//! Exercises the aggregator through the core metrics port, the way the
//! dispatch coordinator uses it.

use std::sync::Arc;
use std::time::Duration;

use faultline_common::time::MockClock;
use faultline_core::ErrorMetricsPort;
use faultline_domain::ErrorCategory;
use faultline_infra::observability::metrics::TOTAL_LABEL;
use faultline_infra::{ErrorMetrics, MetricsPruner};

/// Recording N failures of one code yields counts of N on every label.
///
/// # Test Steps
/// 1. Record 25 Data/2001 failures from concurrent tasks through the port
/// 2. Check the three labels and the in-window rate
#[tokio::test]
async fn test_port_records_from_concurrent_tasks() {
    let clock = MockClock::new();
    let metrics = Arc::new(ErrorMetrics::with_clock(Duration::from_secs(300), clock.clone()));
    let port: Arc<dyn ErrorMetricsPort> = metrics.clone();

    let tasks: Vec<_> = (0..25)
        .map(|i| {
            let port = Arc::clone(&port);
            tokio::spawn(async move {
                port.record_error(ErrorCategory::Data, 2001, &format!("corr-{i}")).await
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("task joined").expect("recorded");
    }

    assert_eq!(metrics.count(TOTAL_LABEL), 25);
    assert_eq!(metrics.count("category:data"), 25);
    assert_eq!(metrics.count("code:2001"), 25);
    assert!((metrics.error_rate("category:data") - 5.0).abs() < 1e-9);
}

/// Expired occurrences drop out of rates and, after a sweep, out of memory.
///
/// # Test Steps
/// 1. Record failures at t=0 and t=4min
/// 2. Move to t=6min and sweep
/// 3. Only the t=4min occurrence remains in the window
#[tokio::test]
async fn test_window_slides_and_sweep_bounds_memory() {
    let clock = MockClock::new();
    let metrics = Arc::new(ErrorMetrics::with_clock(Duration::from_secs(300), clock.clone()));
    let pruner = MetricsPruner::new(Arc::clone(&metrics), Duration::from_secs(60));

    metrics.record(ErrorCategory::System, 4001).expect("record");
    clock.advance(Duration::from_secs(240));
    metrics.record(ErrorCategory::System, 4500).expect("record");
    clock.advance(Duration::from_secs(120));

    assert_eq!(metrics.error_rate("code:4001"), 0.0);
    assert!((metrics.error_rate("category:system") - 0.2).abs() < 1e-9);

    // total, category:system and code:4001 each drop one instant
    assert_eq!(pruner.sweep_once(), 3);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.get(TOTAL_LABEL).map(|s| (s.count, s.in_window)), Some((2, 1)));
    assert_eq!(snapshot.get("code:4001").map(|s| (s.count, s.in_window)), Some((1, 0)));
}
