// tests/pool_health.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::time::Duration;

use tokio::time::timeout;

use plandag::pool::{WorkSpec, WorkerPool};
use plandag::types::Priority;
use plandag_test_utils::actions::{FailingAction, RecordingAction, TimeoutAction, new_log};
use plandag_test_utils::builders::fast_pool_config;

type TestResult = Result<(), Box<dyn Error>>;

/// Error and timeout rates are computed over cumulative lifetime counts.
#[tokio::test]
async fn rates_are_cumulative_over_pool_lifetime() -> TestResult {
    init_tracing();

    let mut config = fast_pool_config(1);
    config.max_retries = 0;
    let pool = WorkerPool::new(config)?;
    let log = new_log();

    pool.submit(WorkSpec::new(
        "fail",
        Priority::Normal,
        FailingAction::always_failing("fail"),
    ))?
    .wait()
    .await?;

    pool.submit(WorkSpec::new(
        "timeout",
        Priority::Normal,
        TimeoutAction::new("timeout"),
    ))?
    .wait()
    .await?;

    for i in 0..2 {
        pool.submit(WorkSpec::new(
            format!("ok-{i}"),
            Priority::Normal,
            RecordingAction::new(&format!("ok-{i}"), log.clone()),
        ))?
        .wait()
        .await?;
    }

    // 1 failed + 1 timed out + 2 completed = 4 finished.
    let stats = pool.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.completed, 2);
    assert!((stats.error_rate() - 0.25).abs() < f64::EPSILON);
    assert!((stats.timeout_rate() - 0.25).abs() < f64::EPSILON);

    Ok(())
}

/// Health is a queryable signal derived from the configured thresholds.
#[tokio::test]
async fn health_reflects_thresholds() -> TestResult {
    init_tracing();

    let mut config = fast_pool_config(1);
    config.max_retries = 0;
    config.error_rate_threshold = 0.5;
    let pool = WorkerPool::new(config)?;

    assert!(pool.health().healthy);

    pool.submit(WorkSpec::new(
        "fail",
        Priority::Normal,
        FailingAction::always_failing("fail"),
    ))?
    .wait()
    .await?;

    // 1 of 1 finished items failed: rate 1.0 >= 0.5.
    let health = pool.health();
    assert!(!health.healthy);
    assert!((health.error_rate - 1.0).abs() < f64::EPSILON);

    Ok(())
}

/// The periodic health check publishes transitions on the watch channel.
#[tokio::test]
async fn health_transitions_are_published() -> TestResult {
    init_tracing();

    let mut config = fast_pool_config(1);
    config.max_retries = 0;
    config.health_check_interval_ms = 20;
    let pool = WorkerPool::new(config)?;
    let log = new_log();

    let mut health_rx = pool.subscribe_health();
    assert!(health_rx.borrow().healthy);

    pool.submit(WorkSpec::new(
        "fail",
        Priority::Normal,
        FailingAction::always_failing("fail"),
    ))?
    .wait()
    .await?;

    // The next health tick must observe the failure and flip the signal.
    timeout(Duration::from_secs(2), health_rx.changed()).await??;
    assert!(!health_rx.borrow_and_update().healthy);

    // Enough successes push the cumulative rate back under the threshold.
    for i in 0..9 {
        pool.submit(WorkSpec::new(
            format!("ok-{i}"),
            Priority::Normal,
            RecordingAction::new(&format!("ok-{i}"), log.clone()),
        ))?
        .wait()
        .await?;
    }

    loop {
        timeout(Duration::from_secs(2), health_rx.changed()).await??;
        if health_rx.borrow_and_update().healthy {
            break;
        }
    }

    Ok(())
}
