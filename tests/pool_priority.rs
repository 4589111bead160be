// tests/pool_priority.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::time::Duration;

use plandag::pool::{WorkSpec, WorkerPool};
use plandag::types::Priority;
use plandag_test_utils::actions::{GatedAction, RecordingAction, log_entries, new_log};
use plandag_test_utils::builders::fast_pool_config;

type TestResult = Result<(), Box<dyn Error>>;

/// With capacity 1 and all submissions queued behind an occupied slot, the
/// dispatch order is all HIGH (submission order), then all NORMAL, then all
/// LOW, regardless of interleaved submission order.
#[tokio::test]
async fn dispatch_follows_strict_priority_with_capacity_one() -> TestResult {
    init_tracing();

    let pool = WorkerPool::new(fast_pool_config(1))?;
    let log = new_log();

    // Occupy the single slot so everything below queues up first.
    let gate = GatedAction::new("gate", log.clone());
    let gate_handle = pool.submit(WorkSpec::new("gate", Priority::High, gate.clone()))?;
    gate.wait_started().await;

    let submissions = [
        ("low-1", Priority::Low),
        ("normal-1", Priority::Normal),
        ("high-1", Priority::High),
        ("low-2", Priority::Low),
        ("high-2", Priority::High),
        ("normal-2", Priority::Normal),
    ];

    let mut handles = Vec::new();
    for (label, priority) in submissions {
        let action = RecordingAction::new(label, log.clone());
        handles.push(pool.submit(WorkSpec::new(label, priority, action))?);
    }

    gate.release();
    pool.wait_for_completion(Some(Duration::from_secs(3)))
        .await?;

    assert_eq!(
        log_entries(&log),
        vec!["gate", "high-1", "high-2", "normal-1", "normal-2", "low-1", "low-2"]
    );

    assert!(gate_handle.wait().await?.is_success());
    for handle in handles {
        assert!(handle.wait().await?.is_success());
    }

    Ok(())
}

/// Once an item runs, a later higher-priority submission must not disturb
/// it; priority only affects queue position.
#[tokio::test]
async fn running_item_is_not_preempted_by_higher_priority_arrival() -> TestResult {
    init_tracing();

    let pool = WorkerPool::new(fast_pool_config(1))?;
    let log = new_log();

    let low = GatedAction::new("low", log.clone());
    let low_handle = pool.submit(WorkSpec::new("low", Priority::Low, low.clone()))?;
    low.wait_started().await;

    let high = RecordingAction::new("high", log.clone());
    let high_handle = pool.submit(WorkSpec::new("high", Priority::High, high.clone()))?;

    // Give the pool a moment: the high-priority item must stay queued.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log_entries(&log), vec!["low"]);
    assert_eq!(high.runs(), 0);
    assert_eq!(pool.active_count(), 1);

    low.release();
    pool.wait_for_completion(Some(Duration::from_secs(3)))
        .await?;

    assert_eq!(log_entries(&log), vec!["low", "high"]);
    assert!(low_handle.wait().await?.is_success());
    assert!(high_handle.wait().await?.is_success());

    Ok(())
}

/// Within one priority level, submission order is preserved.
#[tokio::test]
async fn fifo_within_a_priority_level() -> TestResult {
    init_tracing();

    let pool = WorkerPool::new(fast_pool_config(1))?;
    let log = new_log();

    let gate = GatedAction::new("gate", log.clone());
    pool.submit(WorkSpec::new("gate", Priority::Normal, gate.clone()))?;
    gate.wait_started().await;

    for label in ["n-1", "n-2", "n-3"] {
        let action = RecordingAction::new(label, log.clone());
        pool.submit(WorkSpec::new(label, Priority::Normal, action))?;
    }

    gate.release();
    pool.wait_for_completion(Some(Duration::from_secs(3)))
        .await?;

    assert_eq!(log_entries(&log), vec!["gate", "n-1", "n-2", "n-3"]);
    Ok(())
}
