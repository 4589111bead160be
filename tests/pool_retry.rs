// tests/pool_retry.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::time::Duration;

use plandag::pool::{WorkSpec, WorkState, WorkerPool};
use plandag::types::Priority;
use plandag_test_utils::actions::{
    FailingAction, GatedAction, RecordingAction, TimeoutAction, log_entries, new_log,
};
use plandag_test_utils::builders::fast_pool_config;

type TestResult = Result<(), Box<dyn Error>>;

/// A permanently failing action is attempted exactly `max_retries + 1`
/// times and ends in `Failed`.
#[tokio::test]
async fn permanent_failure_is_attempted_max_retries_plus_one_times() -> TestResult {
    init_tracing();

    let config = fast_pool_config(1); // max_retries = 2 by default
    let max_retries = config.max_retries;
    let pool = WorkerPool::new(config)?;

    let action = FailingAction::always_failing("doomed");
    let handle = pool.submit(WorkSpec::new("doomed", Priority::Normal, action.clone()))?;

    let outcome = handle.wait().await?;
    assert_eq!(outcome.state, WorkState::Failed);
    assert_eq!(outcome.retries, max_retries);
    assert_eq!(action.runs() as u32, max_retries + 1);
    assert!(outcome.error.is_some());

    let stats = pool.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.retried, u64::from(max_retries));

    Ok(())
}

/// A transient failure recovers through the retry path.
#[tokio::test]
async fn transient_failure_recovers_on_retry() -> TestResult {
    init_tracing();

    let pool = WorkerPool::new(fast_pool_config(1))?;

    let action = FailingAction::new("flaky", 1);
    let handle = pool.submit(WorkSpec::new("flaky", Priority::Normal, action.clone()))?;

    let outcome = handle.wait().await?;
    assert_eq!(outcome.state, WorkState::Completed);
    assert_eq!(outcome.retries, 1);
    assert_eq!(action.runs(), 2);

    Ok(())
}

/// A timeout classification is terminal immediately; it never re-enters
/// the retry path.
#[tokio::test]
async fn timeouts_are_never_retried() -> TestResult {
    init_tracing();

    let pool = WorkerPool::new(fast_pool_config(1))?;

    let action = TimeoutAction::new("stuck");
    let handle = pool.submit(WorkSpec::new("stuck", Priority::Normal, action.clone()))?;

    let outcome = handle.wait().await?;
    assert_eq!(outcome.state, WorkState::TimedOut);
    assert_eq!(outcome.retries, 0);
    assert_eq!(action.runs(), 1);

    let stats = pool.stats();
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.retried, 0);

    Ok(())
}

/// A retried item re-enters at the *front* of its priority queue: it runs
/// again before peers that queued up while it was failing.
#[tokio::test]
async fn retried_item_reenters_at_front_of_its_priority() -> TestResult {
    init_tracing();

    let pool = WorkerPool::new(fast_pool_config(1))?;
    let log = new_log();

    // a: fails once, then succeeds. b: holds the slot while a's retry
    // timer elapses. c: queued behind both.
    let a = FailingAction::with_log("a", 1, log.clone());
    let b = GatedAction::new("b", log.clone());
    let c = RecordingAction::new("c", log.clone());

    let a_handle = pool.submit(WorkSpec::new("a", Priority::Normal, a.clone()))?;
    let b_handle = pool.submit(WorkSpec::new("b", Priority::Normal, b.clone()))?;
    let c_handle = pool.submit(WorkSpec::new("c", Priority::Normal, c.clone()))?;

    // b starts once a's first attempt fails.
    b.wait_started().await;

    // Let a's retry delay (10ms) elapse while b holds the slot, so a is
    // re-queued at the front, ahead of c.
    tokio::time::sleep(Duration::from_millis(50)).await;
    b.release();

    pool.wait_for_completion(Some(Duration::from_secs(3)))
        .await?;

    assert_eq!(log_entries(&log), vec!["a", "b", "a", "c"]);
    assert!(a_handle.wait().await?.is_success());
    assert!(b_handle.wait().await?.is_success());
    assert!(c_handle.wait().await?.is_success());

    Ok(())
}
