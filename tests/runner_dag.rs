// tests/runner_dag.rs

mod common;
use crate::common::init_tracing;

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use plandag::dag::TaskGraph;
use plandag::engine::{DagRunner, RunnerOptions};
use plandag::pool::{WorkAction, WorkerPool};
use plandag::status::{MemoryStatusStore, StatusStore};
use plandag::types::TaskStatus;
use plandag_test_utils::actions::{FailingAction, RecordingAction, log_entries, new_log};
use plandag_test_utils::builders::{PlanTaskBuilder, fast_pool_config};

type TestResult = Result<(), Box<dyn Error>>;

fn actions_map(
    entries: Vec<(&str, Arc<dyn WorkAction>)>,
) -> HashMap<String, Arc<dyn WorkAction>> {
    entries
        .into_iter()
        .map(|(id, action)| (id.to_string(), action))
        .collect()
}

/// A dependency chain executes in order, each task as its own pool item,
/// with statuses written back to the store.
#[tokio::test]
async fn chain_executes_in_dependency_order() -> TestResult {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").depends(&["1.1"]).build(),
        PlanTaskBuilder::new("1.3").depends(&["1.2"]).build(),
    ];
    let graph = TaskGraph::build(&tasks)?;
    let pool = WorkerPool::new(fast_pool_config(2))?;
    let log = new_log();

    let actions = actions_map(vec![
        ("1.1", RecordingAction::new("1.1", log.clone())),
        ("1.2", RecordingAction::new("1.2", log.clone())),
        ("1.3", RecordingAction::new("1.3", log.clone())),
    ]);

    let mut runner = DagRunner::new(graph, pool, MemoryStatusStore::new(), RunnerOptions::default());
    let report = runner.run(&actions).await?;

    assert_eq!(report.completed, vec!["1.1", "1.2", "1.3"]);
    assert!(report.failed.is_empty());
    assert!(report.blocked.is_empty());
    assert_eq!(log_entries(&log), vec!["1.1", "1.2", "1.3"]);

    for id in ["1.1", "1.2", "1.3"] {
        assert_eq!(
            runner.store().status_of(id)?,
            Some(TaskStatus::Completed)
        );
    }

    Ok(())
}

/// Independent tasks run in parallel within one batch; dependents follow.
#[tokio::test]
async fn independent_tasks_share_a_batch() -> TestResult {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").build(),
        PlanTaskBuilder::new("1.3").depends(&["1.1", "1.2"]).build(),
    ];
    let graph = TaskGraph::build(&tasks)?;
    let pool = WorkerPool::new(fast_pool_config(2))?;
    let log = new_log();

    let actions = actions_map(vec![
        ("1.1", RecordingAction::new("1.1", log.clone())),
        ("1.2", RecordingAction::new("1.2", log.clone())),
        ("1.3", RecordingAction::new("1.3", log.clone())),
    ]);

    let mut runner = DagRunner::new(graph, pool, MemoryStatusStore::new(), RunnerOptions::default());
    let report = runner.run(&actions).await?;

    assert_eq!(report.completed.len(), 3);
    // 1.3 always runs last, whatever order its prerequisites finished in.
    assert_eq!(log_entries(&log).last().map(String::as_str), Some("1.3"));

    Ok(())
}

/// A failing task leaves its dependents pending and reported as blocked.
#[tokio::test]
async fn failure_blocks_dependents() -> TestResult {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").depends(&["1.1"]).build(),
        PlanTaskBuilder::new("1.3").depends(&["1.2"]).build(),
    ];
    let graph = TaskGraph::build(&tasks)?;

    let mut config = fast_pool_config(2);
    config.max_retries = 0;
    let pool = WorkerPool::new(config)?;
    let log = new_log();

    let actions = actions_map(vec![
        ("1.1", RecordingAction::new("1.1", log.clone())),
        ("1.2", FailingAction::always_failing("1.2")),
        ("1.3", RecordingAction::new("1.3", log.clone())),
    ]);

    let mut runner = DagRunner::new(graph, pool, MemoryStatusStore::new(), RunnerOptions::default());
    let report = runner.run(&actions).await?;

    assert_eq!(report.completed, vec!["1.1"]);
    assert_eq!(report.failed, vec!["1.2"]);
    assert_eq!(report.blocked.len(), 1);
    assert_eq!(report.blocked[0].id, "1.3");
    assert_eq!(report.blocked[0].unmet[0].id, "1.2");

    assert_eq!(runner.store().status_of("1.2")?, Some(TaskStatus::Failed));
    assert_eq!(runner.store().status_of("1.3")?, None);

    Ok(())
}

/// A task without a registered action is skipped; skipping still satisfies
/// its dependents.
#[tokio::test]
async fn missing_action_is_skipped_but_unblocks_dependents() -> TestResult {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").depends(&["1.1"]).build(),
    ];
    let graph = TaskGraph::build(&tasks)?;
    let pool = WorkerPool::new(fast_pool_config(2))?;
    let log = new_log();

    let actions = actions_map(vec![("1.2", RecordingAction::new("1.2", log.clone()))]);

    let mut runner = DagRunner::new(graph, pool, MemoryStatusStore::new(), RunnerOptions::default());
    let report = runner.run(&actions).await?;

    assert_eq!(report.skipped, vec!["1.1"]);
    assert_eq!(report.completed, vec!["1.2"]);
    assert_eq!(log_entries(&log), vec!["1.2"]);

    Ok(())
}

/// Statuses recorded by the store are honoured: finished work is not
/// redone on a resumed run.
#[tokio::test]
async fn resumed_run_skips_already_completed_work() -> TestResult {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").depends(&["1.1"]).build(),
    ];
    let graph = TaskGraph::build(&tasks)?;
    let pool = WorkerPool::new(fast_pool_config(2))?;
    let log = new_log();

    let mut store = MemoryStatusStore::new();
    store.set_status("1.1", TaskStatus::Completed)?;

    let first = RecordingAction::new("1.1", log.clone());
    let actions = actions_map(vec![
        ("1.1", first.clone()),
        ("1.2", RecordingAction::new("1.2", log.clone())),
    ]);

    let mut runner = DagRunner::new(graph, pool, store, RunnerOptions::default());
    let report = runner.run(&actions).await?;

    assert_eq!(report.completed, vec!["1.2"]);
    assert_eq!(first.runs(), 0);
    assert_eq!(log_entries(&log), vec!["1.2"]);

    Ok(())
}
