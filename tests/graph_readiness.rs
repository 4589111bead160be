// tests/graph_readiness.rs

mod common;
use crate::common::init_tracing;

use plandag::dag::{PhaseAnnotation, ReadyOptions, TaskGraph};
use plandag::types::TaskStatus;
use plandag_test_utils::builders::PlanTaskBuilder;

fn ready_all(graph: &TaskGraph, options: ReadyOptions) -> Vec<String> {
    graph.ready_tasks(graph.len(), options)
}

/// The pipeline-start scenario: after `1.1` completes, both its dependent
/// `1.2` and the trigger-gated `2.1` become ready, in phase order.
#[test]
fn dependent_and_triggered_phase_become_ready_together() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").depends(&["1.1"]).build(),
        PlanTaskBuilder::new("2.1").build(),
    ];

    let mut graph = TaskGraph::build(&tasks).unwrap();
    graph.register_phase_trigger(2, "1.1").unwrap();

    // Before 1.1 completes: only 1.1 itself is eligible.
    assert_eq!(ready_all(&graph, ReadyOptions::default()), vec!["1.1"]);

    graph.set_status("1.1", TaskStatus::Completed).unwrap();
    assert_eq!(
        ready_all(&graph, ReadyOptions::default()),
        vec!["1.2", "2.1"]
    );
}

/// A skipped trigger also opens its gated phase.
#[test]
fn skipped_trigger_satisfies_the_gate() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("2.1").build(),
    ];

    let mut graph = TaskGraph::build(&tasks).unwrap();
    graph.register_phase_trigger(2, "1.1").unwrap();

    graph.set_status("1.1", TaskStatus::Skipped).unwrap();
    assert_eq!(ready_all(&graph, ReadyOptions::default()), vec!["2.1"]);
}

/// Without a trigger, zero-dependency tasks of any phase are ready
/// immediately (cross-phase readiness).
#[test]
fn cross_phase_readiness_without_triggers() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("2.1").build(),
        PlanTaskBuilder::new("3.1").build(),
    ];

    let graph = TaskGraph::build(&tasks).unwrap();
    assert_eq!(
        ready_all(&graph, ReadyOptions::default()),
        vec!["1.1", "2.1", "3.1"]
    );
}

/// `phase_priority` restricts the result to the earliest phase present.
#[test]
fn phase_priority_gates_to_earliest_phase() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").build(),
        PlanTaskBuilder::new("2.1").build(),
    ];

    let graph = TaskGraph::build(&tasks).unwrap();
    let options = ReadyOptions {
        phase_priority: true,
        ..ReadyOptions::default()
    };
    assert_eq!(ready_all(&graph, options), vec!["1.1", "1.2"]);
}

/// Task numbers sort numerically, not lexically: 1.10 comes after 1.2.
#[test]
fn ordering_is_numeric_within_a_phase() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.10").build(),
        PlanTaskBuilder::new("1.2").build(),
        PlanTaskBuilder::new("1.1").build(),
    ];

    let graph = TaskGraph::build(&tasks).unwrap();
    assert_eq!(
        ready_all(&graph, ReadyOptions::default()),
        vec!["1.1", "1.2", "1.10"]
    );
}

#[test]
fn max_count_caps_the_result() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").build(),
        PlanTaskBuilder::new("1.3").build(),
    ];

    let graph = TaskGraph::build(&tasks).unwrap();
    assert_eq!(
        graph.ready_tasks(2, ReadyOptions::default()),
        vec!["1.1", "1.2"]
    );
}

/// `ignore_deps` bypasses the dependency check entirely.
#[test]
fn ignore_deps_returns_all_pending_tasks() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").depends(&["1.1"]).build(),
    ];

    let graph = TaskGraph::build(&tasks).unwrap();
    let options = ReadyOptions {
        ignore_deps: true,
        ..ReadyOptions::default()
    };
    assert_eq!(ready_all(&graph, options), vec!["1.1", "1.2"]);
}

/// A skipped dependency satisfies its edge; a failed one does not.
#[test]
fn skipped_satisfies_and_failed_blocks() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").build(),
        PlanTaskBuilder::new("1.3").depends(&["1.1"]).build(),
        PlanTaskBuilder::new("1.4").depends(&["1.2"]).build(),
    ];

    let mut graph = TaskGraph::build(&tasks).unwrap();
    graph.set_status("1.1", TaskStatus::Skipped).unwrap();
    graph.set_status("1.2", TaskStatus::Failed).unwrap();

    assert_eq!(ready_all(&graph, ReadyOptions::default()), vec!["1.3"]);
}

/// Blocked-task diagnostics name the unmet dependencies and their status.
#[test]
fn blocked_tasks_report_unmet_dependencies() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").build(),
        PlanTaskBuilder::new("1.3").depends(&["1.1", "1.2"]).build(),
    ];

    let mut graph = TaskGraph::build(&tasks).unwrap();
    graph.set_status("1.1", TaskStatus::Completed).unwrap();
    graph.set_status("1.2", TaskStatus::Failed).unwrap();

    let blocked = graph.blocked_tasks();
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].id, "1.3");
    assert_eq!(blocked[0].unmet.len(), 1);
    assert_eq!(blocked[0].unmet[0].id, "1.2");
    assert_eq!(blocked[0].unmet[0].status, TaskStatus::Failed);
}

/// In-progress and terminal tasks are never returned as ready.
#[test]
fn non_pending_tasks_are_never_ready() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1").build(),
        PlanTaskBuilder::new("1.2").build(),
        PlanTaskBuilder::new("1.3").build(),
    ];

    let mut graph = TaskGraph::build(&tasks).unwrap();
    graph.set_status("1.1", TaskStatus::InProgress).unwrap();
    graph.set_status("1.2", TaskStatus::Completed).unwrap();

    assert_eq!(ready_all(&graph, ReadyOptions::default()), vec!["1.3"]);
}

/// Phase annotations are parsed as advisory metadata and do not change
/// readiness.
#[test]
fn phase_annotations_are_advisory_only() {
    init_tracing();

    let tasks = vec![
        PlanTaskBuilder::new("1.1")
            .describe("[SEQUENTIAL] migrate the schema")
            .build(),
        PlanTaskBuilder::new("1.2")
            .describe("[SEQUENTIAL] backfill the data")
            .build(),
    ];

    let graph = TaskGraph::build(&tasks).unwrap();
    assert_eq!(
        graph.node("1.1").unwrap().annotation,
        Some(PhaseAnnotation::Sequential)
    );

    // Both are returned ready despite the sequential annotation: callers
    // that want enforcement must do it themselves.
    assert_eq!(
        ready_all(&graph, ReadyOptions::default()),
        vec!["1.1", "1.2"]
    );
}
