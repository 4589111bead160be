// src/engine/runner.rs

//! Batch-wise dependency-aware driver over the graph and the pool.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::{BlockedTask, ReadyOptions, TaskGraph};
use crate::errors::Result;
use crate::pool::{WorkAction, WorkSpec, WorkerPool};
use crate::status::StatusStore;
use crate::types::{Priority, TaskStatus};

/// Options for a [`DagRunner`] run.
#[derive(Debug, Clone, Copy)]
pub struct RunnerOptions {
    /// Maximum number of ready tasks submitted per round.
    pub batch_size: usize,
    /// Restrict each round to the earliest phase with ready tasks.
    pub phase_priority: bool,
    /// Bypass dependency checks entirely (rerun-everything scenarios).
    pub ignore_deps: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            batch_size: 8,
            phase_priority: false,
            ignore_deps: false,
        }
    }
}

/// Outcome summary of one driver run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    /// Pending tasks that could not run because a dependency never reached
    /// a satisfying status (typically downstream of a failure).
    pub blocked: Vec<BlockedTask>,
}

/// Drives a task graph to completion through the worker pool.
///
/// Each round: query the graph for the next batch of ready task ids,
/// submit each as its own pool work item at normal priority, await the
/// batch, and record terminal statuses in both the graph and the status
/// store. Rounds repeat until no task is ready; whatever is still pending
/// is reported as blocked.
pub struct DagRunner<S: StatusStore> {
    graph: TaskGraph,
    pool: WorkerPool,
    store: S,
    options: RunnerOptions,
}

impl<S: StatusStore> DagRunner<S> {
    pub fn new(graph: TaskGraph, pool: WorkerPool, store: S, options: RunnerOptions) -> Self {
        Self {
            graph,
            pool,
            store,
            options,
        }
    }

    /// Read-only view of the graph (statuses included).
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// The status store, e.g. for inspecting results after a run.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute every runnable task, using `actions` to look up the work
    /// for each task id.
    ///
    /// Tasks without a registered action are marked skipped (their
    /// dependents may still run). Failed tasks keep their dependents
    /// pending; those are reported as blocked rather than silently
    /// dropped.
    pub async fn run(&mut self, actions: &HashMap<String, Arc<dyn WorkAction>>) -> Result<RunReport> {
        self.seed_from_store()?;

        let mut report = RunReport::default();
        let ready_options = ReadyOptions {
            ignore_deps: self.options.ignore_deps,
            phase_priority: self.options.phase_priority,
        };

        loop {
            let ready = self.graph.ready_tasks(self.options.batch_size, ready_options);
            if ready.is_empty() {
                break;
            }

            debug!(batch = ready.len(), "submitting ready batch");

            let mut handles = Vec::new();
            for id in ready {
                let Some(action) = actions.get(&id) else {
                    warn!(task = %id, "no action registered for task; marking skipped");
                    self.record_status(&id, TaskStatus::Skipped)?;
                    report.skipped.push(id);
                    continue;
                };

                self.record_status(&id, TaskStatus::InProgress)?;
                let spec = WorkSpec::new(id.clone(), Priority::Normal, Arc::clone(action));
                handles.push(self.pool.submit(spec)?);
            }

            for handle in handles {
                let outcome = handle.wait().await?;
                if outcome.is_success() {
                    self.record_status(&outcome.id, TaskStatus::Completed)?;
                    report.completed.push(outcome.id);
                } else {
                    warn!(
                        task = %outcome.id,
                        state = ?outcome.state,
                        error = ?outcome.error,
                        "task reached a failing terminal state"
                    );
                    self.record_status(&outcome.id, TaskStatus::Failed)?;
                    report.failed.push(outcome.id);
                }
            }
        }

        report.blocked = self.graph.blocked_tasks();
        if !report.blocked.is_empty() {
            warn!(
                blocked = report.blocked.len(),
                "run finished with tasks blocked by unmet dependencies"
            );
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            blocked = report.blocked.len(),
            "dag run finished"
        );

        Ok(report)
    }

    /// Mirror statuses recorded by the store into the graph, so a resumed
    /// plan does not redo finished work.
    fn seed_from_store(&mut self) -> Result<()> {
        for (id, status) in self.store.statuses()? {
            if self.graph.status_of(&id).is_some() {
                self.graph.set_status(&id, status)?;
            }
        }
        Ok(())
    }

    fn record_status(&mut self, id: &str, status: TaskStatus) -> Result<()> {
        self.store.set_status(id, status)?;
        self.graph.set_status(id, status)
    }
}
