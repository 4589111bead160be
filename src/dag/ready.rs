// src/dag/ready.rs

//! Readiness and blocked-task queries over the dependency graph.

use tracing::debug;

use crate::dag::graph::{TaskGraph, TaskNode};
use crate::types::TaskStatus;

/// Options for [`TaskGraph::ready_tasks`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadyOptions {
    /// Bypass the dependency check entirely.
    pub ignore_deps: bool,
    /// Only return tasks from the single earliest phase present among the
    /// ready set (strict phase gating).
    pub phase_priority: bool,
}

/// One unmet dependency of a blocked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetDependency {
    pub id: String,
    pub status: TaskStatus,
}

/// Diagnostic record for a pending task that cannot run yet.
#[derive(Debug, Clone)]
pub struct BlockedTask {
    pub id: String,
    pub unmet: Vec<UnmetDependency>,
}

impl TaskGraph {
    /// Ids of tasks that are currently eligible to run, capped at
    /// `max_count`.
    ///
    /// A task is ready iff it is pending and every dependency is completed
    /// or skipped (`ignore_deps` bypasses the check). A task with zero
    /// declared dependencies in a phase that has a registered
    /// pipeline-start trigger is gated on that trigger instead, which lets
    /// a later phase begin before an earlier one fully finishes.
    ///
    /// Results are sorted by phase number ascending, then task number; with
    /// `phase_priority`, only the earliest phase present survives.
    pub fn ready_tasks(&self, max_count: usize, options: ReadyOptions) -> Vec<String> {
        let mut ready: Vec<&TaskNode> = self
            .order()
            .iter()
            .filter_map(|id| {
                let node = &self.nodes()[id];
                if self.is_ready(node, options) {
                    Some(node)
                } else {
                    None
                }
            })
            .collect();

        ready.sort_by_key(|node| node.numeric_id);

        if options.phase_priority {
            if let Some(earliest) = ready.first().map(|node| node.phase) {
                ready.retain(|node| node.phase == earliest);
            }
        }

        let ids: Vec<String> = ready
            .into_iter()
            .take(max_count)
            .map(|node| node.id.clone())
            .collect();

        debug!(count = ids.len(), ?options, "readiness query");
        ids
    }

    /// Every pending task with unmet dependencies, with the specific
    /// dependency ids and their current status. Diagnostics only.
    pub fn blocked_tasks(&self) -> Vec<BlockedTask> {
        let mut blocked = Vec::new();

        for id in self.order() {
            let node = &self.nodes()[id];
            if node.status != TaskStatus::Pending {
                continue;
            }

            let unmet: Vec<UnmetDependency> = node
                .dependencies
                .iter()
                .filter_map(|dep| {
                    let status = self.status_of(dep)?;
                    if status.satisfies_dependency() {
                        None
                    } else {
                        Some(UnmetDependency {
                            id: dep.clone(),
                            status,
                        })
                    }
                })
                .collect();

            if !unmet.is_empty() {
                blocked.push(BlockedTask {
                    id: node.id.clone(),
                    unmet,
                });
            }
        }

        blocked
    }

    fn is_ready(&self, node: &TaskNode, options: ReadyOptions) -> bool {
        if node.status != TaskStatus::Pending {
            return false;
        }

        if options.ignore_deps {
            return true;
        }

        if node.dependencies.is_empty() {
            // Zero-dependency tasks of a trigger-registered phase wait for
            // the trigger task instead.
            if let Some(trigger) = self.phase_trigger(node.phase) {
                return self
                    .status_of(trigger)
                    .is_some_and(|status| status.satisfies_dependency());
            }
            return true;
        }

        node.dependencies.iter().all(|dep| {
            self.status_of(dep)
                .is_some_and(|status| status.satisfies_dependency())
        })
    }
}
