// src/pipeline/metrics.rs

//! Per-run pipeline metrics.

use std::time::Duration;

use crate::pool::WorkOutcome;

/// Timing breakdown for one executed task.
///
/// `wait_time` is the time the pool took before invoking the action (zero
/// on a cache hit), `execution_time` is the action itself, and
/// `total_time` is their sum.
#[derive(Debug, Clone)]
pub struct TaskTiming {
    pub id: String,
    pub wait_time: Duration,
    pub execution_time: Duration,
    pub total_time: Duration,
    pub from_cache: bool,
}

/// Aggregate metrics for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    pub total_tasks: usize,
    pub completed: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub per_task: Vec<TaskTiming>,
    /// Sum and count of non-cached execution times, feeding the running
    /// average behind [`estimated_time_saved`](Self::estimated_time_saved).
    executed_total: Duration,
    executed_count: u32,
}

impl PipelineMetrics {
    /// Fold one terminal work outcome into the aggregate.
    pub fn record(&mut self, outcome: &WorkOutcome) {
        self.total_tasks += 1;

        if outcome.is_success() {
            self.completed += 1;
        } else {
            self.failed += 1;
        }

        if outcome.from_cache {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
            if outcome.is_success() {
                self.executed_total += outcome.execution_time;
                self.executed_count += 1;
            }
        }

        self.per_task.push(TaskTiming {
            id: outcome.id.clone(),
            wait_time: outcome.wait_time,
            execution_time: outcome.execution_time,
            total_time: outcome.total_time(),
            from_cache: outcome.from_cache,
        });
    }

    /// Running average execution time of tasks that actually ran.
    pub fn average_execution_time(&self) -> Duration {
        if self.executed_count == 0 {
            Duration::ZERO
        } else {
            self.executed_total / self.executed_count
        }
    }

    /// Estimate of the time speculation saved: the running average
    /// non-cached execution time multiplied by the cache-hit count.
    ///
    /// An estimate, not a measurement — there is no ground truth for what
    /// a skipped execution would have cost.
    pub fn estimated_time_saved(&self) -> Duration {
        self.average_execution_time() * self.cache_hits as u32
    }
}
