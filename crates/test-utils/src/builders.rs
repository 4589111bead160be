#![allow(dead_code)]

use plandag::config::{PipelineConfig, PoolConfig};
use plandag::dag::PlanTask;

/// Builder for [`PlanTask`] to simplify test setup.
///
/// The phase number is derived from the `phase.task` id, matching what the
/// plan parser would report.
pub struct PlanTaskBuilder {
    task: PlanTask,
}

impl PlanTaskBuilder {
    pub fn new(id: &str) -> Self {
        let phase = id
            .split('.')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);

        Self {
            task: PlanTask::new(id, phase, format!("task {id}")),
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.task.description = description.to_string();
        self
    }

    /// Pre-extracted dependency ids (bypassing description parsing).
    pub fn depends(mut self, deps: &[&str]) -> Self {
        self.task.depends = Some(deps.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn build(self) -> PlanTask {
        self.task
    }
}

/// Pool configuration tuned for fast tests: short retry delay and health
/// interval, small concurrency.
pub fn fast_pool_config(max_concurrent: usize) -> PoolConfig {
    PoolConfig {
        max_concurrent,
        min_concurrent: 1,
        health_check_interval_ms: 50,
        retry_delay_ms: 10,
        ..PoolConfig::default()
    }
}

/// Pipeline configuration tuned for fast tests.
pub fn fast_pipeline_config(look_ahead: usize) -> PipelineConfig {
    PipelineConfig {
        look_ahead,
        enable_speculation: true,
        speculative_cache_ttl_ms: 60_000,
    }
}
