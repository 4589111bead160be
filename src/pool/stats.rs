// src/pool/stats.rs

//! Cumulative pool statistics and derived health.

use crate::config::PoolConfig;

/// Counters since pool creation.
///
/// These are all-time values, not a sliding window; they are owned by the
/// pool instance and mutated only inside its completion-handling path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    /// Automatic re-submissions performed (not items retried).
    pub retried: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl PoolStats {
    fn finished(&self) -> u64 {
        self.completed + self.failed + self.timed_out
    }

    /// `failed / (completed + failed + timed_out)`, 0.0 before anything
    /// finishes.
    pub fn error_rate(&self) -> f64 {
        let finished = self.finished();
        if finished == 0 {
            0.0
        } else {
            self.failed as f64 / finished as f64
        }
    }

    /// `timed_out / (completed + failed + timed_out)`, 0.0 before anything
    /// finishes.
    pub fn timeout_rate(&self) -> f64 {
        let finished = self.finished();
        if finished == 0 {
            0.0
        } else {
            self.timed_out as f64 / finished as f64
        }
    }
}

/// Point-in-time health snapshot, published on every transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub error_rate: f64,
    pub timeout_rate: f64,
}

impl HealthStatus {
    /// Evaluate health against the configured thresholds.
    pub(crate) fn evaluate(stats: &PoolStats, config: &PoolConfig) -> Self {
        let error_rate = stats.error_rate();
        let timeout_rate = stats.timeout_rate();
        Self {
            healthy: error_rate < config.error_rate_threshold
                && timeout_rate < config.timeout_rate_threshold,
            error_rate,
            timeout_rate,
        }
    }

    pub(crate) fn pristine() -> Self {
        Self {
            healthy: true,
            error_rate: 0.0,
            timeout_rate: 0.0,
        }
    }
}
