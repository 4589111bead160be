// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Hard ceiling on `max_concurrent`, regardless of configuration.
///
/// The work units plandag schedules are external tool invocations; running
/// more than a handful at once mostly trades latency for contention.
pub const CONCURRENCY_CEILING: usize = 10;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [pool]
/// max_concurrent = 3
/// max_retries = 2
/// retry_delay_ms = 1000
///
/// [pipeline]
/// look_ahead = 2
/// enable_speculation = true
/// ```
///
/// All sections are optional and have reasonable defaults. This raw form is
/// only deserialized; semantic validation happens in
/// [`ConfigFile::try_from`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Worker pool settings from `[pool]`.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Speculative pipeline settings from `[pipeline]`.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>` (see `validate.rs`) or from
/// already-validated parts with [`ConfigFile::new_unchecked`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pool: PoolConfig,
    pub pipeline: PipelineConfig,
}

impl ConfigFile {
    /// Build a `ConfigFile` without re-running validation.
    ///
    /// Callers must only use this with parts that already passed
    /// [`crate::config::validate_config`].
    pub fn new_unchecked(pool: PoolConfig, pipeline: PipelineConfig) -> Self {
        Self { pool, pipeline }
    }
}

/// `[pool]` section: worker pool tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of work items in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Lower bound the pool is expected to sustain; kept for callers that
    /// scale `max_concurrent` dynamically between the two.
    #[serde(default = "default_min_concurrent")]
    pub min_concurrent: usize,

    /// Interval between health checks, in milliseconds.
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,

    /// Pool is unhealthy once `failed / (completed + failed + timed_out)`
    /// reaches this fraction. Computed over all-time counts.
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,

    /// Analogous threshold for the timeout rate.
    #[serde(default = "default_timeout_rate_threshold")]
    pub timeout_rate_threshold: f64,

    /// How many automatic re-submissions a failed item gets. Timeouts are
    /// never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before a failed item re-enters its queue, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Whether the pool consults the result cache before running actions.
    #[serde(default = "default_enable_cache")]
    pub enable_cache: bool,

    /// TTL for results the pool stores in the cache, in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

impl PoolConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

fn default_max_concurrent() -> usize {
    3
}

fn default_min_concurrent() -> usize {
    1
}

fn default_health_check_interval_ms() -> u64 {
    10_000
}

fn default_error_rate_threshold() -> f64 {
    0.3
}

fn default_timeout_rate_threshold() -> f64 {
    0.2
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_enable_cache() -> bool {
    true
}

fn default_cache_ttl_ms() -> u64 {
    30 * 60 * 1_000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            min_concurrent: default_min_concurrent(),
            health_check_interval_ms: default_health_check_interval_ms(),
            error_rate_threshold: default_error_rate_threshold(),
            timeout_rate_threshold: default_timeout_rate_threshold(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            enable_cache: default_enable_cache(),
            cache_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

/// `[pipeline]` section: speculative prefetch tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// How many upcoming tasks to prefetch ahead of the current one.
    #[serde(default = "default_look_ahead")]
    pub look_ahead: usize,

    /// Master switch for speculation. When off, the pipeline degrades to
    /// plain sequential submission.
    #[serde(default = "default_enable_speculation")]
    pub enable_speculation: bool,

    /// TTL for the pipeline-private cache, in milliseconds.
    ///
    /// Deliberately shorter than the pool's result cache TTL: speculative
    /// results are more likely to be invalidated by subsequent edits.
    #[serde(default = "default_speculative_cache_ttl_ms")]
    pub speculative_cache_ttl_ms: u64,
}

impl PipelineConfig {
    pub fn speculative_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.speculative_cache_ttl_ms)
    }
}

fn default_look_ahead() -> usize {
    2
}

fn default_enable_speculation() -> bool {
    true
}

fn default_speculative_cache_ttl_ms() -> u64 {
    5 * 60 * 1_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            look_ahead: default_look_ahead(),
            enable_speculation: default_enable_speculation(),
            speculative_cache_ttl_ms: default_speculative_cache_ttl_ms(),
        }
    }
}
