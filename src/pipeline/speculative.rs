// src/pipeline/speculative.rs

//! The speculative prefetch pipeline.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::cache::{CacheStore, derive_cache_key};
use crate::config::{PipelineConfig, PoolConfig};
use crate::errors::Result;
use crate::pipeline::metrics::PipelineMetrics;
use crate::pool::{CacheKey, WorkAction, WorkSpec, WorkerPool};
use crate::types::Priority;

/// One step of the ordered task list the pipeline walks.
///
/// The cache key is derived from the template, its variables and the input
/// file set; the files double as the freshness-validation set, so an edit
/// to any of them invalidates the speculative result.
pub struct PipelineStep {
    pub id: String,
    pub action: Arc<dyn WorkAction>,
    pub template: String,
    pub variables: Vec<(String, String)>,
    pub input_files: Vec<PathBuf>,
}

impl PipelineStep {
    pub fn new(id: impl Into<String>, action: Arc<dyn WorkAction>) -> Self {
        Self {
            id: id.into(),
            action,
            template: String::new(),
            variables: Vec::new(),
            input_files: Vec::new(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_variables(mut self, variables: Vec<(String, String)>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_input_files(mut self, input_files: Vec<PathBuf>) -> Self {
        self.input_files = input_files;
        self
    }

    fn cache_key(&self) -> CacheKey {
        let key = derive_cache_key(&self.template, &self.variables, &self.input_files);
        CacheKey::new(key).with_files(self.input_files.clone())
    }
}

/// Prefetch progress for one task, preventing duplicate speculative work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchState {
    Pending,
    Prefetching,
    Prefetched,
}

/// Pipeline that executes an ordered task list with low-priority
/// look-ahead.
///
/// Owns its pool instance and a pipeline-private [`CacheStore`] with the
/// (shorter) speculative TTL, so the general-purpose result cache and the
/// speculative one never share a freshness policy.
pub struct SpeculativePipeline {
    pool: WorkerPool,
    cache: Arc<CacheStore>,
    config: PipelineConfig,
    prefetch: Arc<Mutex<HashMap<String, PrefetchState>>>,
    /// Derived cache key per task id, for targeted invalidation.
    keys_by_task: Mutex<HashMap<String, String>>,
}

impl SpeculativePipeline {
    /// Build a pipeline with its own worker pool wired to a private cache.
    ///
    /// The pool inherits `pool_config` except for the cache TTL, which is
    /// replaced by the speculative TTL.
    pub fn new(pool_config: PoolConfig, config: PipelineConfig) -> Result<Self> {
        let cache = Arc::new(CacheStore::new());

        let mut pool_config = pool_config;
        pool_config.cache_ttl_ms = config.speculative_cache_ttl_ms;
        let pool = WorkerPool::with_cache(pool_config, cache.clone())?;

        Ok(Self {
            pool,
            cache,
            config,
            prefetch: Arc::new(Mutex::new(HashMap::new())),
            keys_by_task: Mutex::new(HashMap::new()),
        })
    }

    /// The pipeline's pool, for shutdown and stats.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Current prefetch state of a task.
    pub fn prefetch_state(&self, id: &str) -> PrefetchState {
        self.prefetch
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(PrefetchState::Pending)
    }

    /// Execute the steps in order, prefetching up to `look_ahead` upcoming
    /// steps before each one. Returns this run's metrics.
    pub async fn run(&self, steps: &[PipelineStep]) -> Result<PipelineMetrics> {
        let mut metrics = PipelineMetrics::default();

        info!(
            steps = steps.len(),
            look_ahead = self.config.look_ahead,
            speculation = self.config.enable_speculation,
            "pipeline run started"
        );

        for (index, step) in steps.iter().enumerate() {
            if self.config.enable_speculation {
                let end = (index + 1 + self.config.look_ahead).min(steps.len());
                for upcoming in &steps[index + 1..end] {
                    self.maybe_prefetch(upcoming);
                }
            }

            let key = self.remembered_cache_key(step);
            let spec = WorkSpec::new(step.id.clone(), Priority::Normal, step.action.clone())
                .with_cache_key(key);

            let outcome = self.pool.submit(spec)?.wait().await?;

            debug!(
                task = %step.id,
                from_cache = outcome.from_cache,
                state = ?outcome.state,
                "pipeline step finished"
            );

            if outcome.is_success() {
                self.prefetch
                    .lock()
                    .unwrap()
                    .insert(step.id.clone(), PrefetchState::Prefetched);
            }

            metrics.record(&outcome);
        }

        info!(
            completed = metrics.completed,
            failed = metrics.failed,
            cache_hits = metrics.cache_hits,
            estimated_saved = ?metrics.estimated_time_saved(),
            "pipeline run finished"
        );

        Ok(metrics)
    }

    /// Drop cached results: one task's entry, or the whole private cache.
    ///
    /// Used when upstream inputs are known to have changed.
    pub fn invalidate_cache(&self, task_id: Option<&str>) {
        match task_id {
            Some(id) => {
                if let Some(key) = self.keys_by_task.lock().unwrap().get(id) {
                    self.cache.remove(key);
                }
                self.prefetch
                    .lock()
                    .unwrap()
                    .insert(id.to_string(), PrefetchState::Pending);
                debug!(task = %id, "speculative cache invalidated for task");
            }
            None => {
                self.cache.clear();
                self.prefetch.lock().unwrap().clear();
                debug!("speculative cache invalidated entirely");
            }
        }
    }

    /// Submit a low-priority speculative execution for `step`, unless its
    /// cache is already fresh or a prefetch is in flight or done.
    fn maybe_prefetch(&self, step: &PipelineStep) {
        let key = self.remembered_cache_key(step);

        {
            let mut states = self.prefetch.lock().unwrap();
            match states.get(&step.id) {
                Some(PrefetchState::Prefetching) | Some(PrefetchState::Prefetched) => return,
                _ => {}
            }

            if self.cache.lookup(&key.key, &key.files).is_some() {
                debug!(task = %step.id, "cache already fresh; prefetch skipped");
                states.insert(step.id.clone(), PrefetchState::Prefetched);
                return;
            }

            states.insert(step.id.clone(), PrefetchState::Prefetching);
        }

        // Distinct work id so the later main-line submission is not a
        // duplicate while the prefetch is still queued or running.
        let spec = WorkSpec::new(
            format!("{}::prefetch", step.id),
            Priority::Low,
            step.action.clone(),
        )
        .with_cache_key(key);

        match self.pool.submit(spec) {
            Ok(handle) => {
                debug!(task = %step.id, "prefetch submitted");
                let states = Arc::clone(&self.prefetch);
                let id = step.id.clone();
                tokio::spawn(async move {
                    let next = match handle.wait().await {
                        Ok(outcome) if outcome.is_success() => PrefetchState::Prefetched,
                        _ => PrefetchState::Pending,
                    };
                    states.lock().unwrap().insert(id, next);
                });
            }
            Err(err) => {
                warn!(task = %step.id, error = %err, "prefetch submission rejected");
                self.prefetch
                    .lock()
                    .unwrap()
                    .insert(step.id.clone(), PrefetchState::Pending);
            }
        }
    }

    fn remembered_cache_key(&self, step: &PipelineStep) -> CacheKey {
        let key = step.cache_key();
        self.keys_by_task
            .lock()
            .unwrap()
            .insert(step.id.clone(), key.key.clone());
        key
    }
}
