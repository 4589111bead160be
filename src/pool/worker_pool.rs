// src/pool/worker_pool.rs

//! The priority worker pool.
//!
//! A single mutex-guarded state block holds the queues, the active set and
//! the statistics; every transition (submit, dispatch, completion, retry,
//! cancellation) goes through it, so concurrent submitters serialize on one
//! mutation path. Actions themselves run in spawned Tokio tasks outside the
//! lock.
//!
//! A running action is never preempted or forcibly cancelled: priority only
//! decides queue position, and shutdown can merely stop *waiting* for
//! in-flight work.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use tokio::sync::{Notify, oneshot, watch};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::{PoolConfig, validate::validate_pool};
use crate::errors::{PlandagError, Result};
use crate::pool::item::{
    ActionError, WorkHandle, WorkItem, WorkOutcome, WorkSpec, WorkState,
};
use crate::pool::queues::{PriorityQueues, QueuedWork};
use crate::pool::stats::{HealthStatus, PoolStats};

/// Completed items kept for inspection before aging out.
const HISTORY_LIMIT: usize = 256;

/// Pool lifecycle state.
///
/// `Idle → Running ⇄ Paused → ShuttingDown → Shutdown`; `Shutdown` is
/// terminal and no further submissions are accepted from `ShuttingDown`
/// onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Idle,
    Running,
    Paused,
    ShuttingDown,
    Shutdown,
}

struct PoolState {
    status: PoolStatus,
    queues: PriorityQueues,
    active: HashMap<String, WorkItem>,
    history: VecDeque<WorkItem>,
    stats: PoolStats,
    /// Items sitting out a retry delay: in neither a queue nor the active
    /// set, but the pool is not drained while any exist.
    pending_retries: usize,
}

struct PoolShared {
    config: PoolConfig,
    cache: Option<Arc<CacheStore>>,
    state: Mutex<PoolState>,
    /// Signalled whenever the pool may have fully drained.
    drained: Notify,
    health_tx: watch::Sender<HealthStatus>,
}

/// Priority worker pool with bounded concurrency, retry and health
/// monitoring.
///
/// Cheap to clone; all clones share the same pool. Must be created inside
/// a Tokio runtime (the health check runs as a background task).
#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Create a pool without a result cache.
    pub fn new(config: PoolConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a pool that consults `cache` before running cacheable items.
    pub fn with_cache(config: PoolConfig, cache: Arc<CacheStore>) -> Result<Self> {
        Self::build(config, Some(cache))
    }

    fn build(config: PoolConfig, cache: Option<Arc<CacheStore>>) -> Result<Self> {
        validate_pool(&config)?;

        let (health_tx, _health_rx) = watch::channel(HealthStatus::pristine());
        let interval = config.health_check_interval();

        let shared = Arc::new(PoolShared {
            config,
            cache,
            state: Mutex::new(PoolState {
                status: PoolStatus::Idle,
                queues: PriorityQueues::new(),
                active: HashMap::new(),
                history: VecDeque::new(),
                stats: PoolStats::default(),
                pending_retries: 0,
            }),
            drained: Notify::new(),
            health_tx,
        });

        spawn_health_check(Arc::downgrade(&shared), interval);

        info!(
            max_concurrent = shared.config.max_concurrent,
            cache_enabled = shared.config.enable_cache && shared.cache.is_some(),
            "worker pool created"
        );

        Ok(Self { shared })
    }

    /// Submit a work item.
    ///
    /// Never blocks. Rejects once shutdown has begun, and rejects an id
    /// that is already queued or active. If the pool is running and a slot
    /// is free, dispatch is attempted immediately.
    pub fn submit(&self, spec: WorkSpec) -> Result<WorkHandle> {
        let (tx, rx) = oneshot::channel();
        let id = spec.id.clone();

        {
            let mut state = self.shared.state.lock().unwrap();

            match state.status {
                PoolStatus::ShuttingDown | PoolStatus::Shutdown => {
                    return Err(PlandagError::PoolShuttingDown);
                }
                PoolStatus::Idle => {
                    debug!("first submission; pool now running");
                    state.status = PoolStatus::Running;
                }
                _ => {}
            }

            if state.queues.contains(&spec.id) || state.active.contains_key(&spec.id) {
                return Err(PlandagError::DuplicateWorkItem(spec.id));
            }

            let item = WorkItem::new(spec.id.clone(), spec.priority);
            state.stats.submitted += 1;
            debug!(id = %item.id, priority = ?item.priority, "work item queued");

            state.queues.push_back(QueuedWork {
                item,
                action: spec.action,
                cache_key: spec.cache_key,
                responder: tx,
            });
        }

        dispatch_ready(&self.shared);
        Ok(WorkHandle::new(id, rx))
    }

    /// Stop dispatching new items. Items already running are untouched.
    pub fn pause(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if state.status == PoolStatus::Running {
            state.status = PoolStatus::Paused;
            info!("pool paused");
        }
    }

    /// Resume dispatch after [`pause`](Self::pause).
    pub fn resume(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if state.status == PoolStatus::Paused {
                state.status = PoolStatus::Running;
                info!("pool resumed");
            }
        }
        dispatch_ready(&self.shared);
    }

    /// Block until the queues, the active set and any retry timers are all
    /// empty, or until `timeout` elapses.
    pub async fn wait_for_completion(&self, timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            let notified = self.shared.drained.notified();
            if self.is_drained() {
                return Ok(());
            }

            match deadline {
                None => notified.await,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero()
                        || tokio::time::timeout(remaining, notified).await.is_err()
                    {
                        return Err(PlandagError::WaitTimeout);
                    }
                }
            }
        }
    }

    /// Shut the pool down.
    ///
    /// Stops accepting submissions and cancels every queued-but-not-started
    /// item immediately. With `force`, returns right away; otherwise waits
    /// for active items to reach a terminal state, up to `timeout`. If the
    /// window elapses, shutdown completes anyway — the underlying actions
    /// are not interrupted, the pool just stops waiting for them.
    pub async fn shutdown(&self, force: bool, timeout: Duration) -> Result<()> {
        let cancelled = {
            let mut state = self.shared.state.lock().unwrap();
            if state.status == PoolStatus::Shutdown {
                return Ok(());
            }
            state.status = PoolStatus::ShuttingDown;
            state.queues.drain_all()
        };

        info!(
            cancelled = cancelled.len(),
            force, "pool shutting down; queued items cancelled"
        );

        for entry in cancelled {
            cancel_entry(&self.shared, entry);
        }

        if !force {
            let deadline = Instant::now() + timeout;
            loop {
                let notified = self.shared.drained.notified();
                if self.active_count() == 0 && self.pending_retry_count() == 0 {
                    break;
                }

                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero()
                    || tokio::time::timeout(remaining, notified).await.is_err()
                {
                    warn!(
                        still_active = self.active_count(),
                        "graceful shutdown window elapsed; completing shutdown anyway"
                    );
                    break;
                }
            }
        }

        self.shared.state.lock().unwrap().status = PoolStatus::Shutdown;
        info!("pool shutdown complete");
        Ok(())
    }

    /// Current pool status.
    pub fn status(&self) -> PoolStatus {
        self.shared.state.lock().unwrap().status
    }

    /// Snapshot of the cumulative statistics.
    pub fn stats(&self) -> PoolStats {
        self.shared.state.lock().unwrap().stats
    }

    /// Health evaluated against the thresholds right now.
    pub fn health(&self) -> HealthStatus {
        let state = self.shared.state.lock().unwrap();
        HealthStatus::evaluate(&state.stats, &self.shared.config)
    }

    /// Receiver that observes health transitions published by the periodic
    /// health check.
    pub fn subscribe_health(&self) -> watch::Receiver<HealthStatus> {
        self.shared.health_tx.subscribe()
    }

    /// Number of items currently running.
    pub fn active_count(&self) -> usize {
        self.shared.state.lock().unwrap().active.len()
    }

    /// Number of items waiting in the priority queues.
    pub fn queued_count(&self) -> usize {
        self.shared.state.lock().unwrap().queues.len()
    }

    fn pending_retry_count(&self) -> usize {
        self.shared.state.lock().unwrap().pending_retries
    }

    /// Whether nothing is queued, running or sitting out a retry delay.
    pub fn is_drained(&self) -> bool {
        let state = self.shared.state.lock().unwrap();
        state.queues.is_empty() && state.active.is_empty() && state.pending_retries == 0
    }

    /// Terminal items, oldest first, bounded by an internal limit.
    pub fn history(&self) -> Vec<WorkItem> {
        self.shared
            .state
            .lock()
            .unwrap()
            .history
            .iter()
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock().unwrap();
        f.debug_struct("WorkerPool")
            .field("status", &state.status)
            .field("queued", &state.queues.len())
            .field("active", &state.active.len())
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

/// Fill free slots from the queues: pop the head of the highest non-empty
/// priority queue while capacity remains. Each dispatched item runs in its
/// own Tokio task.
fn dispatch_ready(shared: &Arc<PoolShared>) {
    loop {
        let entry = {
            let mut state = shared.state.lock().unwrap();
            if state.status != PoolStatus::Running {
                return;
            }
            if state.active.len() >= shared.config.max_concurrent {
                return;
            }
            let Some(mut entry) = state.queues.pop_next() else {
                return;
            };

            entry.item.state = WorkState::Running;
            entry.item.started_at = Some(Instant::now());
            state.active.insert(entry.item.id.clone(), entry.item.clone());
            entry
        };

        debug!(
            id = %entry.item.id,
            priority = ?entry.item.priority,
            retries = entry.item.retries,
            "dispatching work item"
        );
        tokio::spawn(execute_entry(shared.clone(), entry));
    }
}

/// Run one dispatched item to a terminal state (or back into the retry
/// path).
async fn execute_entry(shared: Arc<PoolShared>, entry: QueuedWork) {
    let wait_time = match (entry.item.queued_at, entry.item.started_at) {
        (Some(queued), Some(started)) => started.duration_since(queued),
        _ => Duration::ZERO,
    };

    // Cache lookup first: a hit skips the action entirely.
    let cache = match (&shared.cache, &entry.cache_key) {
        (Some(cache), Some(key)) if shared.config.enable_cache => Some((cache.clone(), key.clone())),
        _ => None,
    };

    if let Some((cache, key)) = &cache {
        if let Some(payload) = cache.lookup(&key.key, &key.files) {
            shared.state.lock().unwrap().stats.cache_hits += 1;
            info!(id = %entry.item.id, "result served from cache");
            complete_entry(
                &shared,
                entry,
                Terminal {
                    state: WorkState::Completed,
                    payload: Some(payload),
                    error: None,
                    from_cache: true,
                    wait_time: Duration::ZERO,
                    execution_time: Duration::ZERO,
                },
            );
            return;
        }
        shared.state.lock().unwrap().stats.cache_misses += 1;
    }

    let action = entry.action.clone();
    let execution_started = Instant::now();
    let result = action.run().await;
    let execution_time = execution_started.elapsed();

    match result {
        Ok(payload) => {
            if let Some((cache, key)) = &cache {
                cache.store(&key.key, &key.files, payload.clone(), shared.config.cache_ttl());
            }
            debug!(id = %entry.item.id, ?execution_time, "work item completed");
            complete_entry(
                &shared,
                entry,
                Terminal {
                    state: WorkState::Completed,
                    payload: Some(payload),
                    error: None,
                    from_cache: false,
                    wait_time,
                    execution_time,
                },
            );
        }
        Err(err @ ActionError::Timeout(_)) => {
            warn!(id = %entry.item.id, error = %err, "work item timed out; timeouts are never retried");
            complete_entry(
                &shared,
                entry,
                Terminal {
                    state: WorkState::TimedOut,
                    payload: None,
                    error: Some(err),
                    from_cache: false,
                    wait_time,
                    execution_time,
                },
            );
        }
        Err(err @ ActionError::Failed(_)) => {
            if entry.item.retries < shared.config.max_retries {
                schedule_retry(&shared, entry, &err);
            } else {
                warn!(
                    id = %entry.item.id,
                    error = %err,
                    attempts = entry.item.retries + 1,
                    "work item failed; retries exhausted"
                );
                complete_entry(
                    &shared,
                    entry,
                    Terminal {
                        state: WorkState::Failed,
                        payload: None,
                        error: Some(err),
                        from_cache: false,
                        wait_time,
                        execution_time,
                    },
                );
            }
        }
    }
}

struct Terminal {
    state: WorkState,
    payload: Option<String>,
    error: Option<ActionError>,
    from_cache: bool,
    wait_time: Duration,
    execution_time: Duration,
}

/// Move an item from the active set to the history, resolve the caller's
/// handle, and let the next queued item in.
fn complete_entry(shared: &Arc<PoolShared>, entry: QueuedWork, terminal: Terminal) {
    let QueuedWork {
        mut item,
        responder,
        ..
    } = entry;

    {
        let mut state = shared.state.lock().unwrap();
        state.active.remove(&item.id);

        item.state = terminal.state;
        item.completed_at = Some(Instant::now());
        item.error = terminal.error.as_ref().map(|e| e.to_string());
        item.from_cache = terminal.from_cache;

        match terminal.state {
            WorkState::Completed => state.stats.completed += 1,
            WorkState::Failed => state.stats.failed += 1,
            WorkState::TimedOut => state.stats.timed_out += 1,
            WorkState::Cancelled => state.stats.cancelled += 1,
            WorkState::Queued | WorkState::Running => {}
        }

        push_history(&mut state, item.clone());
    }

    let outcome = WorkOutcome {
        id: item.id,
        state: terminal.state,
        payload: terminal.payload,
        error: terminal.error,
        from_cache: terminal.from_cache,
        retries: item.retries,
        wait_time: terminal.wait_time,
        execution_time: terminal.execution_time,
    };

    // The caller may have dropped its handle; that is fine.
    let _ = responder.send(outcome);

    dispatch_ready(shared);
    notify_if_drained(shared);
}

/// Cancel a queued (never-started) item: terminal `Cancelled`, no dispatch.
fn cancel_entry(shared: &Arc<PoolShared>, entry: QueuedWork) {
    let QueuedWork {
        mut item,
        responder,
        ..
    } = entry;

    let wait_time = item.queued_at.map(|t| t.elapsed()).unwrap_or_default();

    {
        let mut state = shared.state.lock().unwrap();
        item.state = WorkState::Cancelled;
        item.completed_at = Some(Instant::now());
        state.stats.cancelled += 1;
        push_history(&mut state, item.clone());
    }

    debug!(id = %item.id, "queued work item cancelled");

    let outcome = WorkOutcome {
        id: item.id,
        state: WorkState::Cancelled,
        payload: None,
        error: None,
        from_cache: false,
        retries: item.retries,
        wait_time,
        execution_time: Duration::ZERO,
    };
    let _ = responder.send(outcome);

    notify_if_drained(shared);
}

/// Take a failed item out of the active set and re-queue it at the front of
/// its priority level after the configured delay.
fn schedule_retry(shared: &Arc<PoolShared>, mut entry: QueuedWork, err: &ActionError) {
    {
        let mut state = shared.state.lock().unwrap();
        state.active.remove(&entry.item.id);
        state.stats.retried += 1;
        state.pending_retries += 1;
    }

    warn!(
        id = %entry.item.id,
        error = %err,
        attempt = entry.item.retries + 1,
        max_retries = shared.config.max_retries,
        delay = ?shared.config.retry_delay(),
        "work item failed; retrying"
    );

    entry.item.reset_for_retry();

    // The freed slot should not sit idle during the delay.
    dispatch_ready(shared);

    let shared = shared.clone();
    tokio::spawn(async move {
        tokio::time::sleep(shared.config.retry_delay()).await;
        requeue_after_retry(&shared, entry);
    });
}

/// Timer callback for the retry path: feed the item back through the same
/// queue/dispatch machinery, unless shutdown started during the delay.
fn requeue_after_retry(shared: &Arc<PoolShared>, mut entry: QueuedWork) {
    {
        let mut state = shared.state.lock().unwrap();
        state.pending_retries -= 1;

        if !matches!(
            state.status,
            PoolStatus::ShuttingDown | PoolStatus::Shutdown
        ) {
            entry.item.queued_at = Some(Instant::now());
            debug!(
                id = %entry.item.id,
                retries = entry.item.retries,
                "retried item re-queued at the front of its priority"
            );
            state.queues.push_front(entry);
            drop(state);
            dispatch_ready(shared);
            return;
        }
    }

    debug!(id = %entry.item.id, "pool shut down during retry delay; cancelling item");
    cancel_entry(shared, entry);
}

fn push_history(state: &mut PoolState, item: WorkItem) {
    state.history.push_back(item);
    while state.history.len() > HISTORY_LIMIT {
        state.history.pop_front();
    }
}

fn notify_if_drained(shared: &Arc<PoolShared>) {
    let state = shared.state.lock().unwrap();
    if state.queues.is_empty() && state.active.is_empty() && state.pending_retries == 0 {
        shared.drained.notify_waiters();
    }
}

/// Periodic health check: evaluates the cumulative error and timeout rates
/// and publishes transitions on the watch channel. Holds only a weak
/// reference so an abandoned pool can be dropped.
fn spawn_health_check(shared: Weak<PoolShared>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let Some(shared) = shared.upgrade() else {
                break;
            };

            let (status, health) = {
                let state = shared.state.lock().unwrap();
                (
                    state.status,
                    HealthStatus::evaluate(&state.stats, &shared.config),
                )
            };

            if status == PoolStatus::Shutdown {
                break;
            }

            let previous = *shared.health_tx.borrow();
            if health.healthy != previous.healthy {
                if health.healthy {
                    info!(
                        error_rate = health.error_rate,
                        timeout_rate = health.timeout_rate,
                        "pool healthy again"
                    );
                } else {
                    warn!(
                        error_rate = health.error_rate,
                        timeout_rate = health.timeout_rate,
                        "pool unhealthy"
                    );
                }
            }
            if health != previous {
                let _ = shared.health_tx.send(health);
            }
        }
    });
}
