// src/pool/item.rs

//! Work items, actions and outcomes.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::errors::PlandagError;
use crate::types::Priority;

/// Canonical work item id type used throughout the pool.
pub type WorkId = String;

/// Result of running a [`WorkAction`]: a payload, or an error that
/// distinguishes a timeout from any other failure.
pub type ActionResult = std::result::Result<String, ActionError>;

/// Error reported by a work action.
///
/// The pool enforces no timeout of its own; `Timeout` is a signal the
/// action itself must report. Timeouts are terminal immediately, other
/// failures go through the retry path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("action timed out: {0}")]
    Timeout(String),

    #[error("action failed: {0}")]
    Failed(String),
}

/// Trait abstracting the actual work a pool item performs.
///
/// Production code wraps external tool invocations; tests provide fakes
/// that complete instantly or on command. The pool never needs to know
/// what kind of work it runs.
pub trait WorkAction: Send + Sync {
    /// Run the work to completion.
    ///
    /// The pool may call this more than once for the same item (retries),
    /// so implementations must be re-runnable.
    fn run(&self) -> Pin<Box<dyn Future<Output = ActionResult> + Send + '_>>;
}

/// Cache coordinates for a work item: an opaque key plus the files whose
/// modification times decide the cached value's freshness.
#[derive(Debug, Clone)]
pub struct CacheKey {
    pub key: String,
    pub files: Vec<PathBuf>,
}

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }
}

/// What a caller hands to [`crate::pool::WorkerPool::submit`].
pub struct WorkSpec {
    pub id: WorkId,
    pub priority: Priority,
    pub action: Arc<dyn WorkAction>,
    pub cache_key: Option<CacheKey>,
}

impl WorkSpec {
    pub fn new(id: impl Into<WorkId>, priority: Priority, action: Arc<dyn WorkAction>) -> Self {
        Self {
            id: id.into(),
            priority,
            action,
            cache_key: None,
        }
    }

    pub fn with_cache_key(mut self, cache_key: CacheKey) -> Self {
        self.cache_key = Some(cache_key);
        self
    }
}

/// Lifecycle state of a work item.
///
/// `Queued → Running → {Completed, Failed, TimedOut, Cancelled}`. Terminal
/// states never transition further; the retry path re-enters `Queued` with
/// cleared timestamps instead of reviving a terminal item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkState {
    Queued,
    Running,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl WorkState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, WorkState::Queued | WorkState::Running)
    }
}

/// Bookkeeping record for one submitted item.
///
/// This is what queues, the active set and the completion history hold;
/// the action itself travels separately so the record stays cloneable.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: WorkId,
    pub priority: Priority,
    pub state: WorkState,
    /// Automatic re-submissions attempted so far.
    pub retries: u32,
    pub queued_at: Option<Instant>,
    pub started_at: Option<Instant>,
    pub completed_at: Option<Instant>,
    pub error: Option<String>,
    pub from_cache: bool,
}

impl WorkItem {
    pub(crate) fn new(id: WorkId, priority: Priority) -> Self {
        Self {
            id,
            priority,
            state: WorkState::Queued,
            retries: 0,
            queued_at: Some(Instant::now()),
            started_at: None,
            completed_at: None,
            error: None,
            from_cache: false,
        }
    }

    /// Reset for the retry path: back to `Queued` with cleared timestamps.
    pub(crate) fn reset_for_retry(&mut self) {
        self.state = WorkState::Queued;
        self.retries += 1;
        self.queued_at = None;
        self.started_at = None;
        self.completed_at = None;
        self.error = None;
    }
}

/// Terminal outcome delivered to the submitting caller.
#[derive(Debug, Clone)]
pub struct WorkOutcome {
    pub id: WorkId,
    pub state: WorkState,
    pub payload: Option<String>,
    pub error: Option<ActionError>,
    pub from_cache: bool,
    pub retries: u32,
    /// Time the pool took before invoking the action. Zero on a cache hit.
    pub wait_time: Duration,
    /// Time the action itself ran. Zero on a cache hit.
    pub execution_time: Duration,
}

impl WorkOutcome {
    pub fn total_time(&self) -> Duration {
        self.wait_time + self.execution_time
    }

    pub fn is_success(&self) -> bool {
        self.state == WorkState::Completed
    }
}

/// Caller-side handle for one submission.
///
/// Each work item gets its own completion channel; the caller awaits the
/// terminal outcome through it.
#[derive(Debug)]
pub struct WorkHandle {
    pub id: WorkId,
    rx: oneshot::Receiver<WorkOutcome>,
}

impl WorkHandle {
    pub(crate) fn new(id: WorkId, rx: oneshot::Receiver<WorkOutcome>) -> Self {
        Self { id, rx }
    }

    /// Wait for the item to reach a terminal state.
    pub async fn wait(self) -> crate::errors::Result<WorkOutcome> {
        self.rx.await.map_err(|_| {
            PlandagError::Other(anyhow::anyhow!(
                "pool dropped the completion channel for work item"
            ))
        })
    }
}
