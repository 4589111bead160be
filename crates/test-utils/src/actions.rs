//! Fake [`WorkAction`] implementations for tests.
//!
//! These play the role the external tool invoker plays in production:
//! completing instantly, failing a configured number of times, signalling
//! timeouts, or blocking until the test releases them.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use plandag::pool::{ActionError, ActionResult, WorkAction};

/// Shared execution log, recording labels in the order actions started.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn log_entries(log: &ExecutionLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Completes immediately, appending its label to a shared log on each run.
pub struct RecordingAction {
    label: String,
    log: ExecutionLog,
    runs: AtomicUsize,
}

impl RecordingAction {
    pub fn new(label: &str, log: ExecutionLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            log,
            runs: AtomicUsize::new(0),
        })
    }

    /// How many times the pool invoked this action.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl WorkAction for RecordingAction {
    fn run(&self) -> Pin<Box<dyn Future<Output = ActionResult> + Send + '_>> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.label.clone());
            Ok(format!("output of {}", self.label))
        })
    }
}

/// Fails with [`ActionError::Failed`] for the first `failures` runs, then
/// completes. `failures == usize::MAX` means it never succeeds.
pub struct FailingAction {
    label: String,
    failures: usize,
    log: Option<ExecutionLog>,
    runs: AtomicUsize,
}

impl FailingAction {
    pub fn new(label: &str, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            failures,
            log: None,
            runs: AtomicUsize::new(0),
        })
    }

    /// Like [`new`](Self::new), but also appending to a shared log on each
    /// run, for order assertions.
    pub fn with_log(label: &str, failures: usize, log: ExecutionLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            failures,
            log: Some(log),
            runs: AtomicUsize::new(0),
        })
    }

    pub fn always_failing(label: &str) -> Arc<Self> {
        Self::new(label, usize::MAX)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl WorkAction for FailingAction {
    fn run(&self) -> Pin<Box<dyn Future<Output = ActionResult> + Send + '_>> {
        Box::pin(async move {
            let attempt = self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = &self.log {
                log.lock().unwrap().push(self.label.clone());
            }
            if attempt < self.failures {
                Err(ActionError::Failed(format!(
                    "{} failed on attempt {}",
                    self.label,
                    attempt + 1
                )))
            } else {
                Ok(format!("output of {}", self.label))
            }
        })
    }
}

/// Always reports [`ActionError::Timeout`].
pub struct TimeoutAction {
    label: String,
    runs: AtomicUsize,
}

impl TimeoutAction {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            runs: AtomicUsize::new(0),
        })
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl WorkAction for TimeoutAction {
    fn run(&self) -> Pin<Box<dyn Future<Output = ActionResult> + Send + '_>> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Err(ActionError::Timeout(format!("{} timed out", self.label)))
        })
    }
}

/// Blocks until the test releases it, so tests can control exactly when a
/// "running" item completes.
///
/// Releases are buffered: calling [`release`](Self::release) before the
/// action starts still lets it through.
pub struct GatedAction {
    label: String,
    log: ExecutionLog,
    started: Arc<Notify>,
    release: Arc<Notify>,
    runs: AtomicUsize,
}

impl GatedAction {
    pub fn new(label: &str, log: ExecutionLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            log,
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
            runs: AtomicUsize::new(0),
        })
    }

    /// Allow the action to complete.
    pub fn release(&self) {
        self.release.notify_one();
    }

    /// Wait until the pool has actually started this action.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl WorkAction for GatedAction {
    fn run(&self) -> Pin<Box<dyn Future<Output = ActionResult> + Send + '_>> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.label.clone());
            self.started.notify_one();
            self.release.notified().await;
            Ok(format!("output of {}", self.label))
        })
    }
}

/// Sleeps for a fixed duration, then completes.
pub struct SleepAction {
    label: String,
    duration: Duration,
    runs: AtomicUsize,
}

impl SleepAction {
    pub fn new(label: &str, duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            duration,
            runs: AtomicUsize::new(0),
        })
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl WorkAction for SleepAction {
    fn run(&self) -> Pin<Box<dyn Future<Output = ActionResult> + Send + '_>> {
        Box::pin(async move {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.duration).await;
            Ok(format!("output of {}", self.label))
        })
    }
}
