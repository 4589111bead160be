// src/pool/queues.rs

//! Priority queues for pending work.
//!
//! Three FIFO queues, one per priority level. Dispatch pops the head of
//! the highest non-empty queue; retries re-enter at the *front* of their
//! original level so a transiently failing item does not fall behind queue
//! growth that happened while it ran.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::pool::item::{CacheKey, WorkAction, WorkItem, WorkOutcome};
use crate::types::Priority;

/// A queued work entry: the bookkeeping record plus everything needed to
/// actually run and report it.
pub(crate) struct QueuedWork {
    pub item: WorkItem,
    pub action: Arc<dyn WorkAction>,
    pub cache_key: Option<CacheKey>,
    pub responder: oneshot::Sender<WorkOutcome>,
}

#[derive(Default)]
pub(crate) struct PriorityQueues {
    high: VecDeque<QueuedWork>,
    normal: VecDeque<QueuedWork>,
    low: VecDeque<QueuedWork>,
}

impl PriorityQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue_mut(&mut self, priority: Priority) -> &mut VecDeque<QueuedWork> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }

    /// Append at the tail of the entry's priority queue.
    pub fn push_back(&mut self, entry: QueuedWork) {
        self.queue_mut(entry.item.priority).push_back(entry);
    }

    /// Re-insert at the front of the entry's priority queue (retry path).
    pub fn push_front(&mut self, entry: QueuedWork) {
        self.queue_mut(entry.item.priority).push_front(entry);
    }

    /// Pop the head of the highest non-empty queue.
    pub fn pop_next(&mut self) -> Option<QueuedWork> {
        self.high
            .pop_front()
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.low.pop_front())
    }

    /// Remove and return everything, highest priority first.
    pub fn drain_all(&mut self) -> Vec<QueuedWork> {
        self.high
            .drain(..)
            .chain(self.normal.drain(..))
            .chain(self.low.drain(..))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.high
            .iter()
            .chain(self.normal.iter())
            .chain(self.low.iter())
            .any(|entry| entry.item.id == id)
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.normal.is_empty() && self.low.is_empty()
    }
}
