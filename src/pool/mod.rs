// src/pool/mod.rs

//! Priority worker pool.
//!
//! Executes opaque asynchronous work units under a concurrency cap with
//! strict-priority dispatch, bounded retry, cache integration, health
//! monitoring and graceful shutdown.
//!
//! - [`item`] defines work items, the `WorkAction` trait and outcomes.
//! - [`queues`] holds the three FIFO priority queues.
//! - [`stats`] tracks cumulative counters and derives health.
//! - [`worker_pool`] is the pool itself.

pub mod item;
pub mod queues;
pub mod stats;
pub mod worker_pool;

pub use item::{
    ActionError, ActionResult, CacheKey, WorkAction, WorkHandle, WorkId, WorkItem, WorkOutcome,
    WorkSpec, WorkState,
};
pub use stats::{HealthStatus, PoolStats};
pub use worker_pool::{PoolStatus, WorkerPool};
