// src/lib.rs

//! Orchestration core for a plan-execution tool.
//!
//! Three tightly coupled subsystems:
//!
//! - [`pool`] — a priority worker pool that executes opaque asynchronous
//!   work units under a concurrency cap, with retry, health monitoring and
//!   graceful shutdown.
//! - [`dag`] — a dependency graph engine that turns declared task
//!   dependencies into a directed graph, rejects cycles, and answers
//!   readiness queries with phase ordering and pipeline-start triggers.
//! - [`pipeline`] — a speculative look-ahead pipeline that uses the pool's
//!   low-priority lane to pre-compute results for tasks the main line has
//!   not reached yet, backed by a freshness-validated cache.
//!
//! Everything else — plan parsing, persistent status storage, the actual
//! external tool invocations — stays outside, behind the [`status`] port
//! and the [`pool::WorkAction`] trait.

pub mod cache;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod pool;
pub mod status;
pub mod types;

pub use cache::CacheStore;
pub use config::{ConfigFile, PipelineConfig, PoolConfig};
pub use dag::{PlanTask, TaskGraph};
pub use engine::DagRunner;
pub use errors::{PlandagError, Result};
pub use pipeline::SpeculativePipeline;
pub use pool::WorkerPool;
pub use types::{Priority, TaskStatus};
