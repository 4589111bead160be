// src/pipeline/mod.rs

//! Speculative prefetch pipeline.
//!
//! Walks an *ordered* task list (the caller decides the linear execution
//! order — this is distinct from the dependency engine's unordered
//! readiness notion). Before executing step *i*, the next `look_ahead`
//! steps are submitted to the worker pool at low priority, keyed into a
//! pipeline-private cache, so that by the time the main line reaches them
//! the result is often already there.
//!
//! - [`metrics`] aggregates per-run timing and cache statistics.
//! - [`speculative`] is the pipeline itself.

pub mod metrics;
pub mod speculative;

pub use metrics::{PipelineMetrics, TaskTiming};
pub use speculative::{PipelineStep, PrefetchState, SpeculativePipeline};
