// src/engine/mod.rs

//! Dependency-aware execution driver.
//!
//! Ties the three core subsystems to the external collaborators: it asks
//! the dependency graph for ready tasks, submits each as its own worker
//! pool item, and writes resulting statuses back through the
//! [`crate::status::StatusStore`] port.

pub mod runner;

pub use runner::{DagRunner, RunReport, RunnerOptions};
