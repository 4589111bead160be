// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlandagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Cycle detected in task graph: {}", path.join(" -> "))]
    CycleDetected {
        /// The offending cycle in traversal order, with the repeated task
        /// appearing at both ends (e.g. `["1.2", "2.1", "1.2"]`).
        path: Vec<String>,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Pool is shutting down; submission rejected")]
    PoolShuttingDown,

    #[error("Work item '{0}' is already queued or active")]
    DuplicateWorkItem(String),

    #[error("Timed out waiting for the pool to drain")]
    WaitTimeout,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PlandagError>;
