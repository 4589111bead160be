// src/status.rs

//! Abstract storage for task statuses.
//!
//! Persistence (file locking, atomic writes, durability) is the concern of
//! the implementor — typically the plan tool's on-disk status file. The
//! core only reads and writes statuses by task id.

use std::collections::HashMap;

use crate::errors::Result;
use crate::types::TaskStatus;

/// Port to the external status store.
pub trait StatusStore: Send {
    fn status_of(&self, task: &str) -> Result<Option<TaskStatus>>;
    fn set_status(&mut self, task: &str, status: TaskStatus) -> Result<()>;
    /// Every recorded status, for seeding a graph at startup.
    fn statuses(&self) -> Result<HashMap<String, TaskStatus>>;
}

/// Stores statuses in memory only.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    map: HashMap<String, TaskStatus>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl StatusStore for MemoryStatusStore {
    fn status_of(&self, task: &str) -> Result<Option<TaskStatus>> {
        Ok(self.map.get(task).copied())
    }

    fn set_status(&mut self, task: &str, status: TaskStatus) -> Result<()> {
        self.map.insert(task.to_string(), status);
        Ok(())
    }

    fn statuses(&self) -> Result<HashMap<String, TaskStatus>> {
        Ok(self.map.clone())
    }
}
