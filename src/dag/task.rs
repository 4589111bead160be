// src/dag/task.rs

//! Plan-facing task records and numeric task ids.

use std::fmt;
use std::str::FromStr;

/// One entry of the ordered task list handed over by the plan parser.
///
/// The parser is an external collaborator; it either extracts dependency
/// ids up front (`depends: Some(...)`) or leaves them embedded in the
/// description as `(depends: 1.2, 1.3)` markers for [`crate::dag::parser`]
/// to pick up.
#[derive(Debug, Clone)]
pub struct PlanTask {
    /// Task id in `phase.task` numeric form, e.g. `"3.2"`.
    pub id: String,
    /// Phase number as reported by the plan parser.
    pub phase: u32,
    /// Free-text description, possibly carrying dependency markers and a
    /// phase annotation.
    pub description: String,
    /// Pre-extracted dependency ids, if the parser already did the work.
    pub depends: Option<Vec<String>>,
}

impl PlanTask {
    pub fn new(id: impl Into<String>, phase: u32, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phase,
            description: description.into(),
            depends: None,
        }
    }

    pub fn with_depends(mut self, depends: Vec<String>) -> Self {
        self.depends = Some(depends);
        self
    }
}

/// Parsed `phase.task` id, ordered by phase first and task number second.
///
/// `"3.10"` sorts after `"3.2"`: the components are numeric, not lexical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId {
    pub phase: u32,
    pub task: u32,
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (phase, task) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("task id '{s}' is not in phase.task form"))?;

        let phase: u32 = phase
            .parse()
            .map_err(|_| format!("task id '{s}' has a non-numeric phase component"))?;
        let task: u32 = task
            .parse()
            .map_err(|_| format!("task id '{s}' has a non-numeric task component"))?;

        Ok(TaskId { phase, task })
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.phase, self.task)
    }
}

/// Advisory execution-style annotation parsed from a task description.
///
/// These are surfaced as metadata only; readiness queries do not enforce
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAnnotation {
    Sequential,
    Parallel,
}
