// src/dag/graph.rs

//! Dependency graph construction and cycle detection.

use std::collections::HashMap;

use petgraph::graphmap::DiGraphMap;
use tracing::{debug, warn};

use crate::dag::parser::{parse_dependencies, parse_phase_annotation};
use crate::dag::task::{PhaseAnnotation, PlanTask, TaskId};
use crate::errors::{PlandagError, Result};
use crate::types::TaskStatus;

/// One node of the dependency graph.
///
/// `dependents` is the computed reverse edge set: `dependents(A)` contains
/// `B` iff `dependencies(B)` contains `A`. The graph keeps this symmetric
/// at construction time and is never mutated incrementally — a changed task
/// list means a wholesale rebuild.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: String,
    /// Parsed numeric form of `id`, used for deterministic ordering.
    pub numeric_id: TaskId,
    pub phase: u32,
    pub description: String,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
    pub in_degree: usize,
    pub status: TaskStatus,
    /// Advisory `[SEQUENTIAL]` / `[PARALLEL]` marker; not enforced.
    pub annotation: Option<PhaseAnnotation>,
}

/// Dependency graph over a plan's task list.
///
/// Built wholesale from a `&[PlanTask]` slice; a cyclic input is rejected
/// at build time, so readiness queries only ever run over an acyclic graph.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: HashMap<String, TaskNode>,
    /// Task ids in plan order, for deterministic traversal.
    order: Vec<String>,
    /// Pipeline-start triggers: phase number -> task id that unlocks it.
    phase_triggers: HashMap<u32, String>,
}

impl TaskGraph {
    /// Build and validate a graph from the plan parser's task list.
    ///
    /// Rejects duplicate ids, malformed ids, self-dependencies, unknown
    /// dependency ids, and cycles. Dependencies come from `task.depends`
    /// when the parser pre-extracted them, otherwise from `(depends: ...)`
    /// markers in the description.
    pub fn build(tasks: &[PlanTask]) -> Result<Self> {
        let mut nodes: HashMap<String, TaskNode> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        for task in tasks {
            let numeric_id: TaskId = task
                .id
                .parse()
                .map_err(PlandagError::InvalidPlan)?;

            if numeric_id.phase != task.phase {
                warn!(
                    task = %task.id,
                    phase = task.phase,
                    "task id encodes a different phase than the parser reported; using the id"
                );
            }

            let dependencies = match &task.depends {
                Some(deps) => deps.clone(),
                None => parse_dependencies(&task.description),
            };

            if dependencies.iter().any(|dep| dep == &task.id) {
                return Err(PlandagError::InvalidPlan(format!(
                    "task '{}' cannot depend on itself",
                    task.id
                )));
            }

            let node = TaskNode {
                id: task.id.clone(),
                numeric_id,
                phase: numeric_id.phase,
                description: task.description.clone(),
                in_degree: dependencies.len(),
                dependencies,
                dependents: Vec::new(),
                status: TaskStatus::Pending,
                annotation: parse_phase_annotation(&task.description),
            };

            if nodes.insert(task.id.clone(), node).is_some() {
                return Err(PlandagError::InvalidPlan(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
            order.push(task.id.clone());
        }

        // Reverse edges, in plan order so dependents lists are deterministic.
        for id in &order {
            let deps = nodes[id].dependencies.clone();
            for dep in deps {
                let Some(dep_node) = nodes.get_mut(&dep) else {
                    return Err(PlandagError::InvalidPlan(format!(
                        "task '{id}' has unknown dependency '{dep}'"
                    )));
                };
                dep_node.dependents.push(id.clone());
            }
        }

        if let Some(path) = find_cycle(&order, &nodes) {
            return Err(PlandagError::CycleDetected { path });
        }

        debug!(tasks = order.len(), "task graph built");

        Ok(Self {
            nodes,
            order,
            phase_triggers: HashMap::new(),
        })
    }

    /// Register a pipeline-start trigger: zero-dependency tasks of `phase`
    /// become eligible only once `trigger_task` is completed or skipped.
    pub fn register_phase_trigger(&mut self, phase: u32, trigger_task: &str) -> Result<()> {
        if !self.nodes.contains_key(trigger_task) {
            return Err(PlandagError::TaskNotFound(trigger_task.to_string()));
        }
        debug!(phase, trigger = %trigger_task, "registered pipeline-start trigger");
        self.phase_triggers.insert(phase, trigger_task.to_string());
        Ok(())
    }

    /// Trigger task registered for `phase`, if any.
    pub fn phase_trigger(&self, phase: u32) -> Option<&str> {
        self.phase_triggers.get(&phase).map(|s| s.as_str())
    }

    /// Mirror a status update from the external status store.
    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| PlandagError::TaskNotFound(id.to_string()))?;
        debug!(task = %id, ?status, "task status updated");
        node.status = status;
        Ok(())
    }

    /// Current status of a task, if it exists.
    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.nodes.get(id).map(|n| n.status)
    }

    /// Node lookup for diagnostics and tests.
    pub fn node(&self, id: &str) -> Option<&TaskNode> {
        self.nodes.get(id)
    }

    /// All task ids in plan order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn nodes(&self) -> &HashMap<String, TaskNode> {
        &self.nodes
    }

    pub(crate) fn order(&self) -> &[String] {
        &self.order
    }
}

/// Three-color depth-first search for a cycle.
///
/// White = unvisited, gray = on the current DFS path, black = finished.
/// Hitting a gray node means a cycle; the path is reconstructed by walking
/// parent pointers back from the current node to the gray one, yielding the
/// cycle in dependency order with the repeated task at both ends.
fn find_cycle(order: &[String], nodes: &HashMap<String, TaskNode>) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    // Edge direction: task -> its dependency, so a reported path reads as a
    // "depends on" chain.
    let index_of: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for (i, id) in order.iter().enumerate() {
        graph.add_node(i);
        for dep in &nodes[id].dependencies {
            graph.add_edge(i, index_of[dep.as_str()], ());
        }
    }

    let mut colors = vec![Color::White; order.len()];
    let mut parents: Vec<Option<usize>> = vec![None; order.len()];

    fn visit(
        n: usize,
        graph: &DiGraphMap<usize, ()>,
        colors: &mut [Color],
        parents: &mut [Option<usize>],
    ) -> Option<(usize, usize)> {
        colors[n] = Color::Gray;

        for m in graph.neighbors(n) {
            match colors[m] {
                Color::Gray => return Some((n, m)),
                Color::White => {
                    parents[m] = Some(n);
                    if let Some(found) = visit(m, graph, colors, parents) {
                        return Some(found);
                    }
                }
                Color::Black => {}
            }
        }

        colors[n] = Color::Black;
        None
    }

    for start in 0..order.len() {
        if colors[start] != Color::White {
            continue;
        }
        if let Some((from, to)) = visit(start, &graph, &mut colors, &mut parents) {
            // Walk parents from `from` back to `to`, then close the loop.
            let mut rev = vec![from];
            let mut cursor = from;
            while cursor != to {
                cursor = parents[cursor].expect("parent chain reaches the gray node");
                rev.push(cursor);
            }
            rev.reverse();
            rev.push(to);
            return Some(rev.into_iter().map(|i| order[i].clone()).collect());
        }
    }

    None
}
