// src/graph/cycle.rs

//! Pre-run cycle detection.
//!
//! The supervisor itself never looks for cycles: a cyclic graph simply leaves
//! every task on the cycle pending forever. Callers that build graphs from
//! untrusted input can run this check before dispatching.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TaskvisorError};
use crate::graph::{Task, TaskId};

/// Fail with [`TaskvisorError::GraphCycle`] if the downstream closure of
/// `roots` contains a cycle.
pub fn ensure_acyclic(roots: &[Task]) -> Result<()> {
    // Edge direction: upstream -> downstream.
    let mut graph: DiGraphMap<TaskId, ()> = DiGraphMap::new();
    let mut names: HashMap<TaskId, String> = HashMap::new();
    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut stack: Vec<Task> = roots.to_vec();

    while let Some(task) = stack.pop() {
        if !seen.insert(task.id()) {
            continue;
        }
        graph.add_node(task.id());
        names.insert(task.id(), task.name().to_string());

        for next in task.downstream() {
            graph.add_edge(task.id(), next.id(), ());
            stack.push(next);
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let id = cycle.node_id();
            let name = names.get(&id).cloned().unwrap_or_else(|| id.to_string());
            Err(TaskvisorError::GraphCycle(format!(
                "cycle detected in task graph involving task '{}'",
                name
            )))
        }
    }
}
