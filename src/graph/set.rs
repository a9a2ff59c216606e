// src/graph/set.rs

use crate::errors::{Result, TaskvisorError};
use crate::graph::{Graph, Task};

/// A collection of tasks with no implied ordering between them.
#[derive(Debug, Clone)]
pub struct TaskSet {
    roots: Vec<Task>,
}

impl TaskSet {
    /// Fails with [`TaskvisorError::NoTasksSpecified`] when `tasks` is empty.
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Result<Self> {
        let roots: Vec<Task> = tasks.into_iter().collect();
        if roots.is_empty() {
            return Err(TaskvisorError::NoTasksSpecified);
        }
        Ok(Self { roots })
    }
}

impl Graph for TaskSet {
    fn roots(&self) -> Vec<Task> {
        self.roots.clone()
    }

    /// Every task without downstream edges in the closure of the roots.
    ///
    /// A leaf reachable along several paths appears once per path.
    fn leaves(&self) -> Vec<Task> {
        let mut leaves = Vec::new();
        for root in &self.roots {
            root.visit(&mut |task| {
                if task.downstream().is_empty() {
                    leaves.push(task.clone());
                }
            });
        }
        leaves
    }
}
