// src/graph/chain.rs

use crate::errors::{Result, TaskvisorError};
use crate::graph::{Graph, Task};

/// Tasks run one after another, in the order given.
#[derive(Debug, Clone)]
pub struct TaskChain {
    first: Task,
    last: Task,
}

impl TaskChain {
    /// Wire each task after the previous one.
    ///
    /// Fails with [`TaskvisorError::NoTasksSpecified`] when `tasks` is empty.
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Result<Self> {
        let mut tasks = tasks.into_iter();
        let first = tasks.next().ok_or(TaskvisorError::NoTasksSpecified)?;
        let mut chain = Self {
            last: first.clone(),
            first,
        };
        chain.extend(tasks);
        Ok(chain)
    }

    /// Extend the chain past its current last task.
    ///
    /// Fails with [`TaskvisorError::NoTasksSpecified`] when `tasks` is empty.
    pub fn append(&mut self, tasks: impl IntoIterator<Item = Task>) -> Result<()> {
        let mut tasks = tasks.into_iter().peekable();
        if tasks.peek().is_none() {
            return Err(TaskvisorError::NoTasksSpecified);
        }
        self.extend(tasks);
        Ok(())
    }

    pub fn first(&self) -> &Task {
        &self.first
    }

    pub fn last(&self) -> &Task {
        &self.last
    }

    fn extend(&mut self, tasks: impl Iterator<Item = Task>) {
        for task in tasks {
            task.add_upstream(&self.last);
            self.last = task;
        }
    }
}

impl Graph for TaskChain {
    fn roots(&self) -> Vec<Task> {
        vec![self.first.clone()]
    }

    fn leaves(&self) -> Vec<Task> {
        vec![self.last.clone()]
    }
}
