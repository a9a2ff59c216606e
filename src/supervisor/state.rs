// src/supervisor/state.rs

//! Per-task run state and the report published when a run finishes.

use std::collections::HashMap;

use crate::graph::{ResourceFault, Task, TaskId};

/// Where a task is in its lifecycle during one run.
///
/// States only ever move forward: `Unknown -> Started -> Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskState {
    /// Not attempted yet, or waiting on prerequisites or resources.
    Unknown,
    /// A worker has been launched and has not reported back.
    Started,
    /// The worker returned, successfully or not.
    Finished,
}

/// Immutable summary of a finished run.
///
/// Returned by [`Supervisor::wait_finished`](crate::supervisor::Supervisor::wait_finished)
/// and consumed by the revert pass.
#[derive(Debug, Default)]
pub struct RunReport {
    pub(crate) started: Vec<Task>,
    pub(crate) states: HashMap<TaskId, TaskState>,
    pub(crate) failed: Vec<TaskId>,
    pub(crate) stranded: Vec<Task>,
    pub(crate) cancelled: bool,
    pub(crate) fault: Option<ResourceFault>,
}

impl RunReport {
    /// Tasks in the order they were dispatched.
    pub fn started(&self) -> &[Task] {
        &self.started
    }

    pub fn state_of(&self, task: TaskId) -> TaskState {
        self.states.get(&task).copied().unwrap_or(TaskState::Unknown)
    }

    /// Tasks whose work function returned an error, in completion order.
    pub fn failed(&self) -> &[TaskId] {
        &self.failed
    }

    pub fn is_failed(&self, task: TaskId) -> bool {
        self.failed.contains(&task)
    }

    /// Reachable tasks that were never dispatched, e.g. because an upstream
    /// task failed or the run was cancelled.
    pub fn stranded(&self) -> &[Task] {
        &self.stranded
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// The resource fault that aborted the run, if any.
    pub fn fault(&self) -> Option<&ResourceFault> {
        self.fault.as_ref()
    }

    /// `true` if every reachable task ran and none of them failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.stranded.is_empty() && self.fault.is_none()
    }
}
