// src/supervisor/core.rs

//! Pure dispatch state machine.
//!
//! `DispatchCore` owns every piece of scheduling state for one run: task
//! states, the pending set, dispatch order, the active-worker count and the
//! dying flag. It consumes three kinds of steps (start, completion,
//! cancellation) and answers with [`CoreCommand`]s telling the async shell
//! which workers to launch and which tasks to interrupt.
//!
//! All lock/unlock calls on [`Resource`](crate::graph::Resource)s happen
//! here, so the core is the only writer of resource state during a run. It
//! has no channels and no Tokio types and can be stepped by hand in tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, error, info, warn};

use crate::graph::{ResourceFault, Task, TaskId};
use crate::supervisor::state::{RunReport, TaskState};

/// Command produced by the core, to be executed by the async shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Start a worker for each of these tasks.
    Launch(Vec<Task>),
    /// Raise the interrupt signal of each of these tasks.
    Interrupt(Vec<Task>),
}

/// Decision returned by the core after a single step.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the run is over (no worker is active any more).
    pub finished: bool,
}

impl CoreStep {
    /// Tasks launched by this step, flattened.
    pub fn launched(&self) -> Vec<Task> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                CoreCommand::Launch(tasks) => Some(tasks.clone()),
                CoreCommand::Interrupt(_) => None,
            })
            .flatten()
            .collect()
    }
}

#[derive(Debug)]
pub struct DispatchCore {
    roots: Vec<Task>,
    states: HashMap<TaskId, TaskState>,
    /// Every task that ever left `Unknown`.
    tracked: BTreeMap<TaskId, Task>,
    /// Tasks blocked on prerequisites or resources, re-checked after every
    /// completion. Keyed by id so the re-check order is creation order.
    pending: BTreeMap<TaskId, Task>,
    started: Vec<Task>,
    active: usize,
    dying: bool,
    cancelled: bool,
    failed: Vec<TaskId>,
    fault: Option<ResourceFault>,
    to_launch: Vec<Task>,
    to_interrupt: Vec<Task>,
}

impl DispatchCore {
    pub fn new(roots: Vec<Task>) -> Self {
        Self {
            roots,
            states: HashMap::new(),
            tracked: BTreeMap::new(),
            pending: BTreeMap::new(),
            started: Vec::new(),
            active: 0,
            dying: false,
            cancelled: false,
            failed: Vec::new(),
            fault: None,
            to_launch: Vec::new(),
            to_interrupt: Vec::new(),
        }
    }

    pub fn state_of(&self, task: TaskId) -> TaskState {
        self.states.get(&task).copied().unwrap_or(TaskState::Unknown)
    }

    /// Number of tasks currently in `Started`.
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Once dying, no new task is ever dispatched.
    pub fn is_dying(&self) -> bool {
        self.dying
    }

    pub fn pending(&self) -> Vec<TaskId> {
        self.pending.keys().copied().collect()
    }

    /// Tasks in dispatch order.
    pub fn started(&self) -> &[Task] {
        &self.started
    }

    /// Attempt to dispatch every root.
    pub fn start(&mut self) -> CoreStep {
        if self.dying {
            debug!("run is dying before start; not dispatching roots");
        } else {
            for root in self.roots.clone() {
                self.try_dispatch(&root);
            }
        }
        self.flush()
    }

    /// Record that the worker for `task` returned.
    pub fn complete(&mut self, task: TaskId, succeeded: bool) -> CoreStep {
        if self.state_of(task) != TaskState::Started {
            warn!(task_id = %task, "completion for a task that is not running; ignoring");
            return self.flush();
        }
        let Some(finished) = self.tracked.get(&task).cloned() else {
            warn!(task_id = %task, "completion for an untracked task; ignoring");
            return self.flush();
        };

        self.states.insert(task, TaskState::Finished);
        self.active -= 1;
        if !succeeded {
            self.failed.push(task);
        }

        for resource in finished.resources() {
            if let Err(fault) = resource.unlock() {
                self.record_fault(fault);
            }
        }

        if !self.dying {
            let pending: Vec<Task> = self.pending.values().cloned().collect();
            for candidate in pending {
                self.try_dispatch(&candidate);
            }
            if succeeded {
                for next in finished.downstream() {
                    self.try_dispatch(&next);
                }
            } else {
                debug!(
                    task = %finished,
                    "task failed; its downstream tasks will not be dispatched"
                );
            }
        }

        self.flush()
    }

    /// Handle the (single) cancellation request for this run.
    ///
    /// Interrupts every tracked task and stops all further dispatching; the
    /// run then drains as in-flight workers return.
    pub fn cancel(&mut self) -> CoreStep {
        if self.cancelled {
            return self.flush();
        }
        self.cancelled = true;
        self.dying = true;
        info!(
            active = self.active,
            tracked = self.tracked.len(),
            "cancellation requested; interrupting tasks"
        );
        self.to_interrupt.extend(self.tracked.values().cloned());
        self.flush()
    }

    /// Consume the core into the report published at the end of the run.
    pub fn into_report(self) -> RunReport {
        let stranded = self.unstarted_reachable();
        RunReport {
            started: self.started,
            states: self.states,
            failed: self.failed,
            stranded,
            cancelled: self.cancelled,
            fault: self.fault,
        }
    }

    /// Readiness test: dispatch `task` if it is unknown, every upstream task
    /// has finished and every required resource is free; otherwise remember
    /// it as pending.
    fn try_dispatch(&mut self, task: &Task) {
        if self.state_of(task.id()) != TaskState::Unknown {
            return;
        }

        let Some(upstream) = task.upstream_handles() else {
            debug!(task = %task, "an upstream task was dropped; task stays pending");
            self.pending.insert(task.id(), task.clone());
            return;
        };
        // A failed prerequisite never counts as finished.
        if let Some(blocker) = upstream.iter().find(|up| {
            self.state_of(up.id()) != TaskState::Finished || self.failed.contains(&up.id())
        }) {
            debug!(task = %task, upstream = %blocker, "waiting for upstream task");
            self.pending.insert(task.id(), task.clone());
            return;
        }

        let resources = task.resources();
        if let Some(busy) = resources.iter().find(|r| !r.is_available()) {
            debug!(task = %task, resource = %busy, "waiting for resource");
            self.pending.insert(task.id(), task.clone());
            return;
        }

        for (locked, resource) in resources.iter().enumerate() {
            if let Err(fault) = resource.lock() {
                for held in &resources[..locked] {
                    if let Err(fault) = held.unlock() {
                        error!(task = %task, error = %fault, "failed to roll back resource lock");
                    }
                }
                self.record_fault(fault);
                return;
            }
        }

        self.pending.remove(&task.id());
        self.states.insert(task.id(), TaskState::Started);
        self.tracked.insert(task.id(), task.clone());
        self.started.push(task.clone());
        self.active += 1;

        info!(
            task = %task,
            task_id = %task.id(),
            active = self.active,
            "dispatching task"
        );
        self.to_launch.push(task.clone());
    }

    /// A resource fault means our own bookkeeping is broken: stop
    /// dispatching, interrupt whatever runs and let the run drain.
    fn record_fault(&mut self, fault: ResourceFault) {
        error!(error = %fault, "resource fault; aborting run");
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
        if !self.dying {
            self.dying = true;
            let running = self
                .tracked
                .values()
                .filter(|t| self.states.get(&t.id()) == Some(&TaskState::Started))
                .cloned()
                .collect::<Vec<_>>();
            self.to_interrupt.extend(running);
        }
    }

    fn flush(&mut self) -> CoreStep {
        let mut commands = Vec::new();
        if !self.to_interrupt.is_empty() {
            commands.push(CoreCommand::Interrupt(std::mem::take(&mut self.to_interrupt)));
        }
        if !self.to_launch.is_empty() {
            commands.push(CoreCommand::Launch(std::mem::take(&mut self.to_launch)));
        }
        CoreStep {
            commands,
            finished: self.active == 0,
        }
    }

    /// Cycle-safe walk over the downstream closure of the roots.
    fn unstarted_reachable(&self) -> Vec<Task> {
        let mut seen: HashSet<TaskId> = HashSet::new();
        let mut stack: Vec<Task> = self.roots.clone();
        let mut stranded = BTreeMap::new();

        while let Some(task) = stack.pop() {
            if !seen.insert(task.id()) {
                continue;
            }
            if self.state_of(task.id()) == TaskState::Unknown {
                stranded.insert(task.id(), task.clone());
            }
            stack.extend(task.downstream());
        }

        stranded.into_values().collect()
    }
}
