// src/supervisor/mod.rs

//! The dispatch engine.
//!
//! - [`core`] is the pure state machine deciding what can run next.
//! - [`runtime`] is the async loop launching workers and collecting their
//!   completions.
//! - [`revert`] is the reverse-order compensating pass.
//! - [`control`] holds [`Supervisor`], the public run-control handle.
//! - [`state`] holds per-task states and the final [`RunReport`].

pub mod control;
pub mod core;
mod revert;
mod runtime;
pub mod state;

pub use self::control::{DoneSignal, Supervisor};
pub use self::core::{CoreCommand, CoreStep, DispatchCore};
pub use self::state::{RunReport, TaskState};

use crate::errors::Error;
use crate::graph::Task;

/// Which pass produced a [`CompletionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    /// The task's work function returned.
    Run,
    /// The task's compensating action returned.
    Revert,
}

/// Observation record sent to the caller's observer channel.
///
/// Emitted once per finished task while dispatching, and once per invoked
/// compensating action while reverting.
#[derive(Debug)]
pub struct CompletionEvent {
    pub task: Task,
    pub phase: EventPhase,
    pub error: Option<Error>,
}

impl CompletionEvent {
    pub(crate) fn ran(task: Task, error: Option<Error>) -> Self {
        Self {
            task,
            phase: EventPhase::Run,
            error,
        }
    }

    pub(crate) fn reverted(task: Task, error: Option<Error>) -> Self {
        Self {
            task,
            phase: EventPhase::Revert,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
