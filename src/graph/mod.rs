// src/graph/mod.rs

//! Task graph model.
//!
//! - [`task`] holds the graph nodes and their edges.
//! - [`resource`] holds the mutual-exclusion tokens tasks may require.
//! - [`set`] and [`chain`] are convenience builders that assemble tasks into
//!   a shape implementing [`Graph`].
//! - [`cycle`] is an optional pre-run cycle check.

pub mod chain;
pub mod cycle;
pub mod resource;
pub mod set;
pub mod task;

pub use chain::TaskChain;
pub use cycle::ensure_acyclic;
pub use resource::{Resource, ResourceFault, ResourceId};
pub use set::TaskSet;
pub use task::{Interrupt, Task, TaskFuture, TaskId};

/// Anything exposing a set of root tasks and a set of leaf tasks can be
/// scheduled or depended upon.
///
/// Roots are where a supervisor starts dispatching; leaves are what a task
/// declared `after` the graph waits for.
pub trait Graph {
    fn roots(&self) -> Vec<Task>;
    fn leaves(&self) -> Vec<Task>;
}
