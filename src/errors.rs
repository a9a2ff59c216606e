// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::graph::ResourceFault;

#[derive(Error, Debug)]
pub enum TaskvisorError {
    #[error("no tasks were specified")]
    NoTasksSpecified,

    #[error("the supervisor was already dispatched")]
    AlreadyDispatched,

    #[error("the supervisor was not dispatched yet")]
    NotDispatched,

    #[error("the changes were already reverted")]
    AlreadyReverted,

    #[error("the run loop was dropped before the run finished")]
    RunAbandoned,

    #[error("Cycle detected in task graph: {0}")]
    GraphCycle(String),

    #[error("Resource fault: {0}")]
    Resource(#[from] ResourceFault),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskvisorError>;
