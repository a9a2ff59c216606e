// src/exec/mod.rs

//! Shell command execution for plan files.
//!
//! Builds work functions and compensating actions that run commands via
//! `tokio::process::Command`, honouring the task's interrupt signal.

pub mod shell;

pub use shell::{run_command, shell_task, with_shell_revert};
