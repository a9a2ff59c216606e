// src/exec/shell.rs

//! Tasks backed by shell commands.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::graph::{Interrupt, Task};

/// A task whose work is `cmd`, run through the platform shell.
///
/// Raising the task's interrupt kills the process and fails the task.
pub fn shell_task(name: &str, cmd: &str) -> Task {
    let label: Arc<str> = Arc::from(name);
    let cmd: Arc<str> = Arc::from(cmd);
    Task::new(name, move |interrupt: Interrupt| {
        let label = Arc::clone(&label);
        let cmd = Arc::clone(&cmd);
        async move { run_command(&label, &cmd, Some(interrupt)).await }
    })
}

/// Attach `cmd` as the compensating action of `task`.
pub fn with_shell_revert(task: Task, cmd: &str) -> Task {
    let label: Arc<str> = Arc::from(format!("{}:revert", task.name()));
    let cmd: Arc<str> = Arc::from(cmd);
    task.revert_with(move || {
        let label = Arc::clone(&label);
        let cmd = Arc::clone(&cmd);
        async move { run_command(&label, &cmd, None).await }
    })
}

/// Run `cmd` to completion.
///
/// Stdout lines are echoed with a `[task]` prefix, stderr lines are logged.
/// A non-zero exit status, or the interrupt firing first, is an error.
pub async fn run_command(task: &str, cmd: &str, interrupt: Option<Interrupt>) -> Result<()> {
    info!(task = %task, cmd = %cmd, "starting process");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task))?;

    if let Some(stdout) = child.stdout.take() {
        let prefix = task.to_string();
        forward_lines(stdout, move |line| println!("[{prefix}] {line}"));
    }
    if let Some(stderr) = child.stderr.take() {
        let task = task.to_string();
        forward_lines(stderr, move |line| info!(task = %task, "stderr: {}", line));
    }

    let interrupt = interrupt.unwrap_or_else(Interrupt::new);

    tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for process of task '{}'", task))?;
            let code = status.code().unwrap_or(-1);

            info!(
                task = %task,
                exit_code = code,
                success = status.success(),
                "process exited"
            );

            if !status.success() {
                bail!("command `{}` exited with code {}", cmd, code);
            }
            Ok(())
        }

        _ = interrupt.cancelled() => {
            info!(task = %task, "interrupt raised; killing process");
            if let Err(e) = child.kill().await {
                warn!(task = %task, error = %e, "failed to kill child process");
            }
            bail!("task '{}' was interrupted", task)
        }
    }
}

fn forward_lines<R, F>(reader: R, mut emit: F)
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => emit(&line),
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "stopped reading process output");
                    break;
                }
            }
        }
    });
}
