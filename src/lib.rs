// src/lib.rs

//! Dependency-aware task supervisor.
//!
//! Build [`graph::Task`]s, wire them with `after`/`uses` (or with the
//! [`graph::TaskSet`] and [`graph::TaskChain`] builders), hand the roots to a
//! [`supervisor::Supervisor`], dispatch, and optionally revert.

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod plan;
pub mod supervisor;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{PlanFile, load_and_validate};
use crate::plan::build_plan;
use crate::supervisor::{CompletionEvent, RunReport, Supervisor};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading
/// - supervisor dispatch with an observer
/// - Ctrl-C and `timeout_secs` cancellation
/// - the optional revert pass
pub async fn run(args: CliArgs) -> Result<()> {
    let plan_file = load_and_validate(&args.plan)?;

    if args.dry_run {
        print_dry_run(&plan_file);
        return Ok(());
    }

    let plan = build_plan(&plan_file);
    let supervisor = Arc::new(plan.supervisor());
    supervisor.ensure_acyclic()?;

    // Ctrl-C → cooperative cancellation.
    {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            supervisor.cancel();
        });
    }

    // The supervisor has no timeout of its own; race cancellation against a timer.
    if let Some(secs) = plan_file.config.timeout_secs {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            if !supervisor.is_finished() {
                warn!(timeout_secs = secs, "plan timed out; cancelling");
                supervisor.cancel();
            }
        });
    }

    let (tx, rx) = mpsc::channel::<CompletionEvent>(64);
    supervisor.dispatch(Some(tx))?;
    drain_events(rx).await;

    let report = supervisor.wait_finished().await?;
    print_summary(&report);

    let should_revert =
        args.revert || (!report.is_success() && plan_file.config.revert_on_failure);
    if should_revert {
        info!("reverting started tasks");
        let (tx, rx) = mpsc::channel::<CompletionEvent>(64);
        supervisor.revert(Some(tx)).await?;
        let failed_reverts = drain_events(rx).await;
        supervisor.wait_reverted().await?;
        if failed_reverts > 0 {
            warn!(failed_reverts, "some compensating actions failed");
        }
    }

    if let Some(fault) = report.fault() {
        bail!("run aborted: {fault}");
    }
    if !report.is_success() {
        bail!(
            "{} task(s) failed, {} task(s) never ran",
            report.failed().len(),
            report.stranded().len()
        );
    }
    Ok(())
}

/// Log every event until the supervisor closes the channel; returns the
/// number of events carrying an error.
async fn drain_events(mut rx: mpsc::Receiver<CompletionEvent>) -> usize {
    let mut failures = 0;
    while let Some(event) = rx.recv().await {
        match &event.error {
            None => debug!(task = %event.task, phase = ?event.phase, "event"),
            Some(err) => {
                failures += 1;
                warn!(task = %event.task, phase = ?event.phase, error = %err, "event carried an error");
            }
        }
    }
    failures
}

fn print_summary(report: &RunReport) {
    println!("taskvisor summary");
    for task in report.started() {
        let status = if report.is_failed(task.id()) { "failed" } else { "ok" };
        println!("  - {}: {}", task.name(), status);
    }
    for task in report.stranded() {
        println!("  - {}: not run", task.name());
    }
    if report.was_cancelled() {
        println!("  (run was cancelled)");
    }
}

/// Simple dry-run output: print tasks, deps, resources and commands.
fn print_dry_run(plan: &PlanFile) {
    println!("taskvisor dry-run");
    println!(
        "  config.revert_on_failure = {}",
        plan.config.revert_on_failure
    );
    if let Some(secs) = plan.config.timeout_secs {
        println!("  config.timeout_secs = {secs}");
    }
    println!();

    println!("tasks ({}):", plan.task.len());
    for (name, task) in plan.task.iter() {
        println!("  - {name}");
        println!("      cmd: {}", task.cmd);
        if let Some(ref revert) = task.revert {
            println!("      revert: {revert}");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.uses.is_empty() {
            println!("      uses: {:?}", task.uses);
        }
    }

    debug!("dry-run complete (no execution)");
}
