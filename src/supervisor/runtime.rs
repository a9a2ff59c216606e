// src/supervisor/runtime.rs

//! Async shell around [`DispatchCore`].
//!
//! This is the single coordinating loop of a run: it launches one Tokio task
//! per dispatched worker, receives their outcomes over an mpsc channel,
//! forwards them to the observer and feeds them into the core. Workers never
//! touch scheduling state; they only send an outcome when they return.

use std::future::Future;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::Error;
use crate::graph::Task;
use crate::supervisor::core::{CoreCommand, CoreStep, DispatchCore};
use crate::supervisor::state::RunReport;
use crate::supervisor::CompletionEvent;

/// What a worker reports back to the loop.
#[derive(Debug)]
struct WorkerOutcome {
    task: Task,
    result: Result<(), Error>,
}

/// Drive one run to completion and return its report.
///
/// The observer (if any) is dropped when this returns, which closes the
/// channel for the caller.
pub(crate) async fn drive(
    mut core: DispatchCore,
    mut observer: Option<mpsc::Sender<CompletionEvent>>,
    cancel: CancellationToken,
) -> RunReport {
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<WorkerOutcome>(64);

    info!("supervisor run started");

    // Cancellation is consumed exactly once.
    let mut listen_for_cancel = true;
    if cancel.is_cancelled() {
        listen_for_cancel = false;
        let step = core.cancel();
        execute(step, &outcome_tx);
    }

    let step = core.start();
    let mut finished = execute(step, &outcome_tx);

    while !finished {
        tokio::select! {
            outcome = outcome_rx.recv() => {
                // We hold a sender ourselves, so the channel cannot close.
                let Some(outcome) = outcome else { break };
                finished = handle_outcome(&mut core, &mut observer, outcome, &outcome_tx).await;
            }
            _ = cancel.cancelled(), if listen_for_cancel => {
                listen_for_cancel = false;
                let step = core.cancel();
                finished = execute(step, &outcome_tx);
            }
        }
    }

    let report = core.into_report();
    info!(
        started = report.started().len(),
        failed = report.failed().len(),
        stranded = report.stranded().len(),
        cancelled = report.was_cancelled(),
        "supervisor run finished"
    );
    report
}

async fn handle_outcome(
    core: &mut DispatchCore,
    observer: &mut Option<mpsc::Sender<CompletionEvent>>,
    outcome: WorkerOutcome,
    outcome_tx: &mpsc::Sender<WorkerOutcome>,
) -> bool {
    let WorkerOutcome { task, result } = outcome;
    let id = task.id();
    let succeeded = result.is_ok();

    match &result {
        Ok(()) => info!(task = %task, "task finished"),
        Err(err) => warn!(task = %task, error = %err, "task failed"),
    }

    forward(observer, CompletionEvent::ran(task, result.err())).await;

    let step = core.complete(id, succeeded);
    execute(step, outcome_tx)
}

/// Send an event to the observer, forgetting the observer once its receiver
/// is gone.
pub(crate) async fn forward(
    observer: &mut Option<mpsc::Sender<CompletionEvent>>,
    event: CompletionEvent,
) {
    if let Some(tx) = observer {
        if tx.send(event).await.is_err() {
            debug!("observer receiver dropped; no further events will be sent");
            *observer = None;
        }
    }
}

fn execute(step: CoreStep, outcome_tx: &mpsc::Sender<WorkerOutcome>) -> bool {
    for command in step.commands {
        match command {
            CoreCommand::Launch(tasks) => {
                for task in tasks {
                    launch(task, outcome_tx.clone());
                }
            }
            CoreCommand::Interrupt(tasks) => {
                for task in tasks {
                    debug!(task = %task, "interrupting task");
                    task.interrupt();
                }
            }
        }
    }
    step.finished
}

fn launch(task: Task, outcome_tx: mpsc::Sender<WorkerOutcome>) {
    tokio::spawn(async move {
        debug!(task = %task, "worker started");
        let result = run_guarded(task.name(), task.run()).await;
        if outcome_tx.send(WorkerOutcome { task, result }).await.is_err() {
            debug!("run loop gone; dropping worker outcome");
        }
    });
}

/// Run `fut` on its own Tokio task so that a panic surfaces as an error
/// instead of silently losing the completion.
pub(crate) async fn run_guarded<F>(name: &str, fut: F) -> Result<(), Error>
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(err) => Err(anyhow!("task '{}' did not return: {}", name, err)),
    }
}
