// src/supervisor/revert.rs

//! Compensating pass run after a finished run.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::supervisor::runtime::{forward, run_guarded};
use crate::supervisor::state::{RunReport, TaskState};
use crate::supervisor::CompletionEvent;

/// Walk the dispatch order backwards and run every compensating action.
///
/// A failing action is reported to the observer and the pass goes on; there
/// are no retries.
pub(crate) async fn revert_pass(
    report: &RunReport,
    mut observer: Option<mpsc::Sender<CompletionEvent>>,
) {
    info!(started = report.started().len(), "revert pass started");

    let mut reverted = 0usize;
    let mut failed = 0usize;

    for task in report.started().iter().rev() {
        if report.state_of(task.id()) < TaskState::Finished {
            continue;
        }
        if !task.is_revertible() {
            debug!(task = %task, "no compensating action; skipping");
            continue;
        }

        let result = run_guarded(task.name(), task.revert()).await;
        match &result {
            Ok(()) => {
                reverted += 1;
                info!(task = %task, "task reverted");
            }
            Err(err) => {
                failed += 1;
                warn!(task = %task, error = %err, "revert failed");
            }
        }

        forward(&mut observer, CompletionEvent::reverted(task.clone(), result.err())).await;
    }

    info!(reverted, failed, "revert pass finished");
}
