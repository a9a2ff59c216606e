// src/supervisor/control.rs

//! Run-control handle: dispatch, cancel, wait, revert.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{Result, TaskvisorError};
use crate::graph::{self, Graph, Task};
use crate::supervisor::core::DispatchCore;
use crate::supervisor::revert::revert_pass;
use crate::supervisor::runtime::drive;
use crate::supervisor::state::RunReport;
use crate::supervisor::CompletionEvent;

type ReportSlot = Option<Arc<RunReport>>;

/// Latched "run finished" signal. Cloneable; every clone fires once the run
/// is over, including clones taken after the fact.
#[derive(Debug, Clone)]
pub struct DoneSignal {
    rx: watch::Receiver<ReportSlot>,
}

impl DoneSignal {
    pub fn is_done(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the run to finish and return its report.
    pub async fn wait(mut self) -> Result<Arc<RunReport>> {
        let slot = self
            .rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| TaskvisorError::RunAbandoned)?;
        slot.clone().ok_or(TaskvisorError::RunAbandoned)
    }
}

/// Owns one run over a task graph.
///
/// A supervisor is single-use: it can be dispatched once and reverted once.
/// [`dispatch`](Self::dispatch) and [`revert`](Self::revert) spawn onto the
/// current Tokio runtime and must be called from within one.
#[derive(Debug)]
pub struct Supervisor {
    roots: Vec<Task>,
    cancel: CancellationToken,
    /// Taken by `dispatch`; `None` afterwards.
    done_tx: Mutex<Option<watch::Sender<ReportSlot>>>,
    done_rx: watch::Receiver<ReportSlot>,
    /// Taken by `revert`; `None` afterwards.
    reverted_tx: Mutex<Option<watch::Sender<bool>>>,
    reverted_rx: watch::Receiver<bool>,
}

impl Supervisor {
    /// Supervise the roots of `graph`.
    pub fn new<G: Graph + ?Sized>(graph: &G) -> Self {
        Self::from_roots(graph.roots())
    }

    /// Supervise an explicit list of root tasks.
    pub fn from_roots(roots: impl IntoIterator<Item = Task>) -> Self {
        let (done_tx, done_rx) = watch::channel(None);
        let (reverted_tx, reverted_rx) = watch::channel(false);
        Self {
            roots: roots.into_iter().collect(),
            cancel: CancellationToken::new(),
            done_tx: Mutex::new(Some(done_tx)),
            done_rx,
            reverted_tx: Mutex::new(Some(reverted_tx)),
            reverted_rx,
        }
    }

    /// Add the roots of another graph. Only meaningful before dispatch.
    pub fn with_graph<G: Graph + ?Sized>(mut self, graph: &G) -> Self {
        self.roots.extend(graph.roots());
        self
    }

    pub fn roots(&self) -> &[Task] {
        &self.roots
    }

    /// Optional pre-run check; dispatching a cyclic graph deadlocks the tasks
    /// on the cycle.
    pub fn ensure_acyclic(&self) -> Result<()> {
        graph::ensure_acyclic(&self.roots)
    }

    /// Start the run and return immediately.
    ///
    /// Every finished task is reported on `observer`, which is closed when
    /// the run completes. The observer must be drained (or be large enough)
    /// since the run waits for room in it. A second call fails with
    /// [`TaskvisorError::AlreadyDispatched`] and starts nothing.
    pub fn dispatch(&self, observer: Option<mpsc::Sender<CompletionEvent>>) -> Result<()> {
        let done_tx = lock(&self.done_tx)
            .take()
            .ok_or(TaskvisorError::AlreadyDispatched)?;

        let core = DispatchCore::new(self.roots.clone());
        let cancel = self.cancel.clone();
        debug!(roots = self.roots.len(), "dispatching supervisor");

        tokio::spawn(async move {
            let report = drive(core, observer, cancel).await;
            done_tx.send_replace(Some(Arc::new(report)));
        });
        Ok(())
    }

    /// Request cancellation of the run.
    ///
    /// Running tasks get their interrupt raised and nothing new is
    /// dispatched; the run finishes once the in-flight workers return.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            info!("cancellation requested");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn finished_signal(&self) -> DoneSignal {
        DoneSignal {
            rx: self.done_rx.clone(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.done_rx.borrow().is_some()
    }

    /// Wait until the run has finished and return its report.
    pub async fn wait_finished(&self) -> Result<Arc<RunReport>> {
        self.finished_signal().wait().await
    }

    /// Start the compensating pass.
    ///
    /// Waits for the run to finish, then reverts every started task in
    /// reverse dispatch order on a background task and returns. Each invoked
    /// compensating action is reported on `observer`, which is closed when
    /// the pass completes.
    pub async fn revert(&self, observer: Option<mpsc::Sender<CompletionEvent>>) -> Result<()> {
        if lock(&self.done_tx).is_some() {
            return Err(TaskvisorError::NotDispatched);
        }
        let reverted_tx = lock(&self.reverted_tx)
            .take()
            .ok_or(TaskvisorError::AlreadyReverted)?;

        let report = self.wait_finished().await?;

        tokio::spawn(async move {
            revert_pass(&report, observer).await;
            reverted_tx.send_replace(true);
        });
        Ok(())
    }

    pub fn is_reverted(&self) -> bool {
        *self.reverted_rx.borrow()
    }

    /// Wait until the compensating pass has completed.
    pub async fn wait_reverted(&self) -> Result<()> {
        let mut rx = self.reverted_rx.clone();
        rx.wait_for(|reverted| *reverted)
            .await
            .map_err(|_| TaskvisorError::RunAbandoned)?;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
