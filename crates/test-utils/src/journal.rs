use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use taskvisor::graph::{Interrupt, Task};
use tokio_util::sync::CancellationToken;

/// Shared, ordered log of what tasks did.
///
/// Plain tasks record `"A"` when they run and `"-A"` when reverted. Gated
/// tasks record `"A:start"` and then `"A:end"` or `"A:interrupted"`.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }

    /// A task that succeeds, and whose revert succeeds.
    pub fn task(&self, name: &str) -> Task {
        let run_journal = self.clone();
        let revert_journal = self.clone();
        let run_name = name.to_string();
        let revert_name = format!("-{name}");
        Task::new(name, move |_interrupt: Interrupt| {
            let journal = run_journal.clone();
            let entry = run_name.clone();
            async move {
                journal.record(entry);
                Ok(())
            }
        })
        .revert_with(move || {
            let journal = revert_journal.clone();
            let entry = revert_name.clone();
            async move {
                journal.record(entry);
                Ok(())
            }
        })
    }

    /// A task that fails, and whose revert fails too.
    pub fn failing_task(&self, name: &str) -> Task {
        let run_journal = self.clone();
        let revert_journal = self.clone();
        let run_name = name.to_string();
        let revert_name = name.to_string();
        Task::new(name, move |_interrupt: Interrupt| {
            let journal = run_journal.clone();
            let name = run_name.clone();
            async move {
                journal.record(name.clone());
                Err(anyhow!("task {name} failed"))
            }
        })
        .revert_with(move || {
            let journal = revert_journal.clone();
            let name = revert_name.clone();
            async move {
                journal.record(format!("-{name}"));
                Err(anyhow!("task {name} rollback failed"))
            }
        })
    }

    /// A task that records its start and then waits until `release` is
    /// cancelled (success) or its own interrupt is raised (failure).
    pub fn gated_task(&self, name: &str, release: &CancellationToken) -> Task {
        let journal = self.clone();
        let name_owned = name.to_string();
        let release = release.clone();
        Task::new(name, move |interrupt: Interrupt| {
            let journal = journal.clone();
            let name = name_owned.clone();
            let release = release.clone();
            async move {
                journal.record(format!("{name}:start"));
                tokio::select! {
                    _ = release.cancelled() => {
                        journal.record(format!("{name}:end"));
                        Ok(())
                    }
                    _ = interrupt.cancelled() => {
                        journal.record(format!("{name}:interrupted"));
                        Err(anyhow!("task {name} interrupted"))
                    }
                }
            }
        })
    }
}

/// A task that does nothing and has no compensating action.
pub fn empty_task(name: &str) -> Task {
    Task::new(name, |_interrupt: Interrupt| async { Ok(()) })
}
