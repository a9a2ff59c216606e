use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use taskvisor::graph::{Interrupt, Task};

use crate::Journal;

/// Tracks how many probe tasks run at the same time.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    max: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest number of probe tasks observed running at once.
    pub fn max_observed(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    /// A task that enters the probe, records `"name:start"`, sleeps, records
    /// `"name:end"` and leaves.
    pub fn task(&self, name: &str, journal: &Journal) -> Task {
        let probe = self.clone();
        let journal = journal.clone();
        let name_owned = name.to_string();
        Task::new(name, move |_interrupt: Interrupt| {
            let probe = probe.clone();
            let journal = journal.clone();
            let name = name_owned.clone();
            async move {
                let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
                probe.max.fetch_max(now, Ordering::SeqCst);
                journal.record(format!("{name}:start"));
                tokio::time::sleep(Duration::from_millis(20)).await;
                journal.record(format!("{name}:end"));
                probe.current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }
}
