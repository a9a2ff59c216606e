pub mod journal;
pub mod probe;

pub use journal::{Journal, empty_task};
pub use probe::ConcurrencyProbe;

use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

use taskvisor::supervisor::CompletionEvent;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Collect every event until the supervisor closes the observer channel.
pub async fn drain(mut rx: mpsc::Receiver<CompletionEvent>) -> Vec<CompletionEvent> {
    with_timeout(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    })
    .await
}

/// Render events as `name` / `name!` (failed) for compact assertions.
pub fn describe(events: &[CompletionEvent]) -> Vec<String> {
    events
        .iter()
        .map(|e| {
            if e.is_success() {
                e.task.name().to_string()
            } else {
                format!("{}!", e.task.name())
            }
        })
        .collect()
}
