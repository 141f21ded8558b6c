//! Filesystem watching as a bounded channel of paths.
//!
//! Event delivery is decoupled from event processing: the debouncer's
//! callback thread pushes changed paths into a bounded `mpsc` channel, and
//! a single dispatcher (owned by the engine) consumes them. If indexing
//! lags behind event volume the channel fills and `blocking_send` applies
//! backpressure to the watcher thread instead of dropping events.
//!
//! Debouncing coalesces bursts (a writer that truncates then writes emits
//! one event, not two) purely for efficiency; correctness never depends on
//! it, because the fingerprint gate makes a redundant second pass a no-op.
//!
//! Deletion and rename events are deliberately ignored: removing a file
//! does not remove its chunks from the store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

/// Paths the dispatcher can be asked to look at in one engine lifetime.
/// Sized so a large startup sweep does not immediately stall the watcher.
pub const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Recursive watcher over one directory tree.
///
/// Holds the OS watcher alive; dropping this stops event delivery and
/// releases the callback's clone of the event sender.
pub struct DirectoryWatcher {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl DirectoryWatcher {
    /// Start watching `root` recursively, sending each debounced changed
    /// path into `events_tx`.
    pub fn start(
        root: &Path,
        quiet_period: Duration,
        events_tx: mpsc::Sender<PathBuf>,
    ) -> Result<Self> {
        let mut debouncer = notify_debouncer_mini::new_debouncer(
            quiet_period,
            move |res: notify_debouncer_mini::DebounceEventResult| {
                // Runs on the watcher's own thread, so a blocking send is
                // fine and gives us backpressure.
                for event in res.ok().into_iter().flatten() {
                    if events_tx.blocking_send(event.path).is_err() {
                        tracing::debug!("event channel closed, dropping filesystem event");
                    }
                }
            },
        )?;
        debouncer
            .watcher()
            .watch(root, notify::RecursiveMode::Recursive)?;
        tracing::info!(root = %root.display(), "watching for document changes");
        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

/// One-time startup sweep: enqueue every pre-existing regular file under
/// `root`. Hidden files and ignore-listed paths are skipped.
pub async fn sweep(root: &Path, events_tx: &mpsc::Sender<PathBuf>) -> Result<()> {
    let mut swept = 0usize;
    for entry in ignore::Walk::new(root) {
        let entry = entry?;
        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            events_tx.send(entry.into_path()).await?;
            swept += 1;
        }
    }
    tracing::info!(root = %root.display(), files = swept, "startup sweep enqueued");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::time::{Duration, sleep, timeout};
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_sweep_enqueues_only_regular_files() -> Result<()> {
        let dir = tempdir()?;
        tokio::fs::write(dir.path().join("a.txt"), "one").await?;
        tokio::fs::create_dir(dir.path().join("nested")).await?;
        tokio::fs::write(dir.path().join("nested/b.txt"), "two").await?;

        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        sweep(dir.path(), &tx).await?;
        drop(tx);

        let mut paths = Vec::new();
        while let Some(path) = rx.recv().await {
            paths.push(path);
        }
        paths.sort();
        assert_eq!(
            paths,
            vec![dir.path().join("a.txt"), dir.path().join("nested/b.txt")]
        );
        Ok(())
    }

    #[traced_test]
    #[tokio::test]
    async fn test_watcher_reports_created_file() -> Result<()> {
        let dir = tempdir()?;
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let watcher = DirectoryWatcher::start(dir.path(), Duration::from_millis(100), tx)?;

        sleep(Duration::from_millis(100)).await;
        tokio::fs::write(dir.path().join("fresh.txt"), "new content").await?;

        let event = timeout(Duration::from_secs(10), rx.recv()).await?;
        let path = event.expect("watcher channel closed early");
        assert_eq!(path.file_name().unwrap(), "fresh.txt");

        drop(watcher);
        Ok(())
    }
}
