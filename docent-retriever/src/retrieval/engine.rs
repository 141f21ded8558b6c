//! The indexing engine: watcher, sweep, and a bounded worker pool over
//! one event channel.
//!
//! The engine is the background half of the system. It spawns a single
//! dispatcher task that consumes the event channel with bounded
//! concurrency, runs the startup sweep, then attaches the filesystem
//! watcher. The dispatcher is spawned *before* the sweep so no event is
//! lost between the two.
//!
//! Per-file failures are logged and counted, never propagated: one corrupt
//! document cannot stop the engine. Shutdown drops the watcher and the
//! engine's event sender, then waits for the dispatcher to drain in-flight
//! work; because the registry only commits on full success, aborting
//! mid-file at shutdown just means that file is re-indexed next start.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docent_context::ChunkingConfig;
use docent_model::EmbeddingClient;
use futures::StreamExt;
use tokio::sync::{RwLock, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use super::pipeline::{IndexOutcome, IndexingPipeline};
use super::registry::ChangeRegistry;
use super::watch::{self, DirectoryWatcher, EVENT_CHANNEL_CAPACITY};
use crate::storage::VectorStore;

/// Configuration for the indexing engine.
#[derive(Debug, Clone)]
pub struct IndexingEngineConfig {
    /// Directory tree to watch; created if absent.
    pub root: PathBuf,
    /// Chunk sizing passed through to the pipeline.
    pub chunking: ChunkingConfig,
    /// Maximum files indexed concurrently.
    pub max_workers: usize,
    /// Quiet period for coalescing filesystem event bursts.
    pub debounce: Duration,
    /// Texts per embedding request.
    pub batch_size: usize,
    /// Files larger than this are skipped with a warning.
    pub max_file_bytes: u64,
}

impl IndexingEngineConfig {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            chunking: ChunkingConfig::default(),
            max_workers: 4,
            debounce: Duration::from_secs(2),
            batch_size: 16,
            max_file_bytes: 10 << 20,
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }
}

/// Counters for one engine lifetime.
#[derive(Debug, Default, Clone)]
pub struct IndexStats {
    /// Files that went through extract/embed/store.
    pub files_indexed: usize,
    /// Files skipped by the fingerprint gate.
    pub files_unchanged: usize,
    /// Files skipped for format, size, or emptiness.
    pub files_skipped: usize,
    /// Chunks actually written to the store.
    pub chunks_upserted: usize,
    /// Per-file failures (contained, file retried later).
    pub errors: usize,
}

/// Background indexing: watcher → channel → bounded worker pool → store.
pub struct IndexingEngine {
    stats: Arc<RwLock<IndexStats>>,
    watcher: Option<DirectoryWatcher>,
    events_tx: Option<mpsc::Sender<PathBuf>>,
    dispatcher: Option<tokio::task::JoinHandle<()>>,
}

impl IndexingEngine {
    /// Create the watch root if needed, run the startup sweep, and begin
    /// steady-state watching.
    pub async fn start(
        config: IndexingEngineConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        registry: Arc<dyn ChangeRegistry>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.root)
            .await
            .with_context(|| format!("creating watch root {}", config.root.display()))?;
        info!(root = %config.root.display(), workers = config.max_workers, "starting indexing engine");

        let pipeline = Arc::new(IndexingPipeline::new(
            config.root.clone(),
            config.chunking,
            store,
            embedder,
            registry,
            config.batch_size,
            config.max_file_bytes,
        ));
        let stats = Arc::new(RwLock::new(IndexStats::default()));

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        // Consumer first, so the sweep cannot fill the channel with no one
        // draining it.
        let dispatcher = tokio::spawn(Self::dispatch(
            events_rx,
            pipeline,
            stats.clone(),
            config.max_workers,
        ));

        watch::sweep(&config.root, &events_tx).await?;
        let watcher = DirectoryWatcher::start(&config.root, config.debounce, events_tx.clone())?;

        Ok(Self {
            stats,
            watcher: Some(watcher),
            events_tx: Some(events_tx),
            dispatcher: Some(dispatcher),
        })
    }

    /// Consume the event channel until every sender is gone, indexing up
    /// to `max_workers` files at once.
    async fn dispatch(
        events_rx: mpsc::Receiver<PathBuf>,
        pipeline: Arc<IndexingPipeline>,
        stats: Arc<RwLock<IndexStats>>,
        max_workers: usize,
    ) {
        let pipeline = &pipeline;
        let stats = &stats;
        ReceiverStream::new(events_rx)
            .for_each_concurrent(max_workers, |path| async move {
                // Watch events may name directories or already-deleted
                // paths; only regular files are indexed.
                let is_file = tokio::fs::metadata(&path)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false);
                if !is_file {
                    return;
                }

                match pipeline.index_file(&path).await {
                    Ok(outcome) => {
                        let mut stats = stats.write().await;
                        match outcome {
                            IndexOutcome::Indexed { upserted, .. } => {
                                stats.files_indexed += 1;
                                stats.chunks_upserted += upserted;
                            }
                            IndexOutcome::Unchanged => stats.files_unchanged += 1,
                            IndexOutcome::Unsupported
                            | IndexOutcome::TooLarge
                            | IndexOutcome::Empty => stats.files_skipped += 1,
                        }
                    }
                    Err(err) => {
                        error!(file = %path.display(), "indexing failed: {err:#}");
                        stats.write().await.errors += 1;
                    }
                }
            })
            .await;
    }

    /// Snapshot of the engine's counters.
    pub async fn stats(&self) -> IndexStats {
        self.stats.read().await.clone()
    }

    /// Stop watching and drain in-flight indexing.
    pub async fn shutdown(mut self) -> Result<()> {
        info!("shutting down indexing engine");
        // Dropping the watcher releases the callback's sender; dropping
        // ours closes the channel once in-flight sends finish.
        self.watcher.take();
        self.events_tx.take();
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.await.context("joining indexing dispatcher")?;
        }
        info!("indexing engine stopped");
        Ok(())
    }
}
