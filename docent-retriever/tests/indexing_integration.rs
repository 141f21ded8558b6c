//! End-to-end tests for the indexing engine: startup sweep, live watching,
//! the fingerprint gate, and clean shutdown, all against an in-memory
//! store and a deterministic offline embedder.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use docent_context::ChunkingConfig;
use docent_model::{EmbedError, EmbeddingClient, EmbeddingResult, embedding::normalize_to_f16};
use docent_retriever::{
    IndexingEngine, IndexingEngineConfig, InMemoryRegistry, SqliteVectorStore, VectorStore,
};
use half::f16;
use tempfile::tempdir;
use tokio::time::sleep;

/// Deterministic embedder that counts how many texts it has embedded.
struct CountingEmbedder {
    texts_embedded: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            texts_embedded: AtomicUsize::new(0),
        }
    }

    fn embedded(&self) -> usize {
        self.texts_embedded.load(Ordering::SeqCst)
    }
}

fn byte_bucket_vector(text: &str) -> Vec<f16> {
    let mut buckets = [0.0f32; 8];
    for byte in text.bytes() {
        buckets[(byte as usize) % 8] += 1.0;
    }
    normalize_to_f16(buckets.to_vec())
}

#[async_trait]
impl EmbeddingClient for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f16>, EmbedError> {
        self.texts_embedded.fetch_add(1, Ordering::SeqCst);
        Ok(byte_bucket_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingResult, EmbedError> {
        self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| byte_bucket_vector(t)).collect(),
        ))
    }

    fn dimension(&self) -> usize {
        8
    }

    fn name(&self) -> &str {
        "counting-stub"
    }
}

struct Harness {
    engine: IndexingEngine,
    store: Arc<SqliteVectorStore>,
    embedder: Arc<CountingEmbedder>,
}

async fn start_engine(root: &Path) -> Result<Harness> {
    let store = Arc::new(SqliteVectorStore::open_memory().await?);
    let embedder = Arc::new(CountingEmbedder::new());
    let registry = Arc::new(InMemoryRegistry::new());
    let config = IndexingEngineConfig::new(root.to_path_buf())
        .with_chunking(ChunkingConfig {
            max_size: 200,
            overlap: 0,
        })
        .with_max_workers(2)
        .with_debounce(Duration::from_millis(100));
    let engine = IndexingEngine::start(config, store.clone(), embedder.clone(), registry).await?;
    Ok(Harness {
        engine,
        store,
        embedder,
    })
}

/// Poll until `check` passes or the attempt budget runs out.
async fn wait_for<F>(what: &str, mut check: F) -> Result<()>
where
    F: AsyncFnMut() -> Result<bool>,
{
    for _ in 0..100 {
        if check().await? {
            return Ok(());
        }
        sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_startup_sweep_indexes_preexisting_files() -> Result<()> {
    let dir = tempdir()?;
    tokio::fs::write(dir.path().join("alpha.txt"), "Paragraph about shipping dates.").await?;
    tokio::fs::write(dir.path().join("beta.md"), "Notes on warehouse layout.").await?;
    tokio::fs::write(dir.path().join("ignored.bin"), b"\x00\x01\x02").await?;

    let harness = start_engine(dir.path()).await?;
    let store = harness.store.clone();
    wait_for("sweep to index both documents", async || {
        Ok(store.entry_count().await? >= 2)
    })
    .await?;

    let sources = harness.store.list_sources().await?;
    assert_eq!(sources, vec!["alpha.txt".to_string(), "beta.md".to_string()]);

    let stats = harness.engine.stats().await;
    assert_eq!(stats.files_indexed, 2);
    assert_eq!(stats.files_skipped, 1); // the .bin file
    assert_eq!(stats.errors, 0);

    harness.engine.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_created_file_is_picked_up_while_watching() -> Result<()> {
    let dir = tempdir()?;
    let harness = start_engine(dir.path()).await?;

    // Let the watcher attach before creating the file.
    sleep(Duration::from_millis(200)).await;
    tokio::fs::write(dir.path().join("fresh.txt"), "A new document appears.").await?;

    let store = harness.store.clone();
    wait_for("watcher to index the new file", async || {
        Ok(store.exists("fresh.txt_0").await?)
    })
    .await?;

    harness.engine.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_unchanged_rewrite_costs_no_embedding_calls() -> Result<()> {
    let dir = tempdir()?;
    tokio::fs::write(dir.path().join("stable.txt"), "Content that will not change.").await?;

    let harness = start_engine(dir.path()).await?;
    let store = harness.store.clone();
    wait_for("initial index", async || Ok(store.exists("stable.txt_0").await?)).await?;
    let embedded_after_first = harness.embedder.embedded();

    // Rewrite identical bytes; the event fires but the fingerprint gate
    // stops the pass before any embedding.
    tokio::fs::write(dir.path().join("stable.txt"), "Content that will not change.").await?;
    let engine = &harness.engine;
    wait_for("unchanged pass to be recorded", async || {
        Ok(engine.stats().await.files_unchanged >= 1)
    })
    .await?;

    assert_eq!(harness.embedder.embedded(), embedded_after_first);
    harness.engine.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_missing_root_is_created_and_shutdown_is_clean() -> Result<()> {
    let dir = tempdir()?;
    let root = dir.path().join("not_yet_here");
    assert!(!root.exists());

    let harness = start_engine(&root).await?;
    assert!(root.is_dir());

    harness.engine.shutdown().await?;
    Ok(())
}
