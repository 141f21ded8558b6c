//! Per-file indexing pipeline: extract → chunk → embed → store.
//!
//! The pipeline is the only writer of both the vector store and the change
//! registry, and it orders those writes carefully: the registry records a
//! file's fingerprint only after *every* chunk of that file has been
//! durably upserted. A failure anywhere in between leaves the registry
//! untouched, so the file is retried in full on the next event or sweep
//! (at-least-once, never silently incomplete).
//!
//! Chunk ids are a deterministic function of the source path (relative to
//! the watch root) and the chunk's ordinal, so every pass over the same
//! content writes the same ids and the store stays free of duplicates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use docent_context::{ChunkingConfig, TextChunker};
use docent_extract::{DocumentFormat, extract};
use docent_model::EmbeddingClient;
use tracing::{debug, info, warn};

use super::registry::{ChangeRegistry, fingerprint};
use crate::storage::{IndexEntry, VectorStore};

/// What happened to one file on one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The extension is outside the supported format set; nothing read.
    Unsupported,
    /// The file exceeds the configured size cap; skipped with a warning.
    TooLarge,
    /// Content fingerprint matches the registry; no downstream work.
    Unchanged,
    /// Extraction yielded no text; fingerprint committed so the file is
    /// not re-extracted on every sweep.
    Empty,
    /// The file was (re-)indexed. `upserted` counts the chunks actually
    /// written; unchanged chunks of a partially modified file are skipped.
    Indexed { chunks: usize, upserted: usize },
}

/// Orchestrates indexing of a single file. Shared by all workers.
pub struct IndexingPipeline {
    root: PathBuf,
    chunker: TextChunker,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    registry: Arc<dyn ChangeRegistry>,
    batch_size: usize,
    max_file_bytes: u64,
}

impl IndexingPipeline {
    pub fn new(
        root: PathBuf,
        chunking: ChunkingConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        registry: Arc<dyn ChangeRegistry>,
        batch_size: usize,
        max_file_bytes: u64,
    ) -> Self {
        Self {
            root,
            chunker: TextChunker::new(chunking),
            store,
            embedder,
            registry,
            batch_size: batch_size.max(1),
            max_file_bytes,
        }
    }

    /// The source identifier recorded in the store: the path relative to
    /// the watch root when possible, the full path otherwise.
    fn source_key(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    /// Run the full pipeline for one file.
    ///
    /// Skips (`Unsupported`, `TooLarge`, `Unchanged`, `Empty`) are normal
    /// outcomes, not errors. An `Err` means the pass aborted partway; the
    /// registry is left unchanged so the file is retried later.
    pub async fn index_file(&self, path: &Path) -> Result<IndexOutcome> {
        let Some(format) = DocumentFormat::from_path(path) else {
            debug!(file = %path.display(), "unsupported format, skipping");
            return Ok(IndexOutcome::Unsupported);
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("reading metadata of {}", path.display()))?;
        if metadata.len() > self.max_file_bytes {
            warn!(
                file = %path.display(),
                size = metadata.len(),
                cap = self.max_file_bytes,
                "file exceeds size cap, skipping"
            );
            return Ok(IndexOutcome::TooLarge);
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let file_fingerprint = fingerprint(&bytes);
        if self.registry.is_current(path, &file_fingerprint) {
            debug!(file = %path.display(), "unchanged since last index, skipping");
            return Ok(IndexOutcome::Unchanged);
        }

        let text = extract(format, &bytes)
            .with_context(|| format!("extracting text from {}", path.display()))?;
        if text.trim().is_empty() {
            debug!(file = %path.display(), "no recoverable text, skipping");
            self.registry.commit(path, file_fingerprint);
            return Ok(IndexOutcome::Empty);
        }

        let chunks = self.chunker.chunk(&text);
        let source = self.source_key(path);

        // Chunks whose stored hash already matches are skipped; after a
        // partial edit only the changed positions are re-embedded.
        let mut pending: Vec<(usize, String, [u8; 32])> = Vec::new();
        for (ordinal, chunk_text) in chunks.iter().enumerate() {
            let id = IndexEntry::id_for(&source, ordinal);
            let chunk_hash = *blake3::hash(chunk_text.as_bytes()).as_bytes();
            if self.store.content_hash(&id).await? == Some(chunk_hash) {
                debug!(id, "chunk content unchanged, not re-embedding");
                continue;
            }
            pending.push((ordinal, chunk_text.clone(), chunk_hash));
        }

        let mut upserted = 0;
        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|(_, text, _)| text.clone()).collect();
            let result = self
                .embedder
                .embed_batch(&texts)
                .await
                .with_context(|| format!("embedding chunks of {}", path.display()))?;
            if result.embeddings.len() != batch.len() {
                bail!(
                    "embedding count mismatch for {}: sent {}, received {}",
                    path.display(),
                    batch.len(),
                    result.embeddings.len()
                );
            }

            for ((ordinal, chunk_text, chunk_hash), embedding) in
                batch.iter().zip(result.embeddings)
            {
                let entry = IndexEntry {
                    id: IndexEntry::id_for(&source, *ordinal),
                    source: source.clone(),
                    ordinal: *ordinal,
                    content: chunk_text.clone(),
                    content_hash: *chunk_hash,
                    embedding,
                };
                self.store
                    .upsert(&entry)
                    .await
                    .with_context(|| format!("storing chunk {}", entry.id))?;
                upserted += 1;
            }
        }

        // Every chunk is durably stored; only now is the file considered
        // indexed at this fingerprint.
        self.registry.commit(path, file_fingerprint);
        info!(
            file = %path.display(),
            format = format.label(),
            fingerprint = %hex::encode(&file_fingerprint[..4]),
            chunks = chunks.len(),
            upserted,
            "indexed"
        );
        Ok(IndexOutcome::Indexed {
            chunks: chunks.len(),
            upserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::registry::InMemoryRegistry;
    use crate::storage::sqlite_store::SqliteVectorStore;
    use async_trait::async_trait;
    use docent_model::{EmbedError, EmbeddingResult, embedding::normalize_to_f16};
    use half::f16;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Deterministic offline embedder that counts every text it embeds.
    struct StubEmbedder {
        texts_embedded: AtomicUsize,
    }

    impl StubEmbedder {
        fn new() -> Self {
            Self {
                texts_embedded: AtomicUsize::new(0),
            }
        }

        fn embedded(&self) -> usize {
            self.texts_embedded.load(Ordering::SeqCst)
        }
    }

    fn stub_vector(text: &str) -> Vec<f16> {
        let mut buckets = [0.0f32; 8];
        for byte in text.bytes() {
            buckets[(byte as usize) % 8] += 1.0;
        }
        normalize_to_f16(buckets.to_vec())
    }

    #[async_trait]
    impl EmbeddingClient for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f16>, EmbedError> {
            self.texts_embedded.fetch_add(1, Ordering::SeqCst);
            Ok(stub_vector(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingResult, EmbedError> {
            self.texts_embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(EmbeddingResult::new(
                texts.iter().map(|t| stub_vector(t)).collect(),
            ))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Embedder that always fails, for abort-path tests.
    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingClient for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f16>, EmbedError> {
            Err(EmbedError::upstream("stub outage"))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<EmbeddingResult, EmbedError> {
            Err(EmbedError::upstream("stub outage"))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn name(&self) -> &str {
            "failing-stub"
        }
    }

    struct Fixture {
        pipeline: IndexingPipeline,
        store: Arc<SqliteVectorStore>,
        embedder: Arc<StubEmbedder>,
        registry: Arc<InMemoryRegistry>,
        dir: tempfile::TempDir,
    }

    async fn fixture() -> anyhow::Result<Fixture> {
        let dir = tempdir()?;
        let store = Arc::new(SqliteVectorStore::open_memory().await?);
        let embedder = Arc::new(StubEmbedder::new());
        let registry = Arc::new(InMemoryRegistry::new());
        let pipeline = IndexingPipeline::new(
            dir.path().to_path_buf(),
            ChunkingConfig {
                max_size: 100,
                overlap: 0,
            },
            store.clone(),
            embedder.clone(),
            registry.clone(),
            16,
            1 << 20,
        );
        Ok(Fixture {
            pipeline,
            store,
            embedder,
            registry,
            dir,
        })
    }

    const PARAGRAPH_ONE: &str = "The first paragraph talks about widget inventory levels and \
how restocking should work when supply runs low across the warehouse.";
    const PARAGRAPH_TWO: &str = "The second paragraph covers delivery schedules.";

    #[tokio::test]
    async fn test_two_paragraph_file_yields_two_deterministic_ids() -> anyhow::Result<()> {
        let f = fixture().await?;
        let file = f.dir.path().join("file.txt");
        tokio::fs::write(&file, format!("{PARAGRAPH_ONE}\n\n{PARAGRAPH_TWO}")).await?;

        // max_size is 100 in the fixture; the long first paragraph splits
        // into windows, so use a config sized for the scenario instead.
        let pipeline = IndexingPipeline::new(
            f.dir.path().to_path_buf(),
            ChunkingConfig {
                max_size: 400,
                overlap: 0,
            },
            f.store.clone(),
            f.embedder.clone(),
            f.registry.clone(),
            16,
            1 << 20,
        );

        let outcome = pipeline.index_file(&file).await?;
        assert_eq!(
            outcome,
            IndexOutcome::Indexed {
                chunks: 2,
                upserted: 2
            }
        );
        assert!(f.store.exists("file.txt_0").await?);
        assert!(f.store.exists("file.txt_1").await?);
        assert_eq!(f.store.entry_count().await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_unchanged_file_makes_zero_embedding_calls() -> anyhow::Result<()> {
        let f = fixture().await?;
        let file = f.dir.path().join("notes.txt");
        tokio::fs::write(&file, "Stable content that does not change.").await?;

        f.pipeline.index_file(&file).await?;
        let calls_after_first = f.embedder.embedded();
        assert!(calls_after_first > 0);

        let outcome = f.pipeline.index_file(&file).await?;
        assert_eq!(outcome, IndexOutcome::Unchanged);
        assert_eq!(f.embedder.embedded(), calls_after_first);
        Ok(())
    }

    #[tokio::test]
    async fn test_modified_paragraph_upserts_only_its_chunk() -> anyhow::Result<()> {
        let f = fixture().await?;
        let file = f.dir.path().join("file.txt");
        tokio::fs::write(&file, "First paragraph stays put.\n\nSecond paragraph, version one.")
            .await?;
        f.pipeline.index_file(&file).await?;
        assert_eq!(f.store.entry_count().await?, 2);

        tokio::fs::write(&file, "First paragraph stays put.\n\nSecond paragraph, version two.")
            .await?;
        let outcome = f.pipeline.index_file(&file).await?;
        assert_eq!(
            outcome,
            IndexOutcome::Indexed {
                chunks: 2,
                upserted: 1
            }
        );
        // No duplicate ids: still exactly the two deterministic entries.
        assert_eq!(f.store.entry_count().await?, 2);
        let hash = f.store.content_hash("file.txt_1").await?;
        assert_eq!(
            hash,
            Some(*blake3::hash(b"Second paragraph, version two.").as_bytes())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_skipped_without_reading() -> anyhow::Result<()> {
        let f = fixture().await?;
        let file = f.dir.path().join("binary.exe");
        tokio::fs::write(&file, b"\x7fELF").await?;

        assert_eq!(f.pipeline.index_file(&file).await?, IndexOutcome::Unsupported);
        assert_eq!(f.embedder.embedded(), 0);
        assert_eq!(f.store.entry_count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_file_commits_fingerprint() -> anyhow::Result<()> {
        let f = fixture().await?;
        let file = f.dir.path().join("blank.txt");
        tokio::fs::write(&file, "   \n\n  ").await?;

        assert_eq!(f.pipeline.index_file(&file).await?, IndexOutcome::Empty);
        // Second pass sees the committed fingerprint and stops early.
        assert_eq!(f.pipeline.index_file(&file).await?, IndexOutcome::Unchanged);
        assert_eq!(f.embedder.embedded(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_file_is_skipped() -> anyhow::Result<()> {
        let f = fixture().await?;
        let pipeline = IndexingPipeline::new(
            f.dir.path().to_path_buf(),
            ChunkingConfig::default(),
            f.store.clone(),
            f.embedder.clone(),
            f.registry.clone(),
            16,
            8, // eight-byte cap
        );
        let file = f.dir.path().join("big.txt");
        tokio::fs::write(&file, "definitely more than eight bytes").await?;

        assert_eq!(pipeline.index_file(&file).await?, IndexOutcome::TooLarge);
        assert_eq!(f.embedder.embedded(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_leaves_registry_untouched() -> anyhow::Result<()> {
        let f = fixture().await?;
        let file = f.dir.path().join("broken.pdf");
        tokio::fs::write(&file, b"this is not a pdf").await?;

        assert!(f.pipeline.index_file(&file).await.is_err());
        assert_eq!(f.registry.last_indexed(&file), None);
        assert_eq!(f.store.entry_count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_without_commit() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = Arc::new(SqliteVectorStore::open_memory().await?);
        let registry = Arc::new(InMemoryRegistry::new());
        let pipeline = IndexingPipeline::new(
            dir.path().to_path_buf(),
            ChunkingConfig::default(),
            store.clone(),
            Arc::new(FailingEmbedder),
            registry.clone(),
            16,
            1 << 20,
        );
        let file = dir.path().join("doc.txt");
        tokio::fs::write(&file, "content that would need embedding").await?;

        assert!(pipeline.index_file(&file).await.is_err());
        // Not committed: the file will be retried on the next pass.
        assert_eq!(registry.last_indexed(&file), None);
        assert_eq!(store.entry_count().await?, 0);
        Ok(())
    }
}
