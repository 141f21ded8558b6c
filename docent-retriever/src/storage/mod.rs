//! Storage abstraction for the vector index.
//!
//! The index holds one [`IndexEntry`] per chunk, keyed by a deterministic
//! id derived from the chunk's source path and ordinal position. Because
//! ids are deterministic, re-indexing an unchanged file writes the same
//! rows it wrote last time: upserts are the only write operation and they
//! are idempotent.
//!
//! [`VectorStore`] is the seam between the indexing pipeline and the
//! answer agent; both sides hold an `Arc<dyn VectorStore>` and never name
//! the SQLite implementation directly.

use async_trait::async_trait;
use half::f16;

pub mod sqlite_store;

/// Result type for store operations, using [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error type for the vector index.
///
/// Any persistence-layer failure surfaces as `Unavailable`. Per-entry
/// writes are transactional, so an unavailable store never holds a
/// partially written entry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing database could not serve the request.
    #[error("vector store unavailable: {source}")]
    Unavailable {
        #[from]
        source: sqlx::Error,
    },
}

/// One persisted chunk: text, embedding, and source metadata.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Deterministic id, `"{source}_{ordinal}"`.
    pub id: String,
    /// Source path relative to the watch root.
    pub source: String,
    /// Position of this chunk within its source document.
    pub ordinal: usize,
    /// The chunk text.
    pub content: String,
    /// BLAKE3 hash of `content`, used to skip re-embedding unchanged
    /// chunks.
    pub content_hash: [u8; 32],
    /// Unit-normalized embedding vector.
    pub embedding: Vec<f16>,
}

impl IndexEntry {
    /// The id every entry for (`source`, `ordinal`) carries, on every
    /// indexing pass.
    pub fn id_for(source: &str, ordinal: usize) -> String {
        format!("{source}_{ordinal}")
    }
}

/// One nearest-neighbor match, closest first when returned from
/// [`VectorStore::query`].
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Source path of the matched chunk.
    pub source: String,
    /// Ordinal of the matched chunk within its source.
    pub ordinal: usize,
    /// The matched chunk text.
    pub content: String,
    /// Cosine distance to the query vector (0 = identical direction).
    pub distance: f32,
}

/// The persistent vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or atomically overwrite the entry with `entry.id`.
    async fn upsert(&self, entry: &IndexEntry) -> Result<()>;

    /// Whether an entry with this id exists.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// The stored content hash for `id`, if the entry exists. Lets the
    /// pipeline skip unchanged chunks without fetching their text.
    async fn content_hash(&self, id: &str) -> Result<Option<[u8; 32]>>;

    /// Up to `k` entries nearest to `embedding`, ascending by distance.
    /// An empty store yields an empty vector, never an error.
    async fn query(&self, embedding: &[f16], k: usize) -> Result<Vec<SearchHit>>;

    /// The distinct source paths currently indexed. May name files that no
    /// longer exist on disk; deletions are not propagated to the store.
    async fn list_sources(&self) -> Result<Vec<String>>;

    /// Total number of entries.
    async fn entry_count(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_is_source_and_ordinal() {
        assert_eq!(IndexEntry::id_for("notes/plan.txt", 0), "notes/plan.txt_0");
        assert_eq!(IndexEntry::id_for("a.pdf", 12), "a.pdf_12");
    }
}
