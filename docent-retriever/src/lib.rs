//! # docent-retriever
//!
//! The background half of the document question-answering system: it
//! watches a directory tree, pushes every created or modified document
//! through extraction, chunking, and embedding, and persists the result in
//! a SQLite-backed vector index that the foreground answer agent queries.
//!
//! ## Key components
//!
//! - [`storage`]: the [`VectorStore`](storage::VectorStore) trait and its
//!   SQLite implementation. One row per chunk, keyed by a deterministic id,
//!   with nearest-neighbor search over f16 embeddings.
//! - [`retrieval`]: the change registry (content fingerprints that gate
//!   re-indexing), the per-file indexing pipeline, the debounced directory
//!   watcher, and the engine that ties them together behind a bounded
//!   worker pool.
//!
//! ## Consistency model
//!
//! Indexing is at-least-once: a file's fingerprint is committed to the
//! registry only after every one of its chunks is durably stored, so a
//! failure mid-file leaves the registry untouched and the file is retried
//! on the next event or sweep. Store upserts are idempotent per chunk id,
//! so retried work converges instead of duplicating.

pub mod retrieval;
pub mod storage;

pub use retrieval::engine::{IndexStats, IndexingEngine, IndexingEngineConfig};
pub use retrieval::pipeline::{IndexOutcome, IndexingPipeline};
pub use retrieval::registry::{ChangeRegistry, Fingerprint, InMemoryRegistry, fingerprint};
pub use storage::{IndexEntry, SearchHit, StoreError, VectorStore};
pub use storage::sqlite_store::SqliteVectorStore;
