//! SQLite implementation of the vector index.
//!
//! One table, one row per chunk:
//!
//! ```sql
//! CREATE TABLE entries (
//!     id TEXT PRIMARY KEY,         -- "{source}_{ordinal}"
//!     source TEXT NOT NULL,        -- path relative to the watch root
//!     ordinal INTEGER NOT NULL,    -- chunk position within the source
//!     content TEXT NOT NULL,       -- chunk text
//!     content_hash BLOB NOT NULL,  -- blake3 of content (32 bytes)
//!     embedding BLOB NOT NULL,     -- little-endian f16 vector
//!     indexed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
//! );
//! ```
//!
//! Writes go through a single `INSERT ... ON CONFLICT(id) DO UPDATE`, so
//! each entry is replaced atomically or not at all. Similarity search loads
//! the embedded rows and ranks them by cosine distance in memory; at this
//! design's scale (one directory of documents) that beats maintaining an
//! ANN structure.

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use async_trait::async_trait;
use half::f16;

use super::{IndexEntry, Result, SearchHit, VectorStore};

/// SQLite-backed [`VectorStore`].
#[derive(Clone, Debug)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (creating if missing) a persistent store at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .create_if_missing(true)
                .auto_vacuum(sqlx::sqlite::SqliteAutoVacuum::Full)
                .page_size(1 << 16)
                .optimize_on_close(true, 1 << 10),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Open an in-memory store for tests.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                content TEXT NOT NULL,
                content_hash BLOB NOT NULL,
                embedding BLOB NOT NULL,
                indexed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source)")
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, entry: &IndexEntry) -> Result<()> {
        let embedding_bytes = bytemuck::cast_slice::<f16, u8>(&entry.embedding);
        sqlx::query(
            r#"
            INSERT INTO entries (id, source, ordinal, content, content_hash, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                source = excluded.source,
                ordinal = excluded.ordinal,
                content = excluded.content,
                content_hash = excluded.content_hash,
                embedding = excluded.embedding,
                indexed_at = datetime('now')
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.source)
        .bind(entry.ordinal as i64)
        .bind(&entry.content)
        .bind(&entry.content_hash[..])
        .bind(embedding_bytes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn content_hash(&self, id: &str) -> Result<Option<[u8; 32]>> {
        let bytes: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT content_hash FROM entries WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(bytes.and_then(|b| <[u8; 32]>::try_from(b.as_slice()).ok()))
    }

    async fn query(&self, embedding: &[f16], k: usize) -> Result<Vec<SearchHit>> {
        let rows = sqlx::query("SELECT source, ordinal, content, embedding FROM entries")
            .fetch_all(&self.pool)
            .await?;

        let mut hits: Vec<SearchHit> = Vec::with_capacity(rows.len());
        for row in rows {
            let source: String = row.get("source");
            let ordinal: i64 = row.get("ordinal");
            let content: String = row.get("content");
            let embedding_bytes: Vec<u8> = row.get("embedding");
            let stored = bytemuck::cast_slice::<u8, f16>(&embedding_bytes);
            hits.push(SearchHit {
                source,
                ordinal: ordinal as usize,
                content,
                distance: cosine_distance(embedding, stored),
            });
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        let sources: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT source FROM entries ORDER BY source")
                .fetch_all(&self.pool)
                .await?;
        Ok(sources)
    }

    async fn entry_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

/// Cosine distance (1 − cosine similarity), accumulated in f32.
///
/// A dimension mismatch or a zero vector yields the maximum distance of
/// 2.0 so such entries rank behind every real match.
fn cosine_distance(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = x.to_f32();
        let y = y.to_f32();
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm = norm_a.sqrt() * norm_b.sqrt();
    if norm == 0.0 { 2.0 } else { 1.0 - dot / norm }
}
