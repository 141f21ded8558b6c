//! Application configuration: a TOML file with working defaults, overridden
//! field by field from the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use docent_context::ChunkingConfig;
use docent_model::ModelConfig;
use docent_retriever::IndexingEngineConfig;
use serde::{Deserialize, Serialize};

use crate::agent::Verbosity;

/// Everything the `docent` binary can be told, all optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory of documents to watch and index.
    pub root: PathBuf,
    /// SQLite database file holding the vector index.
    pub db_path: PathBuf,
    /// Chunk sizing.
    pub chunking: ChunkingConfig,
    /// Chunks retrieved per question.
    pub retrieval_k: usize,
    /// How much of each answer to show.
    pub verbosity: Verbosity,
    /// Maximum files indexed concurrently.
    pub max_workers: usize,
    /// Quiet period before reacting to a filesystem event, in seconds.
    pub debounce_secs: u64,
    /// Files larger than this are not indexed.
    pub max_file_bytes: u64,
    /// Model endpoint and model names.
    pub model: ModelConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("docent_files"),
            db_path: PathBuf::from("docent.db"),
            chunking: ChunkingConfig::default(),
            retrieval_k: 5,
            verbosity: Verbosity::default(),
            max_workers: 4,
            debounce_secs: 2,
            max_file_bytes: 10 << 20,
            model: ModelConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file. Missing fields take their defaults; a missing
    /// or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// The engine settings this configuration implies.
    pub fn engine_config(&self) -> IndexingEngineConfig {
        IndexingEngineConfig::new(self.root.clone())
            .with_chunking(self.chunking)
            .with_max_workers(self.max_workers)
            .with_debounce(Duration::from_secs(self.debounce_secs))
            .with_batch_size(self.model.batch_size)
            .with_max_file_bytes(self.max_file_bytes)
    }
}
