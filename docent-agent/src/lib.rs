//! # docent-agent
//!
//! The foreground half of the document question-answering system, plus the
//! `docent` binary that ties both halves together. The binary starts the
//! background indexing engine over the watch root, then answers questions
//! interactively: each query is routed (casual, source listing, or
//! retrieval), retrieval queries are embedded and matched against the
//! shared vector index, and matched chunks are handed to the generation
//! model as context.
//!
//! The two halves share only the vector store and the change registry;
//! answers reflect whatever indexing has completed so far.

pub mod agent;
pub mod config;
pub mod repl;
pub mod router;

use std::sync::Arc;

use anyhow::{Context, Result};
use docent_model::{
    EmbeddingClient, GenerationClient, HttpEmbeddingClient, HttpGenerationClient,
};
use docent_retriever::{
    ChangeRegistry, IndexingEngine, InMemoryRegistry, SqliteVectorStore, VectorStore,
};
use tracing::info;

pub use agent::{AnswerAgent, Verbosity};
pub use config::AppConfig;

/// Wire up both halves and run the interactive session to completion.
pub async fn run(config: AppConfig) -> Result<()> {
    let store: Arc<dyn VectorStore> = Arc::new(
        SqliteVectorStore::open(&config.db_path)
            .await
            .with_context(|| format!("opening vector store at {}", config.db_path.display()))?,
    );
    let embedder: Arc<dyn EmbeddingClient> =
        Arc::new(HttpEmbeddingClient::new(config.model.clone())?);
    let generator: Arc<dyn GenerationClient> =
        Arc::new(HttpGenerationClient::new(config.model.clone())?);
    let registry: Arc<dyn ChangeRegistry> = Arc::new(InMemoryRegistry::new());

    let engine = IndexingEngine::start(
        config.engine_config(),
        store.clone(),
        embedder.clone(),
        registry,
    )
    .await
    .context("starting indexing engine")?;

    let agent = AnswerAgent::new(
        store,
        embedder,
        generator,
        config.retrieval_k,
        config.verbosity,
    );
    repl::run_loop(&agent).await?;

    let stats = engine.stats().await;
    info!(?stats, "session ended");
    engine.shutdown().await?;
    Ok(())
}
