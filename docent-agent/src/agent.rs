//! The retrieval-augmented answer agent.
//!
//! One agent instance serves the whole interactive session. Each question
//! is routed first; only the retrieval route costs an embedding call, a
//! store query, and (when anything was retrieved) a generation call. The
//! agent never lets an upstream failure escape: `respond` always returns a
//! printable string, logging the underlying error and falling back to a
//! fixed apology so the loop keeps running.

use std::sync::Arc;

use docent_model::{EmbedError, EmbeddingClient, GenerateError, GenerationClient};
use docent_retriever::{SearchHit, StoreError, VectorStore};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::router::{Route, route};

/// Shown when retrieval finds nothing relevant.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't find any relevant information. Please try rephrasing your question.";

/// Shown when an upstream collaborator (store or model endpoint) fails.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, something went wrong while answering that. Please try again.";

/// Citation snippets carry at most this many characters of the chunk.
const SNIPPET_CHARS: usize = 200;

/// Errors from one answer attempt. Callers inside the interactive loop
/// never see these; `respond` converts them to [`APOLOGY_MESSAGE`].
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("embedding the query failed")]
    Embedding(#[from] EmbedError),
    #[error("querying the vector store failed")]
    Store(#[from] StoreError),
    #[error("generating the answer failed")]
    Generation(#[from] GenerateError),
}

/// How much of the generated answer to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// The full generated answer.
    #[default]
    Detailed,
    /// Only the first non-empty line.
    Concise,
}

/// One cited source with a short excerpt of the matched chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub source: String,
    pub snippet: String,
}

/// A complete answer: generated (or fallback) text plus its citations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl Answer {
    fn fallback() -> Self {
        Self {
            text: FALLBACK_MESSAGE.to_string(),
            citations: Vec::new(),
        }
    }
}

/// Answers questions against the shared vector store.
pub struct AnswerAgent {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    generator: Arc<dyn GenerationClient>,
    retrieval_k: usize,
    verbosity: Verbosity,
}

impl AnswerAgent {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingClient>,
        generator: Arc<dyn GenerationClient>,
        retrieval_k: usize,
        verbosity: Verbosity,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            retrieval_k: retrieval_k.max(1),
            verbosity,
        }
    }

    /// Route and answer one query, always producing printable text.
    pub async fn respond(&self, query: &str) -> String {
        match route(query) {
            Route::Casual(reply) => reply.to_string(),
            Route::ListSources => match self.list_sources().await {
                Ok(listing) => listing,
                Err(err) => {
                    error!("listing sources failed: {err:#}");
                    APOLOGY_MESSAGE.to_string()
                }
            },
            Route::Retrieval => match self.answer(query).await {
                Ok(answer) => self.render(&answer),
                Err(err) => {
                    error!("answering failed: {err:#}");
                    APOLOGY_MESSAGE.to_string()
                }
            },
        }
    }

    /// The retrieval path: embed, search, generate. An empty result set
    /// short-circuits to the fallback answer without a generation call.
    pub async fn answer(&self, query: &str) -> Result<Answer, AgentError> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.query(&embedding, self.retrieval_k).await?;
        if hits.is_empty() {
            debug!("no chunks retrieved, returning fallback");
            return Ok(Answer::fallback());
        }

        let context: Vec<String> = hits.iter().map(|hit| hit.content.clone()).collect();
        let text = self.generator.generate(query, &context).await?;
        Ok(Answer {
            text,
            citations: citations_from(&hits),
        })
    }

    async fn list_sources(&self) -> Result<String, StoreError> {
        let sources = self.store.list_sources().await?;
        if sources.is_empty() {
            return Ok("No sources found in the database.".to_string());
        }
        let listing = sources.iter().map(|source| format!("- {source}")).join("\n");
        Ok(format!("Available Sources:\n{listing}"))
    }

    fn render(&self, answer: &Answer) -> String {
        let text = match self.verbosity {
            Verbosity::Detailed => answer.text.clone(),
            Verbosity::Concise => first_line(&answer.text).to_string(),
        };
        if answer.citations.is_empty() {
            return text;
        }
        let sources = answer
            .citations
            .iter()
            .enumerate()
            .map(|(index, citation)| {
                format!("{}. {} — {}", index + 1, citation.source, citation.snippet)
            })
            .join("\n");
        format!("{text}\n\nSources:\n{sources}")
    }
}

/// Citations in retrieval order, one per distinct source.
fn citations_from(hits: &[SearchHit]) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();
    for hit in hits {
        if citations.iter().any(|c| c.source == hit.source) {
            continue;
        }
        citations.push(Citation {
            source: hit.source.clone(),
            snippet: snippet(&hit.content),
        });
    }
    citations
}

/// First `SNIPPET_CHARS` characters, suffixed with an ellipsis when the
/// chunk is longer. Counts chars, not bytes, so multibyte text is safe.
fn snippet(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or(text)
}
