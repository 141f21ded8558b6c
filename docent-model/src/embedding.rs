//! The embedding client: text in, unit-normalized `f16` vector out.

use async_trait::async_trait;
use half::f16;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::EmbedError;
use crate::http::{self, HttpFailure};

/// Result of embedding a batch of texts.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each vector (0 when the batch was empty).
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Wrap a batch of vectors, inferring the dimension from the first.
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Number of vectors in the batch.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// `true` when the batch holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// A service that turns text into fixed-dimension vectors.
///
/// Implementations are injected as `Arc<dyn EmbeddingClient>` once at
/// startup; both the indexing pipeline and the answer agent call through
/// this trait and never construct a client themselves.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f16>, EmbedError>;

    /// Embed a batch of texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingResult, EmbedError>;

    /// Dimension of the vectors this client produces.
    fn dimension(&self) -> usize;

    /// Identifier for log lines.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// [`EmbeddingClient`] over an OpenAI-compatible `/embeddings` route.
pub struct HttpEmbeddingClient {
    config: ModelConfig,
    api_key: Option<String>,
    client: reqwest::Client,
    url: String,
}

impl HttpEmbeddingClient {
    /// Build a client from connection settings. Fails only if the
    /// underlying HTTP client cannot be constructed.
    pub fn new(config: ModelConfig) -> Result<Self, EmbedError> {
        let client = http::build_client(&config)?;
        let url = format!("{}/embeddings", config.base_url());
        let api_key = config.api_key();
        Ok(Self {
            config,
            api_key,
            client,
            url,
        })
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f16>, EmbedError> {
        let texts = vec![text.to_string()];
        let result = self.embed_batch(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_response("no embedding returned for text"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingResult, EmbedError> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!(count = texts.len(), model = %self.config.embedding_model, "embedding batch");
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
        };
        let response: EmbeddingResponse = http::post_json(
            &self.client,
            &self.url,
            self.api_key.as_deref(),
            &request,
            self.config.max_retries,
        )
        .await
        .map_err(|failure| match failure {
            HttpFailure::Transport(e) => EmbedError::from(e),
            HttpFailure::Malformed(m) => EmbedError::invalid_response(m),
            status => EmbedError::upstream(status.to_string()),
        })?;

        if response.data.len() != texts.len() {
            return Err(EmbedError::invalid_response(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The API is allowed to reorder entries; the index field is
        // authoritative.
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        let embeddings = data
            .into_iter()
            .map(|d| normalize_to_f16(d.embedding))
            .collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn name(&self) -> &str {
        &self.config.embedding_model
    }
}

/// Convert a wire-format f32 vector into a unit-normalized f16 vector.
pub fn normalize_to_f16(embedding: Vec<f32>) -> Vec<f16> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        embedding
            .into_iter()
            .map(|x| f16::from_f32(x / norm))
            .collect()
    } else {
        embedding.into_iter().map(f16::from_f32).collect()
    }
}
