//! Connection settings shared by the embedding and generation clients.

use serde::{Deserialize, Serialize};

/// Configuration for the model endpoint.
///
/// `endpoint` is the base URL up to but excluding the route, e.g.
/// `http://127.0.0.1:11434/v1`; the clients append `/embeddings` and
/// `/chat/completions`. All fields have working local defaults so a config
/// file only needs to name what differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API.
    pub endpoint: String,
    /// Bearer token, if the endpoint wants one. Falls back to the
    /// `DOCENT_API_KEY` then `OPENAI_API_KEY` environment variables.
    pub api_key: Option<String>,
    /// Model name sent with embedding requests.
    pub embedding_model: String,
    /// Model name sent with generation requests.
    pub generation_model: String,
    /// Dimension the embedding model is expected to produce.
    pub dimension: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Texts per embedding request.
    pub batch_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434/v1".to_string(),
            api_key: None,
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "llama3.2".to_string(),
            dimension: 768,
            timeout_secs: 30,
            max_retries: 3,
            batch_size: 16,
        }
    }
}

impl ModelConfig {
    /// Resolve the API key from config or environment.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("DOCENT_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }

    /// Endpoint with at most one trailing slash trimmed, ready for route
    /// concatenation.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_local() {
        let config = ModelConfig::default();
        assert_eq!(config.endpoint, "http://127.0.0.1:11434/v1");
        assert_eq!(config.dimension, 768);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.batch_size, 16);
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let config = ModelConfig {
            endpoint: "http://example.test/v1/".to_string(),
            ..ModelConfig::default()
        };
        assert_eq!(config.base_url(), "http://example.test/v1");
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let config = ModelConfig {
            api_key: Some("sk-test".to_string()),
            ..ModelConfig::default()
        };
        assert_eq!(config.api_key().as_deref(), Some("sk-test"));
    }
}
