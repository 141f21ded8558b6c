//! # docent-model
//!
//! Clients for the two remote model services the pipeline depends on:
//!
//! - [`EmbeddingClient`]: text in, fixed-dimension vector out. Used by the
//!   indexing pipeline (chunk batches) and the answer agent (single query).
//! - [`GenerationClient`]: question plus retrieved context passages in,
//!   natural-language answer out.
//!
//! Both traits are object-safe so callers hold `Arc<dyn EmbeddingClient>` /
//! `Arc<dyn GenerationClient>` injected once at startup; nothing in this
//! crate is process-global. The HTTP implementations speak the
//! OpenAI-compatible `/embeddings` and `/chat/completions` JSON shapes, so
//! they work against OpenAI itself as well as local servers (Ollama,
//! LM Studio, vLLM) that expose the same surface.
//!
//! Every request carries a timeout and is retried a bounded number of times
//! with exponential backoff on 429/5xx and transport failures; other client
//! errors fail fast. Embedding vectors arrive as f32 on the wire and are
//! unit-normalized into `f16` for compact storage.

pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
mod http;

pub use config::ModelConfig;
pub use embedding::{EmbeddingClient, EmbeddingResult, HttpEmbeddingClient};
pub use error::{EmbedError, GenerateError};
pub use generation::{GenerationClient, HttpGenerationClient};
