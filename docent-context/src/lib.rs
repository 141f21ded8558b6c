pub mod text;

// Re-export the chunking types for external use
pub use text::{ChunkingConfig, TextChunker};
