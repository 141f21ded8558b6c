//! Paragraph-first text chunking for retrieval.
//!
//! Documents are split into embeddable passages in two stages:
//!
//! 1. The text is divided at paragraph boundaries (a newline followed by an
//!    optionally-blank line), so semantically related sentences stay together.
//! 2. Any paragraph longer than the configured maximum is sliced into
//!    consecutive fixed-width windows of exactly `max_size` characters, with
//!    the remainder as the final window. Slicing inside a paragraph is purely
//!    size-based; windows never slide.
//!
//! Whitespace-only spans are dropped. When an overlap is configured, every
//! chunk after the first is prefixed with the trailing `overlap` characters
//! of its predecessor so that sentences cut at a boundary remain retrievable
//! from both sides. The first chunk of a document never carries a prefix.
//!
//! Chunking is pure: the same input always yields the same ordered sequence
//! of spans, which is what lets callers derive stable chunk identifiers from
//! the span's ordinal position. All sizes are counted in characters, not
//! bytes, so multi-byte text never splits mid-character.
//!
//! ```
//! use docent_context::{ChunkingConfig, TextChunker};
//!
//! let chunker = TextChunker::new(ChunkingConfig { max_size: 40, overlap: 0 });
//! let chunks = chunker.chunk("First paragraph.\n\nSecond paragraph.");
//! assert_eq!(chunks, vec!["First paragraph.", "Second paragraph."]);
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pattern marking a paragraph boundary: a newline, optional horizontal or
/// vertical whitespace, and another newline.
const PARAGRAPH_BREAK: &str = r"\n\s*\n";

/// Sizing knobs for [`TextChunker`], expressed in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Upper bound on the characters a single paragraph window may hold.
    /// A chunk that carries an overlap prefix may reach `max_size + overlap`.
    pub max_size: usize,
    /// Characters of the previous chunk prepended to each following chunk.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: 2500,
            overlap: 200,
        }
    }
}

/// Splits document text into ordered, size-bounded, optionally overlapping
/// spans. See the module docs for the exact algorithm.
pub struct TextChunker {
    config: ChunkingConfig,
    paragraph_break: Regex,
}

impl TextChunker {
    /// Creates a chunker with the given sizing. A `max_size` of zero is
    /// treated as one so the slicer always makes progress.
    pub fn new(config: ChunkingConfig) -> Self {
        TextChunker {
            config: ChunkingConfig {
                max_size: config.max_size.max(1),
                overlap: config.overlap,
            },
            paragraph_break: Regex::new(PARAGRAPH_BREAK).unwrap(),
        }
    }

    /// Splits `text` into ordered chunks.
    ///
    /// The result is deterministic for a given input and configuration.
    /// Empty and whitespace-only inputs yield an empty vector; this function
    /// never fails.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut spans: Vec<String> = Vec::new();
        for paragraph in self.paragraph_break.split(text) {
            for window in slice_windows(paragraph, self.config.max_size) {
                if !window.trim().is_empty() {
                    spans.push(window.to_string());
                }
            }
        }

        if self.config.overlap == 0 || spans.len() < 2 {
            return spans;
        }

        // Overlap prefixes are drawn from the untouched predecessor span,
        // so prefixes never compound across chunks.
        let mut overlapped = Vec::with_capacity(spans.len());
        overlapped.push(spans[0].clone());
        for i in 1..spans.len() {
            let tail = tail_chars(&spans[i - 1], self.config.overlap);
            overlapped.push(format!("{tail}{}", spans[i]));
        }
        overlapped
    }

    /// The sizing this chunker was built with.
    pub fn config(&self) -> ChunkingConfig {
        self.config
    }
}

/// Cuts `paragraph` into consecutive windows of exactly `max_size` characters
/// (the last window keeps the remainder). Cut points always land on char
/// boundaries.
fn slice_windows(paragraph: &str, max_size: usize) -> Vec<&str> {
    let mut windows = Vec::new();
    let mut start = 0;
    let mut chars_in_window = 0;
    for (idx, _) in paragraph.char_indices() {
        if chars_in_window == max_size {
            windows.push(&paragraph[start..idx]);
            start = idx;
            chars_in_window = 0;
        }
        chars_in_window += 1;
    }
    if start < paragraph.len() {
        windows.push(&paragraph[start..]);
    }
    windows
}

/// The final `n` characters of `s`, or all of `s` when it is shorter.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
