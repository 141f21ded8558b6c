//! # docent-extract
//!
//! Converts heterogeneous document files into plain UTF-8 text for the
//! indexing pipeline. Formats are a closed enumeration recognized by file
//! extension ([`DocumentFormat`]); each variant is extracted by a pure
//! `bytes -> text` function with no shared state:
//!
//! - **Text** (`.txt`, `.text`, `.md`, `.log`): decoded with BOM-based
//!   encoding detection and a lossy fallback, so undecodable bytes are
//!   substituted instead of failing the file.
//! - **Delimited** (`.csv`, `.tsv`): parsed with the `csv` crate and
//!   rendered one record per line.
//! - **Workbook** (`.xlsx`): shared-string and literal cell values, one
//!   sheet row per line.
//! - **Paged** (`.pdf`): `pdf-extract` over the raw bytes.
//! - **SlideDeck** (`.pptx`): slide XML parts in numeric slide order.
//! - **Document** (`.docx`): `w:t` runs with paragraph breaks preserved.
//!
//! A file that yields zero recoverable text is not an error: extraction
//! returns an empty string and the caller decides to skip it. Corrupt or
//! unreadable input surfaces as [`ExtractError`].

pub mod error;
pub mod extract;
pub mod format;
mod ooxml;
mod tabular;

pub use error::{ExtractError, Result};
pub use extract::{decode_text, extract, extract_path};
pub use format::DocumentFormat;
