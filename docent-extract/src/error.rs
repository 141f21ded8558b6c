//! Error types for document text extraction

use std::path::PathBuf;

/// Result type for extraction operations, using [`ExtractError`].
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Error type covering every way extraction can fail.
///
/// [`ExtractError::UnsupportedFormat`] means the file's extension is outside
/// the closed format set and the file should be skipped without reading it.
/// Every other variant means the file claimed a supported format but could
/// not be decoded (corrupt archive, malformed XML, broken PDF structure).
/// All of these are recoverable from the pipeline's point of view: the file
/// is skipped and logged, and indexing of other files continues.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The file extension does not map to any known document format.
    #[error("unsupported document format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// The PDF structure could not be parsed.
    #[error("PDF extraction failed: {message}")]
    Pdf { message: String },

    /// An OOXML container (docx/pptx/xlsx) was corrupt or over limits.
    #[error("OOXML extraction failed: {message}")]
    Ooxml { message: String },

    /// A delimited file could not be parsed as records.
    #[error("delimited text extraction failed: {message}")]
    Delimited { message: String },
}

impl ExtractError {
    /// Create an unsupported-format error for the given path.
    pub fn unsupported(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedFormat { path: path.into() }
    }

    /// Wrap a PDF parser failure.
    pub fn pdf(message: impl ToString) -> Self {
        Self::Pdf {
            message: message.to_string(),
        }
    }

    /// Wrap an OOXML container or XML failure.
    pub fn ooxml(message: impl ToString) -> Self {
        Self::Ooxml {
            message: message.to_string(),
        }
    }

    /// Wrap a CSV/TSV parse failure.
    pub fn delimited(message: impl ToString) -> Self {
        Self::Delimited {
            message: message.to_string(),
        }
    }
}
