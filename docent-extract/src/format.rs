//! The closed set of document formats the extractor understands.

use std::path::Path;

/// Document format tag, recognized from the file extension.
///
/// The set is closed on purpose: the indexing pipeline asks for the format
/// first and skips anything unrecognized before reading file contents, so an
/// unknown extension never costs an extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    /// Plain text: `.txt`, `.text`, `.md`, `.log`.
    Text,
    /// Delimited records with the given field separator: `.csv`, `.tsv`.
    Delimited { delimiter: u8 },
    /// Spreadsheet workbook: `.xlsx`.
    Workbook,
    /// Paginated document: `.pdf`.
    Paged,
    /// Presentation slide deck: `.pptx`.
    SlideDeck,
    /// Structured word-processing document: `.docx`.
    Document,
}

impl DocumentFormat {
    /// Recognize a format from the path's extension, case-insensitively.
    /// Returns `None` for anything outside the closed set.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" | "text" | "md" | "log" => Some(Self::Text),
            "csv" => Some(Self::Delimited { delimiter: b',' }),
            "tsv" => Some(Self::Delimited { delimiter: b'\t' }),
            "xlsx" => Some(Self::Workbook),
            "pdf" => Some(Self::Paged),
            "pptx" => Some(Self::SlideDeck),
            "docx" => Some(Self::Document),
            _ => None,
        }
    }

    /// Short human-readable tag for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Delimited { .. } => "delimited",
            Self::Workbook => "workbook",
            Self::Paged => "pdf",
            Self::SlideDeck => "slides",
            Self::Document => "document",
        }
    }
}
