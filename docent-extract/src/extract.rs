//! Format dispatch and plain-text decoding.

use std::path::Path;

use crate::error::{ExtractError, Result};
use crate::format::DocumentFormat;
use crate::{ooxml, tabular};

/// Extract plain text from `bytes` interpreted as `format`.
///
/// Each arm is a pure function of the bytes. An `Ok` result may be empty;
/// an empty result means the file genuinely holds no recoverable text and
/// the caller is expected to skip it rather than treat it as a failure.
pub fn extract(format: DocumentFormat, bytes: &[u8]) -> Result<String> {
    match format {
        DocumentFormat::Text => Ok(decode_text(bytes)),
        DocumentFormat::Delimited { delimiter } => tabular::extract_delimited(bytes, delimiter),
        DocumentFormat::Workbook => ooxml::extract_workbook(bytes),
        DocumentFormat::Paged => extract_pdf(bytes),
        DocumentFormat::SlideDeck => ooxml::extract_slides(bytes),
        DocumentFormat::Document => ooxml::extract_document(bytes),
    }
}

/// Extract plain text from `bytes`, recognizing the format from `path`.
///
/// Unlike [`extract`], which takes an already-recognized format, this entry
/// point reports an unrecognized extension as
/// [`ExtractError::UnsupportedFormat`]. Callers that want to skip unknown
/// files without reading them should probe [`DocumentFormat::from_path`]
/// first instead.
pub fn extract_path(path: &Path, bytes: &[u8]) -> Result<String> {
    let format =
        DocumentFormat::from_path(path).ok_or_else(|| ExtractError::unsupported(path))?;
    extract(format, bytes)
}

/// Decode raw bytes into text without ever failing.
///
/// Encoding is sniffed from the byte-order mark: UTF-16 (either endianness)
/// is converted, a UTF-8 BOM is stripped. Everything else is tried as strict
/// UTF-8 first and falls back to a lossy decode that substitutes undecodable
/// bytes with U+FFFD.
pub fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => lossy(rest),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        _ => lossy(bytes),
    }
}

fn lossy(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| combine([pair[0], pair[1]]))
        .collect();
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(ExtractError::pdf)
}
