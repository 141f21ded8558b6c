//! Delimited-text (CSV/TSV) rendering.

use crate::error::{ExtractError, Result};
use crate::extract::decode_text;

/// Parse delimited records and render them one per line with fields joined
/// by `", "`. The header row, if any, is rendered like any other record so
/// column names stay searchable. Ragged rows are tolerated.
pub fn extract_delimited(bytes: &[u8], delimiter: u8) -> Result<String> {
    let decoded = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(decoded.as_bytes());

    let mut lines: Vec<String> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(ExtractError::delimited)?;
        let line = record
            .iter()
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if !line.is_empty() {
            lines.push(line);
        }
    }
    Ok(lines.join("\n"))
}
