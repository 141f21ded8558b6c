//! OOXML container extraction (docx, pptx, xlsx).
//!
//! All three formats are zip archives of XML parts. Parts are read with a
//! decompressed-size bound and walked as streaming XML events, so a
//! crafted archive cannot balloon memory.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{ExtractError, Result};

/// Decompressed byte cap for any single archive entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Workbook sheets processed at most.
const MAX_SHEETS: usize = 100;
/// Cells extracted per sheet at most.
const MAX_CELLS_PER_SHEET: usize = 100_000;

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>> {
    zip::ZipArchive::new(Cursor::new(bytes)).map_err(ExtractError::ooxml)
}

fn read_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>> {
    let entry = archive.by_name(name).map_err(ExtractError::ooxml)?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ExtractError::ooxml)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::ooxml(format!(
            "archive entry {name} exceeds {MAX_XML_ENTRY_BYTES} byte limit"
        )));
    }
    Ok(out)
}

/// Extract the body text of a `.docx`: every `w:t` run, with a line break
/// at the end of each `w:p` paragraph.
pub(crate) fn extract_document(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes)?;
    if !archive.file_names().any(|n| n == "word/document.xml") {
        return Err(ExtractError::ooxml("word/document.xml not found"));
    }
    let xml = read_entry_bounded(&mut archive, "word/document.xml")?;
    let text = collect_runs(&xml)?;
    Ok(text.trim().to_string())
}

/// Extract the text of a `.pptx`: slides in numeric order, `a:t` runs with
/// paragraph breaks, and a blank line between slides.
pub(crate) fn extract_slides(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes)?;
    let mut parts: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    // Part names sort lexicographically (slide10 before slide2); order by
    // the embedded slide number instead.
    parts.sort_by_key(|name| part_ordinal(name, "ppt/slides/slide"));

    let mut slides = Vec::new();
    for part in parts {
        let xml = read_entry_bounded(&mut archive, &part)?;
        let text = collect_runs(&xml)?;
        let text = text.trim();
        if !text.is_empty() {
            slides.push(text.to_string());
        }
    }
    Ok(slides.join("\n\n"))
}

/// Extract the cell text of an `.xlsx`: shared-string, inline-string, and
/// literal cell values, one sheet row per line, a blank line between sheets.
pub(crate) fn extract_workbook(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes)?;
    // sharedStrings.xml is optional; a workbook of nothing but numbers
    // has none.
    let shared = if archive.file_names().any(|n| n == "xl/sharedStrings.xml") {
        let xml = read_entry_bounded(&mut archive, "xl/sharedStrings.xml")?;
        read_shared_strings(&xml)?
    } else {
        Vec::new()
    };

    let mut parts: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    parts.sort_by_key(|name| part_ordinal(name, "xl/worksheets/sheet"));

    let mut sheets = Vec::new();
    for part in parts.into_iter().take(MAX_SHEETS) {
        let xml = read_entry_bounded(&mut archive, &part)?;
        let text = collect_sheet_rows(&xml, &shared)?;
        let text = text.trim();
        if !text.is_empty() {
            sheets.push(text.to_string());
        }
    }
    Ok(sheets.join("\n\n"))
}

/// Numeric ordinal embedded in an OOXML part name, e.g.
/// `ppt/slides/slide12.xml` -> 12. Unparseable names sort last.
fn part_ordinal(part: &str, prefix: &str) -> u32 {
    part.trim_start_matches(prefix)
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(u32::MAX)
}

/// Collect the text runs of `<*:t>` elements, appending a newline at the
/// close of each `<*:p>` paragraph. Works for both WordprocessingML (`w:`)
/// and DrawingML (`a:`) since only local names are inspected. Text is read
/// only immediately after a `t` start tag, so inter-element whitespace is
/// never picked up and run spacing survives verbatim.
fn collect_runs(xml: &[u8]) -> Result<String> {
    let mut out = String::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(Event::Text(text)) = reader.read_event_into(&mut buf) {
                        out.push_str(text.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"p" {
                    out.push('\n');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::ooxml(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// One entry per `<si>` element; rich-text runs inside a single `<si>` are
/// concatenated so shared-string indices stay aligned.
fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"si" {
                    current = Some(String::new());
                } else if e.local_name().as_ref() == b"t" && current.is_some() {
                    if let Ok(Event::Text(text)) = reader.read_event_into(&mut buf) {
                        if let Some(entry) = current.as_mut() {
                            entry.push_str(text.unescape().unwrap_or_default().as_ref());
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(current.take().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::ooxml(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Literal,
    Shared,
    Inline,
}

fn cell_kind_of(e: &quick_xml::events::BytesStart<'_>) -> CellKind {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"t" {
            return match attr.value.as_ref() {
                b"s" => CellKind::Shared,
                b"inlineStr" => CellKind::Inline,
                _ => CellKind::Literal,
            };
        }
    }
    CellKind::Literal
}

/// Walk one worksheet: cells of a row joined by spaces, rows by newlines.
/// Shared-string cells are resolved through `shared`; numeric and inline
/// values are taken verbatim.
fn collect_sheet_rows(xml: &[u8], shared: &[String]) -> Result<String> {
    let mut out = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_kind = CellKind::Literal;
    let mut in_value = false;
    let mut cells_seen = 0usize;

    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        if cells_seen >= MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"c" {
                    cell_kind = cell_kind_of(&e);
                } else if e.local_name().as_ref() == b"v" {
                    in_value = true;
                } else if e.local_name().as_ref() == b"t" && cell_kind == CellKind::Inline {
                    if let Ok(Event::Text(text)) = reader.read_event_into(&mut buf) {
                        let value = text.unescape().unwrap_or_default();
                        if !value.trim().is_empty() {
                            row.push(value.trim().to_string());
                            cells_seen += 1;
                        }
                    }
                }
            }
            Ok(Event::Text(text)) if in_value => {
                let value = text.unescape().unwrap_or_default();
                let value = value.trim();
                if !value.is_empty() {
                    match cell_kind {
                        CellKind::Shared => {
                            if let Ok(idx) = value.parse::<usize>() {
                                if let Some(entry) = shared.get(idx) {
                                    row.push(entry.clone());
                                    cells_seen += 1;
                                }
                            }
                        }
                        _ => {
                            row.push(value.to_string());
                            cells_seen += 1;
                        }
                    }
                }
                in_value = false;
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"v" {
                    in_value = false;
                } else if e.local_name().as_ref() == b"c" {
                    cell_kind = CellKind::Literal;
                } else if e.local_name().as_ref() == b"row" && !row.is_empty() {
                    out.push_str(&row.join(" "));
                    out.push('\n');
                    row.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::ooxml(e)),
            _ => {}
        }
        buf.clear();
    }
    if !row.is_empty() {
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    Ok(out)
}
