//! Page-aware PDF text extraction
//!
//! Walks each page's decoded content stream and reconstructs reading order
//! from the text operators: runs on the same baseline are joined without a
//! break, and a vertical text-position change starts a new line.

use lopdf::content::Content;
use lopdf::{Document, Object};

use crate::error::{Error, Result};

use super::extractor::PageText;

/// Extract per-page text from PDF bytes. Page numbers are 1-indexed; pages
/// with no extractable text keep an empty entry so numbering stays intact.
pub fn extract_pdf_pages(data: &[u8], file_name: &str) -> Result<Vec<PageText>> {
    let doc = Document::load_mem(data)
        .map_err(|e| Error::extract(file_name, format!("failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let text = match doc.get_page_content(page_id) {
            Ok(content) => match Content::decode(&content) {
                Ok(decoded) => page_text_from_operations(&decoded),
                Err(e) => {
                    tracing::warn!(
                        file_name,
                        page_number,
                        "Could not decode content stream: {}",
                        e
                    );
                    String::new()
                }
            },
            Err(e) => {
                tracing::debug!(file_name, page_number, "No content for page: {}", e);
                String::new()
            }
        };

        pages.push(PageText {
            page_number,
            text: cleanup_page_text(&text),
        });
    }

    Ok(pages)
}

/// Reconstruct a page's text from its content-stream operations
fn page_text_from_operations(content: &Content) -> String {
    let mut text = String::new();
    let mut baseline: Option<f64> = None;

    for operation in &content.operations {
        match operation.operator.as_str() {
            // Text object start: the text matrix resets, so the next
            // positioning operator decides the baseline afresh
            "BT" => {
                baseline = None;
            }
            // Relative line moves: a vertical component means a new line
            "Td" | "TD" => {
                if let Some(ty) = operand_number(operation.operands.get(1)) {
                    if ty.abs() > f64::EPSILON {
                        push_line_break(&mut text);
                    }
                }
            }
            // Absolute text matrix: compare the vertical translation
            "Tm" => {
                if let Some(ty) = operand_number(operation.operands.get(5)) {
                    if baseline.map(|prev| (prev - ty).abs() > 0.01).unwrap_or(false) {
                        push_line_break(&mut text);
                    }
                    baseline = Some(ty);
                }
            }
            // Next-line operators
            "T*" => push_line_break(&mut text),
            "Tj" => {
                if let Some(run) = operation.operands.first().and_then(decode_string) {
                    text.push_str(&run);
                }
            }
            "'" => {
                push_line_break(&mut text);
                if let Some(run) = operation.operands.first().and_then(decode_string) {
                    text.push_str(&run);
                }
            }
            "\"" => {
                push_line_break(&mut text);
                if let Some(run) = operation.operands.get(2).and_then(decode_string) {
                    text.push_str(&run);
                }
            }
            // Array of same-baseline runs interleaved with kerning offsets:
            // joined without inserting a break
            "TJ" => {
                if let Some(Object::Array(elements)) = operation.operands.first() {
                    for element in elements {
                        if let Some(run) = decode_string(element) {
                            text.push_str(&run);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    text
}

fn push_line_break(text: &mut String) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
}

fn operand_number(operand: Option<&Object>) -> Option<f64> {
    match operand {
        Some(Object::Integer(value)) => Some(*value as f64),
        Some(Object::Real(value)) => Some(*value as f64),
        _ => None,
    }
}

/// Decode a PDF string object. UTF-16BE strings carry a BOM; everything else
/// is treated as Latin-1, which covers the common simple-font case.
fn decode_string(object: &Object) -> Option<String> {
    let Object::String(bytes, _) = object else {
        return None;
    };

    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&utf16));
    }

    Some(bytes.iter().map(|&b| b as char).collect())
}

/// Strip null bytes, trim line edges, and drop blank lines
fn cleanup_page_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
