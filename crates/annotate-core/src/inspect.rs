//! PDF inspection before a document is accepted for editing

use lopdf::Document;
use serde::Serialize;

use crate::error::AnnotateError;

/// PDF file information extracted during validation
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PdfInfo {
    pub page_count: u32,
    /// PDF version from the header (e.g., "1.7")
    pub version: String,
    /// Encrypted documents can be annotated on screen but usually not exported
    pub encrypted: bool,
    pub size_bytes: usize,
    /// Document title from the Info dictionary, if present
    pub title: Option<String>,
}

/// Validate a PDF file and extract basic info
pub fn inspect_pdf(bytes: &[u8]) -> Result<PdfInfo, AnnotateError> {
    if bytes.len() < 8 {
        return Err(AnnotateError::ParseError(
            "file too small to be a valid PDF".to_string(),
        ));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(AnnotateError::ParseError(
            "missing %PDF- header".to_string(),
        ));
    }

    let document =
        Document::load_mem(bytes).map_err(|e| AnnotateError::ParseError(e.to_string()))?;

    let page_count = document.get_pages().len() as u32;
    if page_count == 0 {
        return Err(AnnotateError::ParseError("PDF has no pages".to_string()));
    }

    Ok(PdfInfo {
        page_count,
        version: extract_version(bytes),
        encrypted: document.is_encrypted(),
        size_bytes: bytes.len(),
        title: extract_title(&document),
    })
}

/// Header format: %PDF-1.7
fn extract_version(bytes: &[u8]) -> String {
    std::str::from_utf8(&bytes[5..8])
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|_| "1.4".to_string())
}

fn extract_title(document: &Document) -> Option<String> {
    let info_id = document.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = document.get_dictionary(info_id).ok()?;
    let title = info.get(b"Title").ok()?.as_str().ok()?;
    let decoded = String::from_utf8_lossy(title);
    (!decoded.is_empty()).then(|| decoded.into_owned())
}
