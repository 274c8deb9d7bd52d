//! PDF annotation engine
//!
//! Holds the annotation state of one editing session and turns it into output:
//!
//! - [`store`]: signatures, stamps and text annotations keyed by id
//! - [`coords`]: view pixels <-> PDF points, zoom, page rotation
//! - [`interaction`]: tools and pointer gestures driving the store
//! - [`compositor`]: burn a snapshot into the PDF's page content
//! - [`metadata`]: JSON export/import of a snapshot
//!
//! The crate performs no I/O; it works on the PDF bytes it is handed.

pub mod annotation;
pub mod compositor;
pub mod coords;
pub mod error;
pub mod inspect;
pub mod interaction;
pub mod metadata;
pub mod store;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationPayload, ImageData, Position, Size,
    StampContent, StampPreset, TextStyle, STAMP_PRESETS,
};
pub use compositor::{composite, composite_with, CompositeOptions};
pub use coords::{OverlayRect, PageBox, Viewport, ZOOM_PRESETS};
pub use error::AnnotateError;
pub use inspect::{inspect_pdf, PdfInfo};
pub use interaction::{
    DragCommit, GestureState, InteractionController, InteractionSettings, Tool, ToolRequest,
};
pub use metadata::{from_json, to_json, to_json_at, AnnotationDocument, DocumentSource, SavePayload};
pub use store::{AnnotationStats, AnnotationStore, Snapshot};

const FALLBACK_FILE_NAME: &str = "document.pdf";

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, AnnotateError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| AnnotateError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Name without a trailing ".pdf" (any case)
fn file_stem(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 4
        && file_name.is_char_boundary(len - 4)
        && file_name[len - 4..].eq_ignore_ascii_case(".pdf")
    {
        &file_name[..len - 4]
    } else {
        file_name
    }
}

/// Download name for the flattened PDF: `contract.pdf` -> `contract_signed.pdf`
pub fn signed_file_name(file_name: &str) -> String {
    format!("{}_signed.pdf", file_stem(file_name))
}

/// Download name for the JSON export: `contract.pdf` -> `contract_annotations.json`
pub fn annotations_file_name(file_name: &str) -> String {
    format!("{}_annotations.json", file_stem(file_name))
}

/// Last path segment of a URL, ignoring query and fragment
pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => FALLBACK_FILE_NAME.to_string(),
    }
}
