//! WASM bindings for the PDF annotation editor
//!
//! Annotation state lives in Rust via [`AnnotationEditor`]. JavaScript renders
//! pages, forwards pointer events and downloads what the editor exports.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { AnnotationEditor } from './pkg/annotate_web_wasm.js';
//!
//! await init();
//!
//! const editor = new AnnotationEditor("lease.pdf", bytes);
//! const id = editor.addStamp("APPROVED", "#00aa00");
//! editor.beginDrag(id, event.clientX, event.clientY);
//! editor.dragTo(event.clientX, event.clientY);
//! editor.endDrag();
//! paint(editor.getOverlays());
//! downloadBlob(editor.exportPdf(), editor.signedFileName());
//! ```

pub mod editor;

use wasm_bindgen::prelude::*;

pub use editor::{AnnotationEditor, OverlayView};

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// PDF details shown before the editor opens the file
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = annotate_core::inspect_pdf(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Zoom presets offered by the viewer toolbar
#[wasm_bindgen]
pub fn zoom_presets() -> Vec<f64> {
    annotate_core::ZOOM_PRESETS.to_vec()
}
