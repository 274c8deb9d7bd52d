//! Browser-facing annotation editor
//!
//! Holds the document, the annotation store and the interaction controller in
//! Rust. JavaScript forwards DOM events and paints the overlays it is given.

use annotate_core::{
    annotations_file_name, composite_with, from_json, signed_file_name, to_json, AnnotateError,
    AnnotationId, AnnotationKind, AnnotationStore, CompositeOptions, DocumentSource, DragCommit,
    ImageData, InteractionController, InteractionSettings, OverlayRect, PdfInfo, Size,
    StampContent, Tool, ToolRequest, Viewport,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Viewer and interaction settings passed from the page, mirroring the
/// `[viewer]` and `[interaction]` config sections. Missing keys keep defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    pub default_scale: Option<f64>,
    pub scale_step: Option<f64>,
    pub min_width: Option<f64>,
    pub min_height: Option<f64>,
    pub rotation_step: Option<f64>,
    pub drag_commit: Option<DragCommit>,
}

impl EditorSettings {
    fn from_js(value: JsValue) -> Result<Self, JsValue> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        serde_wasm_bindgen::from_value(value)
            .map_err(|e| JsValue::from_str(&format!("Invalid settings: {}", e)))
    }

    pub fn viewport(&self) -> Viewport {
        let mut viewport = Viewport::default();
        if let Some(scale) = self.default_scale {
            viewport.set_scale(scale);
        }
        match self.scale_step {
            Some(step) => viewport.with_step(step),
            None => viewport,
        }
    }

    pub fn interaction(&self) -> InteractionSettings {
        let defaults = InteractionSettings::default();
        InteractionSettings {
            min_size: Size::new(
                self.min_width.unwrap_or(defaults.min_size.width),
                self.min_height.unwrap_or(defaults.min_size.height),
            ),
            rotation_step: self.rotation_step.unwrap_or(defaults.rotation_step),
            drag_commit: self.drag_commit.unwrap_or(defaults.drag_commit),
        }
    }
}

/// One overlay box for the page being viewed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayView {
    pub id: AnnotationId,
    pub kind: AnnotationKind,
    pub selected: bool,
    #[serde(flatten)]
    pub rect: OverlayRect,
}

fn js_error(err: AnnotateError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_tool(name: &str) -> Option<Tool> {
    match name.to_ascii_lowercase().as_str() {
        "none" | "" => Some(Tool::None),
        "signature" => Some(Tool::Signature),
        "stamp" => Some(Tool::Stamp),
        "text" => Some(Tool::Text),
        _ => None,
    }
}

fn to_uint8_array(bytes: &[u8]) -> js_sys::Uint8Array {
    let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
    array.copy_from(bytes);
    array
}

/// Editing state for one PDF document
#[wasm_bindgen]
pub struct AnnotationEditor {
    document_bytes: Vec<u8>,
    document_name: String,
    source: DocumentSource,
    info: PdfInfo,
    store: AnnotationStore,
    controller: InteractionController,
}

#[wasm_bindgen]
impl AnnotationEditor {
    /// Open an uploaded PDF
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, bytes: &[u8]) -> Result<AnnotationEditor, JsValue> {
        Self::open(name, DocumentSource::Uploaded, bytes).map_err(js_error)
    }

    /// Open an uploaded PDF with viewer and interaction settings
    #[wasm_bindgen(js_name = withSettings)]
    pub fn with_settings(
        name: &str,
        bytes: &[u8],
        settings: JsValue,
    ) -> Result<AnnotationEditor, JsValue> {
        let settings = EditorSettings::from_js(settings)?;
        Self::open_with(name, DocumentSource::Uploaded, bytes, &settings).map_err(js_error)
    }

    /// Open a PDF the page fetched from `url`; `settings` may be omitted
    #[wasm_bindgen(js_name = fromUrl)]
    pub fn from_url(
        url: &str,
        bytes: &[u8],
        settings: JsValue,
    ) -> Result<AnnotationEditor, JsValue> {
        let settings = EditorSettings::from_js(settings)?;
        let name = annotate_core::file_name_from_url(url);
        Self::open_with(&name, DocumentSource::Url(url.to_string()), bytes, &settings)
            .map_err(js_error)
    }

    #[wasm_bindgen(getter, js_name = documentName)]
    pub fn document_name(&self) -> String {
        self.document_name.clone()
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.info.page_count
    }

    /// Document bytes for the page renderer
    #[wasm_bindgen(js_name = getDocumentBytes)]
    pub fn get_document_bytes(&self) -> js_sys::Uint8Array {
        to_uint8_array(&self.document_bytes)
    }

    // ============ Navigation and zoom ============

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> u32 {
        self.controller.current_page()
    }

    #[wasm_bindgen(js_name = goToPage)]
    pub fn go_to_page(&mut self, page: u32) -> u32 {
        self.controller.go_to_page(page)
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&mut self) -> u32 {
        self.controller.next_page()
    }

    #[wasm_bindgen(js_name = previousPage)]
    pub fn previous_page(&mut self) -> u32 {
        self.controller.previous_page()
    }

    #[wasm_bindgen(getter)]
    pub fn scale(&self) -> f64 {
        self.controller.viewport().scale()
    }

    #[wasm_bindgen(js_name = setScale)]
    pub fn set_scale(&mut self, scale: f64) -> f64 {
        self.controller.viewport_mut().set_scale(scale)
    }

    #[wasm_bindgen(js_name = zoomIn)]
    pub fn zoom_in(&mut self) -> f64 {
        self.controller.viewport_mut().zoom_in()
    }

    #[wasm_bindgen(js_name = zoomOut)]
    pub fn zoom_out(&mut self) -> f64 {
        self.controller.viewport_mut().zoom_out()
    }

    #[wasm_bindgen(js_name = resetZoom)]
    pub fn reset_zoom(&mut self) -> f64 {
        self.controller.viewport_mut().reset_zoom()
    }

    /// Rotate the page view by 90 degrees; annotations are not affected
    #[wasm_bindgen(js_name = rotatePage)]
    pub fn rotate_page(&mut self) -> u16 {
        self.controller.viewport_mut().rotate_page()
    }

    // ============ Tools ============

    /// Highlight a toolbar button. Unknown names are ignored.
    #[wasm_bindgen(js_name = selectTool)]
    pub fn select_tool(&mut self, name: &str) -> bool {
        match parse_tool(name) {
            Some(tool) => {
                self.controller.select_tool(tool);
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen(getter, js_name = activeTool)]
    pub fn active_tool(&self) -> String {
        match self.controller.active_tool() {
            Tool::None => "none",
            Tool::Signature => "signature",
            Tool::Stamp => "stamp",
            Tool::Text => "text",
        }
        .to_string()
    }

    /// Add a drawn signature (PNG data URL) to the current page
    #[wasm_bindgen(js_name = addSignature)]
    pub fn add_signature(&mut self, data_url: &str) -> Result<u64, JsValue> {
        self.add_signature_image(data_url).map_err(js_error)
    }

    #[wasm_bindgen(js_name = addStamp)]
    pub fn add_stamp(&mut self, text: &str, color: &str) -> Result<u64, JsValue> {
        self.invoke(ToolRequest::Stamp(StampContent::text(text, color)))
            .map_err(js_error)
    }

    /// Add an uploaded image (PNG data URL) as a stamp
    #[wasm_bindgen(js_name = addImageStamp)]
    pub fn add_image_stamp(&mut self, data_url: &str) -> Result<u64, JsValue> {
        ImageData::from_data_url(data_url)
            .and_then(|image| self.invoke(ToolRequest::Stamp(StampContent::image(image))))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = addText)]
    pub fn add_text(&mut self, content: &str) -> Result<u64, JsValue> {
        self.invoke(ToolRequest::Text(content.to_string()))
            .map_err(js_error)
    }

    // ============ Pointer gestures ============

    #[wasm_bindgen(js_name = pointerEnter)]
    pub fn pointer_enter(&mut self, id: u64) {
        self.controller.pointer_enter(id);
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self, id: u64) {
        self.controller.pointer_leave(id);
    }

    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, id: u64, x: f64, y: f64) -> bool {
        self.controller.begin_drag(&self.store, id, x, y)
    }

    #[wasm_bindgen(js_name = dragTo)]
    pub fn drag_to(&mut self, x: f64, y: f64) -> bool {
        self.controller.drag_to(&mut self.store, x, y).is_some()
    }

    #[wasm_bindgen(js_name = endDrag)]
    pub fn end_drag(&mut self) -> bool {
        self.controller.end_drag(&mut self.store).is_some()
    }

    #[wasm_bindgen(js_name = beginResize)]
    pub fn begin_resize(&mut self, id: u64, x: f64, y: f64) -> bool {
        self.controller.begin_resize(&self.store, id, x, y)
    }

    #[wasm_bindgen(js_name = resizeTo)]
    pub fn resize_to(&mut self, x: f64, y: f64) -> bool {
        self.controller.resize_to(&mut self.store, x, y).is_some()
    }

    #[wasm_bindgen(js_name = endResize)]
    pub fn end_resize(&mut self) -> bool {
        self.controller.end_resize(&self.store).is_some()
    }

    /// Escape key: put the annotation back where the gesture started
    #[wasm_bindgen(js_name = cancelGesture)]
    pub fn cancel_gesture(&mut self) {
        self.controller.cancel_gesture(&mut self.store);
    }

    /// Returns the new angle, or `undefined` for an unknown id
    pub fn rotate(&mut self, id: u64) -> Option<f64> {
        self.controller.rotate(&mut self.store, id)
    }

    #[wasm_bindgen(js_name = deleteAnnotation)]
    pub fn delete_annotation(&mut self, id: u64) -> bool {
        self.controller.delete(&mut self.store, id)
    }

    /// Remove every annotation after the user confirmed
    #[wasm_bindgen(js_name = clearAll)]
    pub fn clear_all(&mut self, confirmed: bool) -> bool {
        self.controller.clear_all(&mut self.store, confirmed)
    }

    // ============ Rendering state ============

    /// Overlay boxes for the current page, in view pixels
    #[wasm_bindgen(js_name = getOverlays)]
    pub fn get_overlays(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.overlays())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = getStats)]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.store.snapshot().stats())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = annotationCount)]
    pub fn annotation_count(&self) -> usize {
        self.store.len()
    }

    // ============ Export ============

    /// Composite every annotation into the PDF
    #[wasm_bindgen(js_name = exportPdf)]
    pub fn export_pdf(&self) -> Result<js_sys::Uint8Array, JsValue> {
        let bytes = self.export_bytes().map_err(js_error)?;
        Ok(to_uint8_array(&bytes))
    }

    #[wasm_bindgen(js_name = exportJson)]
    pub fn export_json(&self) -> Result<String, JsValue> {
        self.to_json_string().map_err(js_error)
    }

    /// Replace the annotations with a previously exported set; returns the count
    #[wasm_bindgen(js_name = importJson)]
    pub fn import_json(&mut self, json: &str) -> Result<usize, JsValue> {
        self.restore_json(json).map_err(js_error)
    }

    #[wasm_bindgen(js_name = signedFileName)]
    pub fn signed_file_name(&self) -> String {
        signed_file_name(&self.document_name)
    }

    #[wasm_bindgen(js_name = annotationsFileName)]
    pub fn annotations_file_name(&self) -> String {
        annotations_file_name(&self.document_name)
    }
}

impl AnnotationEditor {
    fn open(name: &str, source: DocumentSource, bytes: &[u8]) -> Result<Self, AnnotateError> {
        Self::open_with(name, source, bytes, &EditorSettings::default())
    }

    fn open_with(
        name: &str,
        source: DocumentSource,
        bytes: &[u8],
        settings: &EditorSettings,
    ) -> Result<Self, AnnotateError> {
        let info = annotate_core::inspect_pdf(bytes)?;
        let mut controller =
            InteractionController::new(settings.interaction(), settings.viewport());
        controller.reset_for_document(info.page_count);
        Ok(Self {
            document_bytes: bytes.to_vec(),
            document_name: name.to_string(),
            source,
            info,
            store: AnnotationStore::new(),
            controller,
        })
    }

    fn invoke(&mut self, request: ToolRequest) -> Result<u64, AnnotateError> {
        let annotation = self.controller.invoke(&mut self.store, request)?;
        Ok(annotation.id)
    }

    fn add_signature_image(&mut self, data_url: &str) -> Result<u64, AnnotateError> {
        let image = ImageData::from_data_url(data_url)?;
        self.invoke(ToolRequest::Signature(image))
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn overlays(&self) -> Vec<OverlayView> {
        let selected = self.controller.selected();
        self.controller
            .page_overlays(&self.store)
            .into_iter()
            .filter_map(|(id, rect)| {
                let kind = self.store.get(id)?.kind();
                Some(OverlayView {
                    id,
                    kind,
                    selected: selected == Some(id),
                    rect,
                })
            })
            .collect()
    }

    pub fn export_bytes(&self) -> Result<Vec<u8>, AnnotateError> {
        composite_with(
            &self.document_bytes,
            &self.store.snapshot(),
            &CompositeOptions::default(),
        )
    }

    pub fn to_json_string(&self) -> Result<String, AnnotateError> {
        to_json(
            &self.document_name,
            &self.source,
            &self.store.snapshot(),
            self.info.page_count,
        )
    }

    pub fn restore_json(&mut self, json: &str) -> Result<usize, AnnotateError> {
        let store = AnnotationStore::from_document(&from_json(json)?)?;
        self.controller.replace_annotations(&mut self.store, store);
        Ok(self.store.len())
    }
}
