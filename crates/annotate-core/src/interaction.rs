//! Interaction controller
//!
//! Turns tool invocations and pointer events into store mutations. The store
//! stays the single source of truth for geometry; the controller only holds the
//! transient state of the gesture in progress and projects it onto the overlay.
//!
//! Events are processed one at a time. At most one gesture exists at once, and
//! a resize that has started suppresses any drag start until it ends.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::{
    normalize_rotation, Annotation, AnnotationId, AnnotationPayload, ImageData, Position, Size,
    StampContent,
};
use crate::coords::{OverlayRect, Viewport};
use crate::error::AnnotateError;
use crate::store::AnnotationStore;

pub const DEFAULT_MIN_WIDTH: f64 = 50.0;
pub const DEFAULT_MIN_HEIGHT: f64 = 30.0;
pub const DEFAULT_ROTATION_STEP: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    None,
    Signature,
    Stamp,
    Text,
}

/// What a tool creates when it fires
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    Signature(ImageData),
    Stamp(StampContent),
    Text(String),
}

impl ToolRequest {
    pub fn tool(&self) -> Tool {
        match self {
            ToolRequest::Signature(_) => Tool::Signature,
            ToolRequest::Stamp(_) => Tool::Stamp,
            ToolRequest::Text(_) => Tool::Text,
        }
    }

    fn into_payload(self) -> AnnotationPayload {
        match self {
            ToolRequest::Signature(image) => AnnotationPayload::Signature { image },
            ToolRequest::Stamp(content) => AnnotationPayload::Stamp { content },
            ToolRequest::Text(content) => AnnotationPayload::text(content),
        }
    }
}

/// When a drag writes its position into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragCommit {
    /// Once, when the pointer is released
    #[default]
    OnRelease,
    /// On every pointer move
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionSettings {
    pub min_size: Size,
    pub rotation_step: f64,
    pub drag_commit: DragCommit,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            min_size: Size::new(DEFAULT_MIN_WIDTH, DEFAULT_MIN_HEIGHT),
            rotation_step: DEFAULT_ROTATION_STEP,
            drag_commit: DragCommit::OnRelease,
        }
    }
}

/// Public view of the gesture in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Dragging(AnnotationId),
    Resizing(AnnotationId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Dragging {
        id: AnnotationId,
        origin: Position,
        start: (f64, f64),
        current: Position,
    },
    Resizing {
        id: AnnotationId,
        origin: Size,
        start: (f64, f64),
    },
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    settings: InteractionSettings,
    viewport: Viewport,
    current_page: u32,
    page_count: u32,
    active_tool: Tool,
    armed: Option<ToolRequest>,
    selected: Option<AnnotationId>,
    gesture: Gesture,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(InteractionSettings::default(), Viewport::default())
    }
}

impl InteractionController {
    pub fn new(settings: InteractionSettings, viewport: Viewport) -> Self {
        Self {
            settings,
            viewport,
            current_page: 1,
            page_count: 0,
            active_tool: Tool::None,
            armed: None,
            selected: None,
            gesture: Gesture::Idle,
        }
    }

    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn is_active(&self, id: AnnotationId) -> bool {
        self.selected == Some(id)
    }

    pub fn gesture(&self) -> GestureState {
        match self.gesture {
            Gesture::Idle => GestureState::Idle,
            Gesture::Dragging { id, .. } => GestureState::Dragging(id),
            Gesture::Resizing { id, .. } => GestureState::Resizing(id),
        }
    }

    // ---- page navigation ----

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// A new document was loaded: back to page 1, nothing selected or armed
    pub fn reset_for_document(&mut self, page_count: u32) {
        self.page_count = page_count;
        self.current_page = 1;
        self.active_tool = Tool::None;
        self.armed = None;
        self.selected = None;
        self.gesture = Gesture::Idle;
        self.viewport.reset_rotation();
    }

    /// Jump to a page, clamped into [1, page_count]
    pub fn go_to_page(&mut self, page: u32) -> u32 {
        self.current_page = page.clamp(1, self.page_count.max(1));
        self.current_page
    }

    pub fn next_page(&mut self) -> u32 {
        self.go_to_page(self.current_page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> u32 {
        self.go_to_page(self.current_page.saturating_sub(1))
    }

    pub fn first_page(&mut self) -> u32 {
        self.go_to_page(1)
    }

    pub fn last_page(&mut self) -> u32 {
        self.go_to_page(self.page_count)
    }

    // ---- tools ----

    pub fn select_tool(&mut self, tool: Tool) {
        if self.armed.as_ref().map(ToolRequest::tool) != Some(tool) {
            self.armed = None;
        }
        self.active_tool = tool;
    }

    /// Create the annotation immediately at its kind's default position on the current page
    pub fn invoke(
        &mut self,
        store: &mut AnnotationStore,
        request: ToolRequest,
    ) -> Result<Annotation, AnnotateError> {
        self.armed = None;
        let annotation = store.add(request.into_payload(), self.current_page)?;
        self.active_tool = Tool::None;
        self.selected = Some(annotation.id);
        Ok(annotation)
    }

    /// Arm a tool so the next click on the page places the annotation there
    pub fn arm(&mut self, request: ToolRequest) {
        self.active_tool = request.tool();
        self.armed = Some(request);
    }

    /// Place the armed annotation with its top-left corner at the clicked point.
    /// Returns `None` when no tool is armed.
    pub fn place_at(
        &mut self,
        store: &mut AnnotationStore,
        view_x: f64,
        view_y: f64,
    ) -> Result<Option<Annotation>, AnnotateError> {
        let Some(request) = self.armed.take() else {
            return Ok(None);
        };
        let mut annotation = store.add(request.into_payload(), self.current_page)?;
        let position = self.viewport.view_to_model(view_x, view_y);
        store.update_position(annotation.id, position.x, position.y);
        annotation.position = position;

        self.active_tool = Tool::None;
        self.selected = Some(annotation.id);
        debug!(id = annotation.id, x = position.x, y = position.y, "annotation placed");
        Ok(Some(annotation))
    }

    // ---- selection ----

    pub fn pointer_enter(&mut self, id: AnnotationId) {
        if self.gesture == Gesture::Idle {
            self.selected = Some(id);
        }
    }

    /// Deselect on leave unless a gesture still holds the annotation
    pub fn pointer_leave(&mut self, id: AnnotationId) {
        let pinned = match self.gesture {
            Gesture::Idle => false,
            Gesture::Dragging { id: held, .. } | Gesture::Resizing { id: held, .. } => held == id,
        };
        if !pinned && self.selected == Some(id) {
            self.selected = None;
        }
    }

    // ---- drag ----

    pub fn begin_drag(
        &mut self,
        store: &AnnotationStore,
        id: AnnotationId,
        view_x: f64,
        view_y: f64,
    ) -> bool {
        if self.gesture != Gesture::Idle {
            return false;
        }
        let Some(annotation) = store.get(id) else {
            return false;
        };
        self.gesture = Gesture::Dragging {
            id,
            origin: annotation.position,
            start: (view_x, view_y),
            current: annotation.position,
        };
        self.selected = Some(id);
        true
    }

    /// Follow the pointer; returns the in-gesture model position
    pub fn drag_to(
        &mut self,
        store: &mut AnnotationStore,
        view_x: f64,
        view_y: f64,
    ) -> Option<Position> {
        let Gesture::Dragging {
            id,
            origin,
            start,
            ref mut current,
        } = self.gesture
        else {
            return None;
        };
        let (dx, dy) = self
            .viewport
            .delta_to_model(view_x - start.0, view_y - start.1);
        *current = Position::new(origin.x + dx, origin.y + dy);
        let position = *current;

        if self.settings.drag_commit == DragCommit::Continuous {
            store.update_position(id, position.x, position.y);
        }
        Some(position)
    }

    /// Release the pointer and commit the final position
    pub fn end_drag(&mut self, store: &mut AnnotationStore) -> Option<Position> {
        let Gesture::Dragging { id, current, .. } = self.gesture else {
            return None;
        };
        self.gesture = Gesture::Idle;
        if !store.update_position(id, current.x, current.y) {
            return None;
        }
        debug!(id, x = current.x, y = current.y, "drag committed");
        Some(current)
    }

    // ---- resize ----

    pub fn begin_resize(
        &mut self,
        store: &AnnotationStore,
        id: AnnotationId,
        view_x: f64,
        view_y: f64,
    ) -> bool {
        if self.gesture != Gesture::Idle {
            return false;
        }
        let Some(annotation) = store.get(id) else {
            return false;
        };
        self.gesture = Gesture::Resizing {
            id,
            origin: annotation.size,
            start: (view_x, view_y),
        };
        self.selected = Some(id);
        true
    }

    /// Follow the corner handle; every tick is committed, clamped to the minimum size
    pub fn resize_to(
        &mut self,
        store: &mut AnnotationStore,
        view_x: f64,
        view_y: f64,
    ) -> Option<Size> {
        let Gesture::Resizing { id, origin, start } = self.gesture else {
            return None;
        };
        let (dw, dh) = self
            .viewport
            .delta_to_model(view_x - start.0, view_y - start.1);
        let size = Size::new(origin.width + dw, origin.height + dh).at_least(self.settings.min_size);
        store.update_size(id, size.width, size.height);
        Some(size)
    }

    pub fn end_resize(&mut self, store: &AnnotationStore) -> Option<Size> {
        let Gesture::Resizing { id, .. } = self.gesture else {
            return None;
        };
        self.gesture = Gesture::Idle;
        let size = store.get(id)?.size;
        debug!(id, width = size.width, height = size.height, "resize committed");
        Some(size)
    }

    /// Abandon the gesture in progress and restore the geometry it started from
    pub fn cancel_gesture(&mut self, store: &mut AnnotationStore) {
        match self.gesture {
            Gesture::Idle => {}
            Gesture::Dragging { id, origin, .. } => {
                store.update_position(id, origin.x, origin.y);
            }
            Gesture::Resizing { id, origin, .. } => {
                store.update_size(id, origin.width, origin.height);
            }
        }
        self.gesture = Gesture::Idle;
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Swap in another annotation set. Ids repeat across sets, so no gesture
    /// or selection survives the swap.
    pub fn replace_annotations(
        &mut self,
        store: &mut AnnotationStore,
        replacement: AnnotationStore,
    ) {
        self.cancel_gesture(store);
        self.clear_selection();
        *store = replacement;
    }

    /// Remove every annotation once the user confirmed; false when nothing changed
    pub fn clear_all(&mut self, store: &mut AnnotationStore, confirmed: bool) -> bool {
        if !confirmed || store.is_empty() {
            return false;
        }
        self.cancel_gesture(store);
        self.clear_selection();
        store.clear();
        true
    }

    // ---- rotate / delete ----

    /// Advance rotation by one step; returns the new angle
    pub fn rotate(&mut self, store: &mut AnnotationStore, id: AnnotationId) -> Option<f64> {
        let current = store.get(id)?.rotation;
        let rotation = normalize_rotation(current + self.settings.rotation_step);
        store.update_rotation(id, rotation);
        Some(rotation)
    }

    pub fn delete(&mut self, store: &mut AnnotationStore, id: AnnotationId) -> bool {
        let removed = store.remove(id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        if matches!(self.gesture(), GestureState::Dragging(held) | GestureState::Resizing(held) if held == id)
        {
            self.gesture = Gesture::Idle;
        }
        removed
    }

    // ---- projection ----

    /// Overlay geometry for one annotation, including an uncommitted drag
    pub fn overlay(&self, store: &AnnotationStore, id: AnnotationId) -> Option<OverlayRect> {
        let annotation = store.get(id)?;
        let position = match self.gesture {
            Gesture::Dragging {
                id: held, current, ..
            } if held == id => current,
            _ => annotation.position,
        };
        Some(OverlayRect::project(
            &self.viewport,
            position,
            annotation.size,
            annotation.rotation,
        ))
    }

    /// Overlays for every annotation on the page being viewed
    pub fn page_overlays(&self, store: &AnnotationStore) -> Vec<(AnnotationId, OverlayRect)> {
        store
            .for_page(self.current_page)
            .into_iter()
            .filter_map(|a| self.overlay(store, a.id).map(|rect| (a.id, rect)))
            .collect()
    }
}
