//! Coordinate transformation between view space and PDF page space
//!
//! View space is what pointer events report: pixels inside the rendered page
//! element, top-left origin, multiplied by the current zoom. Annotations are
//! stored unscaled, in PDF points, still top-left origin. The flip to PDF's
//! bottom-left origin happens only through [`PageBox`] at export time.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, Position, Size};

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 2.0;
pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_SCALE_STEP: f64 = 0.1;

/// Zoom levels offered by the viewer's zoom menu
pub const ZOOM_PRESETS: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Zoom and page rotation of the page currently on screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    scale: f64,
    /// Degrees, one of 0/90/180/270. Only the rendered page image turns.
    page_rotation: u16,
    scale_step: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            page_rotation: 0,
            scale_step: DEFAULT_SCALE_STEP,
        }
    }
}

impl Viewport {
    pub fn new(scale: f64) -> Self {
        let mut viewport = Self::default();
        viewport.set_scale(scale);
        viewport
    }

    pub fn with_step(mut self, step: f64) -> Self {
        if step.is_finite() && step > 0.0 {
            self.scale_step = step;
        }
        self
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn page_rotation(&self) -> u16 {
        self.page_rotation
    }

    /// Set the zoom, clamped into [MIN_SCALE, MAX_SCALE]
    pub fn set_scale(&mut self, scale: f64) -> f64 {
        self.scale = if scale.is_finite() {
            scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            DEFAULT_SCALE
        };
        self.scale
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_scale(round_scale(self.scale + self.scale_step))
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_scale(round_scale(self.scale - self.scale_step))
    }

    pub fn reset_zoom(&mut self) -> f64 {
        self.set_scale(DEFAULT_SCALE)
    }

    /// Select one of [`ZOOM_PRESETS`] by index
    pub fn apply_preset(&mut self, index: usize) -> Option<f64> {
        ZOOM_PRESETS.get(index).map(|&scale| self.set_scale(scale))
    }

    /// Turn the rendered page a quarter turn clockwise
    pub fn rotate_page(&mut self) -> u16 {
        self.page_rotation = (self.page_rotation + 90) % 360;
        self.page_rotation
    }

    pub fn reset_rotation(&mut self) {
        self.page_rotation = 0;
    }

    pub fn view_to_model(&self, view_x: f64, view_y: f64) -> Position {
        Position::new(view_x / self.scale, view_y / self.scale)
    }

    pub fn model_to_view(&self, position: Position) -> (f64, f64) {
        (position.x * self.scale, position.y * self.scale)
    }

    pub fn size_to_view(&self, size: Size) -> (f64, f64) {
        (size.width * self.scale, size.height * self.scale)
    }

    /// Convert a pointer movement in pixels into a movement in points
    pub fn delta_to_model(&self, dx: f64, dy: f64) -> (f64, f64) {
        (dx / self.scale, dy / self.scale)
    }

    /// Where the overlay element for an annotation goes, relative to the page container
    pub fn overlay_rect(&self, annotation: &Annotation) -> OverlayRect {
        OverlayRect::project(self, annotation.position, annotation.size, annotation.rotation)
    }
}

// Keeps repeated 0.1 steps from drifting to 1.2000000000000002
fn round_scale(scale: f64) -> f64 {
    (scale * 100.0).round() / 100.0
}

/// Overlay geometry in view pixels, ready for CSS `left/top/width/height/rotate`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl OverlayRect {
    pub fn project(viewport: &Viewport, position: Position, size: Size, rotation: f64) -> Self {
        let (left, top) = viewport.model_to_view(position);
        let (width, height) = viewport.size_to_view(size);
        Self {
            left,
            top,
            width,
            height,
            rotation,
        }
    }
}

/// A page's MediaBox in PDF user space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// US Letter, used when a page declares no MediaBox
    pub const LETTER: PageBox = PageBox {
        x: 0.0,
        y: 0.0,
        width: 612.0,
        height: 792.0,
    };

    /// Build from a PDF rectangle `[llx, lly, urx, ury]`
    pub fn from_media_box(rect: [f64; 4]) -> Self {
        let [llx, lly, urx, ury] = rect;
        Self {
            x: llx.min(urx),
            y: lly.min(ury),
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
        }
    }

    /// Lower-left corner for an image drawn at a top-down position
    pub fn image_origin(&self, position: Position, size: Size) -> (f64, f64) {
        (
            self.x + position.x,
            self.y + self.height - position.y - size.height,
        )
    }

    /// Baseline start for text drawn at a top-down position
    pub fn text_baseline(&self, position: Position) -> (f64, f64) {
        (self.x + position.x, self.y + self.height - position.y)
    }
}
