//! Annotation data model
//!
//! Signatures, stamps and text annotations share one envelope (page, geometry,
//! rotation, creation time) and differ only in their payload. Geometry is kept
//! in PDF points with a top-left origin; the flip to PDF's bottom-up axis
//! happens only when compositing.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AnnotateError;

/// Identifier allocated by the store, increasing in creation order
pub type AnnotationId = u64;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

pub const DEFAULT_TEXT_COLOR: &str = "#000000";
pub const STAMP_FONT_SIZE: f64 = 24.0;
pub const TEXT_FONT_SIZE: f64 = 14.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Grow each dimension up to the given minimum
    pub fn at_least(self, min: Size) -> Self {
        Self {
            width: self.width.max(min.width),
            height: self.height.max(min.height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Signature,
    Stamp,
    Text,
}

impl AnnotationKind {
    /// Where a freshly created annotation of this kind lands on its page
    pub fn default_position(self) -> Position {
        match self {
            AnnotationKind::Signature | AnnotationKind::Stamp => Position::new(80.0, 100.0),
            AnnotationKind::Text => Position::new(40.0, 80.0),
        }
    }

    pub fn default_size(self) -> Size {
        match self {
            AnnotationKind::Signature => Size::new(200.0, 100.0),
            AnnotationKind::Stamp => Size::new(150.0, 50.0),
            AnnotationKind::Text => Size::new(200.0, 50.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationKind::Signature => "signature",
            AnnotationKind::Stamp => "stamp",
            AnnotationKind::Text => "text",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PNG image payload (drawn signature strokes or an image stamp).
///
/// Serializes as a `data:image/png;base64,...` URL, which is the form the
/// browser drawing canvas hands over.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData(Vec<u8>);

impl ImageData {
    pub fn from_png(bytes: Vec<u8>) -> Result<Self, AnnotateError> {
        if !bytes.starts_with(&PNG_MAGIC) {
            return Err(AnnotateError::InvalidImage(
                "missing PNG signature".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn from_data_url(url: &str) -> Result<Self, AnnotateError> {
        let (header, data) = url
            .split_once(',')
            .ok_or_else(|| AnnotateError::InvalidImage("not a data URL".to_string()))?;
        if !header.eq_ignore_ascii_case("data:image/png;base64") {
            return Err(AnnotateError::InvalidImage(format!(
                "unsupported data URL header: {}",
                header
            )));
        }
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| AnnotateError::InvalidImage(format!("bad base64: {}", e)))?;
        Self::from_png(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_data_url(&self) -> String {
        format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(&self.0))
    }

    /// Pixel dimensions read from the PNG header
    pub fn dimensions(&self) -> Result<(u32, u32), AnnotateError> {
        let reader = png::Decoder::new(self.0.as_slice())
            .read_info()
            .map_err(|e| AnnotateError::InvalidImage(e.to_string()))?;
        let info = reader.info();
        Ok((info.width, info.height))
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageData({} bytes)", self.0.len())
    }
}

impl Serialize for ImageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> Deserialize<'de> for ImageData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        ImageData::from_data_url(&url).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Hex color string, e.g. "#00aa00"
    pub color: String,
    pub font_size: f64,
}

impl TextStyle {
    pub fn new(color: impl Into<String>, font_size: f64) -> Self {
        Self {
            color: color.into(),
            font_size,
        }
    }

    pub fn rgb(&self) -> (f32, f32, f32) {
        parse_hex_color(&self.color)
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_COLOR, TEXT_FONT_SIZE)
    }
}

/// What a stamp shows: colored text or an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum StampContent {
    Text { text: String, style: TextStyle },
    Image { image: ImageData },
}

impl StampContent {
    /// Text stamp at the standard stamp font size
    pub fn text(text: impl Into<String>, color: impl Into<String>) -> Self {
        StampContent::Text {
            text: text.into(),
            style: TextStyle::new(color, STAMP_FONT_SIZE),
        }
    }

    pub fn image(image: ImageData) -> Self {
        StampContent::Image { image }
    }
}

/// Ready-made stamps offered by the stamp tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampPreset {
    pub text: &'static str,
    pub color: &'static str,
}

impl StampPreset {
    pub fn content(&self) -> StampContent {
        StampContent::text(self.text, self.color)
    }
}

pub const STAMP_PRESETS: [StampPreset; 6] = [
    StampPreset { text: "APPROVED", color: "#00aa00" },
    StampPreset { text: "REJECTED", color: "#ff0000" },
    StampPreset { text: "CONFIDENTIAL", color: "#0000ff" },
    StampPreset { text: "DRAFT", color: "#888888" },
    StampPreset { text: "URGENT", color: "#ff9900" },
    StampPreset { text: "VERIFIED", color: "#009900" },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationPayload {
    Signature { image: ImageData },
    Stamp { content: StampContent },
    Text { content: String, style: TextStyle },
}

impl AnnotationPayload {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationPayload::Signature { .. } => AnnotationKind::Signature,
            AnnotationPayload::Stamp { .. } => AnnotationKind::Stamp,
            AnnotationPayload::Text { .. } => AnnotationKind::Text,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        AnnotationPayload::Text {
            content: content.into(),
            style: TextStyle::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    /// 1-based page number
    pub page: u32,
    /// Top-left corner, distance from the page's left and top edges
    pub position: Position,
    pub size: Size,
    /// Degrees in [0, 360), applied about the center
    pub rotation: f64,
    pub created_at: DateTime<Utc>,
    pub payload: AnnotationPayload,
}

impl Annotation {
    /// Build an annotation with the default geometry for its kind
    pub fn new(
        id: AnnotationId,
        page: u32,
        payload: AnnotationPayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        let kind = payload.kind();
        Self {
            id,
            page,
            position: kind.default_position(),
            size: kind.default_size(),
            rotation: 0.0,
            created_at,
            payload,
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        self.payload.kind()
    }
}

/// Wrap an angle in degrees into [0, 360)
pub fn normalize_rotation(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB floats (0-1 range)
pub fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim_start_matches('#');
    if hex.len() >= 6 && hex.is_ascii() {
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0) as f32 / 255.0;
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0) as f32 / 255.0;
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0) as f32 / 255.0;
        (r, g, b)
    } else {
        (0.0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_png;

    #[test]
    fn test_default_geometry_per_kind() {
        assert_eq!(AnnotationKind::Signature.default_size(), Size::new(200.0, 100.0));
        assert_eq!(AnnotationKind::Stamp.default_size(), Size::new(150.0, 50.0));
        assert_eq!(AnnotationKind::Text.default_size(), Size::new(200.0, 50.0));
    }

    #[test]
    fn test_new_annotation_uses_kind_defaults() {
        let annotation = Annotation::new(7, 2, AnnotationPayload::text("Date"), Utc::now());
        assert_eq!(annotation.kind(), AnnotationKind::Text);
        assert_eq!(annotation.position, Position::new(40.0, 80.0));
        assert_eq!(annotation.rotation, 0.0);
        assert_eq!(annotation.page, 2);
    }

    #[test]
    fn test_data_url_roundtrip() {
        let image = ImageData::from_png(sample_png(4, 3)).unwrap();
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(ImageData::from_data_url(&url).unwrap(), image);
        assert_eq!(image.dimensions().unwrap(), (4, 3));
    }

    #[test]
    fn test_data_url_rejects_other_formats() {
        assert!(ImageData::from_data_url("data:image/jpeg;base64,AAAA").is_err());
        assert!(ImageData::from_data_url("no comma here").is_err());
        // valid base64, but not a PNG
        assert!(ImageData::from_data_url("data:image/png;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0.0), 0.0);
        assert_eq!(normalize_rotation(360.0), 0.0);
        assert_eq!(normalize_rotation(375.0), 15.0);
        assert_eq!(normalize_rotation(-15.0), 345.0);
        assert!(normalize_rotation(-1e-20) < 360.0);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ffffff"), (1.0, 1.0, 1.0));
        let (r, g, b) = parse_hex_color("#00aa00");
        assert_eq!(r, 0.0);
        assert!((g - 170.0 / 255.0).abs() < 1e-6);
        assert_eq!(b, 0.0);
        assert_eq!(parse_hex_color("bogus"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_stamp_presets_use_stamp_font_size() {
        for preset in STAMP_PRESETS {
            match preset.content() {
                StampContent::Text { text, style } => {
                    assert_eq!(text, preset.text);
                    assert_eq!(style.font_size, STAMP_FONT_SIZE);
                }
                StampContent::Image { .. } => panic!("presets are text stamps"),
            }
        }
    }

    #[test]
    fn test_image_data_serializes_as_data_url() {
        let image = ImageData::from_png(sample_png(1, 1)).unwrap();
        let json = serde_json::to_string(&image).unwrap();
        assert!(json.starts_with("\"data:image/png;base64,"));
        let back: ImageData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, image);
    }
}
