//! JSON export and import of the annotation set
//!
//! The exported document groups annotations per kind and carries enough to
//! rebuild an equivalent store: ids, geometry, styles, image payloads as data
//! URLs and creation timestamps. `documentInfo.createdAt` / `lastModified` are
//! the export time and are the only time-dependent fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationPayload, ImageData, Position, Size,
    StampContent, TextStyle, DEFAULT_TEXT_COLOR, STAMP_FONT_SIZE, TEXT_FONT_SIZE,
};
use crate::error::AnnotateError;
use crate::store::{AnnotationStats, AnnotationStore, Snapshot};

/// Where the loaded PDF came from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DocumentSource {
    #[default]
    Uploaded,
    Url(String),
}

impl DocumentSource {
    /// `documentInfo.source` in the JSON export
    pub fn identifier(&self) -> &str {
        match self {
            DocumentSource::Uploaded => "uploaded_file",
            DocumentSource::Url(url) => url,
        }
    }

    /// `pdfSource` in the remote save payload
    pub fn save_identifier(&self) -> &str {
        match self {
            DocumentSource::Uploaded => "uploaded",
            DocumentSource::Url(url) => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDocument {
    pub document_info: DocumentInfo,
    pub annotations: AnnotationGroups,
    pub document_stats: AnnotationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub file_name: String,
    pub source: String,
    pub total_pages: u32,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationGroups {
    #[serde(default)]
    pub signatures: Vec<SignatureEntry>,
    #[serde(default)]
    pub stamps: Vec<StampEntry>,
    #[serde(default)]
    pub text_annotations: Vec<TextEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureEntry {
    pub id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub page: u32,
    pub position: Position,
    pub dimensions: Size,
    #[serde(default)]
    pub rotation: f64,
    pub data: ImageData,
    pub created_at: DateTime<Utc>,
}

/// Text styling plus box dimensions, as the export groups them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    pub width: f64,
    pub height: f64,
}

impl EntryStyle {
    fn new(style: Option<&TextStyle>, size: Size) -> Self {
        Self {
            color: style.map(|s| s.color.clone()),
            font_size: style.map(|s| s.font_size),
            width: size.width,
            height: size.height,
        }
    }

    fn text_style(&self, default_font_size: f64) -> TextStyle {
        TextStyle::new(
            self.color.as_deref().unwrap_or(DEFAULT_TEXT_COLOR),
            self.font_size.unwrap_or(default_font_size),
        )
    }

    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampEntry {
    pub id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageData>,
    pub page: u32,
    pub position: Position,
    pub style: EntryStyle,
    #[serde(default)]
    pub rotation: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEntry {
    pub id: AnnotationId,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub content: String,
    pub page: u32,
    pub position: Position,
    pub style: EntryStyle,
    #[serde(default)]
    pub rotation: f64,
    pub created_at: DateTime<Utc>,
}

impl AnnotationDocument {
    pub fn new(
        file_name: &str,
        source: &DocumentSource,
        snapshot: &Snapshot,
        page_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut groups = AnnotationGroups::default();
        for annotation in snapshot.annotations() {
            let Annotation {
                id,
                page,
                position,
                size,
                rotation,
                created_at,
                ..
            } = *annotation;
            match &annotation.payload {
                AnnotationPayload::Signature { image } => groups.signatures.push(SignatureEntry {
                    id,
                    kind: AnnotationKind::Signature,
                    page,
                    position,
                    dimensions: size,
                    rotation,
                    data: image.clone(),
                    created_at,
                }),
                AnnotationPayload::Stamp { content } => {
                    let (text, image, style) = match content {
                        StampContent::Text { text, style } => {
                            (Some(text.clone()), None, EntryStyle::new(Some(style), size))
                        }
                        StampContent::Image { image } => {
                            (None, Some(image.clone()), EntryStyle::new(None, size))
                        }
                    };
                    groups.stamps.push(StampEntry {
                        id,
                        kind: AnnotationKind::Stamp,
                        text,
                        image,
                        page,
                        position,
                        style,
                        rotation,
                        created_at,
                    });
                }
                AnnotationPayload::Text { content, style } => {
                    groups.text_annotations.push(TextEntry {
                        id,
                        kind: AnnotationKind::Text,
                        content: content.clone(),
                        page,
                        position,
                        style: EntryStyle::new(Some(style), size),
                        rotation,
                        created_at,
                    })
                }
            }
        }

        Self {
            document_info: DocumentInfo {
                file_name: file_name.to_string(),
                source: source.identifier().to_string(),
                total_pages: page_count,
                created_at: now,
                last_modified: now,
            },
            annotations: groups,
            document_stats: snapshot.stats(),
        }
    }

    /// Rebuild annotation records in id order
    pub fn to_annotations(&self) -> Result<Vec<Annotation>, AnnotateError> {
        let groups = &self.annotations;
        let mut annotations = Vec::with_capacity(
            groups.signatures.len() + groups.stamps.len() + groups.text_annotations.len(),
        );

        for entry in &groups.signatures {
            expect_kind(entry.id, entry.kind, AnnotationKind::Signature)?;
            annotations.push(rebuild(
                entry.id,
                entry.page,
                entry.position,
                entry.dimensions,
                entry.rotation,
                entry.created_at,
                AnnotationPayload::Signature {
                    image: entry.data.clone(),
                },
            ));
        }

        for entry in &groups.stamps {
            expect_kind(entry.id, entry.kind, AnnotationKind::Stamp)?;
            let content = match (&entry.text, &entry.image) {
                (_, Some(image)) => StampContent::Image {
                    image: image.clone(),
                },
                (Some(text), None) => StampContent::Text {
                    text: text.clone(),
                    style: entry.style.text_style(STAMP_FONT_SIZE),
                },
                (None, None) => {
                    return Err(AnnotateError::SerializationError(format!(
                        "stamp {} has neither text nor image",
                        entry.id
                    )))
                }
            };
            annotations.push(rebuild(
                entry.id,
                entry.page,
                entry.position,
                entry.style.size(),
                entry.rotation,
                entry.created_at,
                AnnotationPayload::Stamp { content },
            ));
        }

        for entry in &groups.text_annotations {
            expect_kind(entry.id, entry.kind, AnnotationKind::Text)?;
            annotations.push(rebuild(
                entry.id,
                entry.page,
                entry.position,
                entry.style.size(),
                entry.rotation,
                entry.created_at,
                AnnotationPayload::Text {
                    content: entry.content.clone(),
                    style: entry.style.text_style(TEXT_FONT_SIZE),
                },
            ));
        }

        annotations.sort_by_key(|a| a.id);
        Ok(annotations)
    }
}

fn expect_kind(
    id: AnnotationId,
    found: AnnotationKind,
    expected: AnnotationKind,
) -> Result<(), AnnotateError> {
    if found == expected {
        Ok(())
    } else {
        Err(AnnotateError::SerializationError(format!(
            "annotation {} is listed as {} but typed {}",
            id, expected, found
        )))
    }
}

fn rebuild(
    id: AnnotationId,
    page: u32,
    position: Position,
    size: Size,
    rotation: f64,
    created_at: DateTime<Utc>,
    payload: AnnotationPayload,
) -> Annotation {
    let mut annotation = Annotation::new(id, page, payload, created_at);
    annotation.position = position;
    annotation.size = size;
    annotation.rotation = crate::annotation::normalize_rotation(rotation);
    annotation
}

/// Export the snapshot as a pretty-printed JSON document, stamped with the current time
pub fn to_json(
    file_name: &str,
    source: &DocumentSource,
    snapshot: &Snapshot,
    page_count: u32,
) -> Result<String, AnnotateError> {
    to_json_at(file_name, source, snapshot, page_count, Utc::now())
}

pub fn to_json_at(
    file_name: &str,
    source: &DocumentSource,
    snapshot: &Snapshot,
    page_count: u32,
    now: DateTime<Utc>,
) -> Result<String, AnnotateError> {
    let document = AnnotationDocument::new(file_name, source, snapshot, page_count, now);
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn from_json(json: &str) -> Result<AnnotationDocument, AnnotateError> {
    Ok(serde_json::from_str(json)?)
}

impl AnnotationStore {
    /// Rebuild a store from an imported document; see [`AnnotationStore::restore`]
    pub fn from_document(document: &AnnotationDocument) -> Result<Self, AnnotateError> {
        AnnotationStore::restore(document.to_annotations()?)
    }
}

/// Body POSTed to a remote annotation-storage endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub pdf_name: String,
    pub pdf_source: String,
    pub annotations: AnnotationDocument,
    pub document_stats: SaveStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStats {
    pub total_pages: u32,
    pub last_modified: DateTime<Utc>,
}

impl SavePayload {
    pub fn new(
        file_name: &str,
        source: &DocumentSource,
        snapshot: &Snapshot,
        page_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            pdf_name: file_name.to_string(),
            pdf_source: source.save_identifier().to_string(),
            annotations: AnnotationDocument::new(file_name, source, snapshot, page_count, now),
            document_stats: SaveStats {
                total_pages: page_count,
                last_modified: now,
            },
        }
    }
}
