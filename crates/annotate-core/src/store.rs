//! Annotation store
//!
//! Holds every signature, stamp and text annotation of an editing session in
//! one ordered collection. Mutations are keyed by id, so callers never need to
//! know an annotation's kind ahead of time.
//!
//! The collection is copy-on-write: a [`Snapshot`] taken before a mutation keeps
//! seeing the old state, and the mutation produces a new collection with the
//! changed entry replaced.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotation::{
    normalize_rotation, Annotation, AnnotationId, AnnotationKind, AnnotationPayload, ImageData,
    Position, Size, StampContent,
};
use crate::error::AnnotateError;

#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    next_id: AnnotationId,
    annotations: Arc<Vec<Annotation>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously exported annotations.
    ///
    /// Entries are ordered by id and the id counter resumes after the largest
    /// one, so new annotations still sort after the imported ones.
    pub fn restore(mut annotations: Vec<Annotation>) -> Result<Self, AnnotateError> {
        let mut seen = HashSet::new();
        for annotation in &annotations {
            if annotation.page == 0 {
                return Err(AnnotateError::InvalidPage(0));
            }
            if !seen.insert(annotation.id) {
                return Err(AnnotateError::SerializationError(format!(
                    "duplicate annotation id {}",
                    annotation.id
                )));
            }
        }
        annotations.sort_by_key(|a| a.id);
        let next_id = annotations.last().map(|a| a.id + 1).unwrap_or(0);

        Ok(Self {
            next_id,
            annotations: Arc::new(annotations),
        })
    }

    /// Create an annotation with the default geometry for its kind
    pub fn add(
        &mut self,
        payload: AnnotationPayload,
        page: u32,
    ) -> Result<Annotation, AnnotateError> {
        self.add_at(payload, page, Utc::now())
    }

    pub fn add_at(
        &mut self,
        payload: AnnotationPayload,
        page: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Annotation, AnnotateError> {
        if page == 0 {
            return Err(AnnotateError::InvalidPage(page));
        }

        let id = self.next_id;
        self.next_id += 1;

        let annotation = Annotation::new(id, page, payload, created_at);
        Arc::make_mut(&mut self.annotations).push(annotation.clone());
        debug!(id, page, kind = %annotation.kind(), "annotation added");
        Ok(annotation)
    }

    pub fn add_signature(
        &mut self,
        image: ImageData,
        page: u32,
    ) -> Result<Annotation, AnnotateError> {
        self.add(AnnotationPayload::Signature { image }, page)
    }

    pub fn add_stamp(
        &mut self,
        content: StampContent,
        page: u32,
    ) -> Result<Annotation, AnnotateError> {
        self.add(AnnotationPayload::Stamp { content }, page)
    }

    pub fn add_text_annotation(
        &mut self,
        content: impl Into<String>,
        page: u32,
    ) -> Result<Annotation, AnnotateError> {
        self.add(AnnotationPayload::text(content), page)
    }

    pub fn update_position(&mut self, id: AnnotationId, x: f64, y: f64) -> bool {
        self.update(id, |a| a.position = Position::new(x, y))
    }

    pub fn update_size(&mut self, id: AnnotationId, width: f64, height: f64) -> bool {
        self.update(id, |a| a.size = Size::new(width, height))
    }

    pub fn update_rotation(&mut self, id: AnnotationId, degrees: f64) -> bool {
        self.update(id, |a| a.rotation = normalize_rotation(degrees))
    }

    fn update(&mut self, id: AnnotationId, apply: impl FnOnce(&mut Annotation)) -> bool {
        let Some(index) = self.annotations.iter().position(|a| a.id == id) else {
            return false;
        };
        apply(&mut Arc::make_mut(&mut self.annotations)[index]);
        true
    }

    /// Remove an annotation. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: AnnotationId) -> bool {
        let Some(index) = self.annotations.iter().position(|a| a.id == id) else {
            return false;
        };
        Arc::make_mut(&mut self.annotations).remove(index);
        debug!(id, "annotation removed");
        true
    }

    /// Drop every annotation. Ids are never reused within a session.
    pub fn clear(&mut self) {
        self.annotations = Arc::new(Vec::new());
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn for_page(&self, page: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.page == page).collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            annotations: Arc::clone(&self.annotations),
        }
    }
}

/// Immutable view of the store at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    annotations: Arc<Vec<Annotation>>,
}

impl Snapshot {
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn of_kind(&self, kind: AnnotationKind) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.kind() == kind)
    }

    pub fn signatures(&self) -> impl Iterator<Item = &Annotation> {
        self.of_kind(AnnotationKind::Signature)
    }

    pub fn stamps(&self) -> impl Iterator<Item = &Annotation> {
        self.of_kind(AnnotationKind::Stamp)
    }

    pub fn text_annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.of_kind(AnnotationKind::Text)
    }

    pub fn stats(&self) -> AnnotationStats {
        AnnotationStats {
            total_signatures: self.signatures().count(),
            total_stamps: self.stamps().count(),
            total_text_annotations: self.text_annotations().count(),
        }
    }
}

impl From<Vec<Annotation>> for Snapshot {
    fn from(annotations: Vec<Annotation>) -> Self {
        Self {
            annotations: Arc::new(annotations),
        }
    }
}

/// Per-kind counts, exported as `documentStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationStats {
    pub total_signatures: usize,
    pub total_stamps: usize,
    pub total_text_annotations: usize,
}

impl AnnotationStats {
    pub fn total(&self) -> usize {
        self.total_signatures + self.total_stamps + self.total_text_annotations
    }
}
