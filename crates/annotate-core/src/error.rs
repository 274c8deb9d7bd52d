use thiserror::Error;

use crate::annotation::AnnotationId;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid page number: {0} (pages are numbered from 1)")]
    InvalidPage(u32),

    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    #[error("Failed to embed annotation {id}: {reason}")]
    EmbedError { id: AnnotationId, reason: String },

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AnnotateError {
    fn from(err: serde_json::Error) -> Self {
        AnnotateError::SerializationError(err.to_string())
    }
}

impl From<lopdf::Error> for AnnotateError {
    fn from(err: lopdf::Error) -> Self {
        AnnotateError::OperationError(err.to_string())
    }
}
