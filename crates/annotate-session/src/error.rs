use annotate_core::AnnotateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please enter a PDF URL")]
    EmptyUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL does not point to a PDF (content type: {content_type})")]
    NotPdf { content_type: String },

    #[error("Failed to fetch PDF: {0}")]
    Fetch(String),

    #[error("Server responded with HTTP {status}")]
    Http { status: u16 },

    #[error("No PDF document is loaded")]
    NoDocument,

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Failed to save annotations: {0}")]
    Remote(String),

    #[error("No annotation storage endpoint is configured")]
    RemoteNotConfigured,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Editor was already initialized with different renderer settings")]
    AlreadyInitialized,

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

impl SessionError {
    /// Input errors are the user's to fix; everything else is worth a retry
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SessionError::EmptyUrl | SessionError::InvalidUrl(_) | SessionError::NotPdf { .. }
        )
    }
}
