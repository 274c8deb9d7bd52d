//! Getting PDF bytes into the editor: local uploads and HTTP GET by URL

use std::sync::Arc;
use std::time::Duration;

use annotate_core::{file_name_from_url, inspect_pdf, DocumentSource, PdfInfo};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::error::SessionError;

const PDF_MIME: &str = "application/pdf";

/// A validated document ready for editing
#[derive(Debug, Clone)]
pub struct LoadedPdf {
    pub file_name: String,
    pub source: DocumentSource,
    pub bytes: Arc<[u8]>,
    pub info: PdfInfo,
}

impl LoadedPdf {
    pub fn new(
        file_name: impl Into<String>,
        source: DocumentSource,
        bytes: Vec<u8>,
    ) -> Result<Self, SessionError> {
        let info = inspect_pdf(&bytes)?;
        Ok(Self {
            file_name: file_name.into(),
            source,
            bytes: bytes.into(),
            info,
        })
    }

    pub fn from_upload(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, SessionError> {
        Self::new(file_name, DocumentSource::Uploaded, bytes)
    }

    pub fn page_count(&self) -> u32 {
        self.info.page_count
    }
}

/// HTTP client honoring the fetch timeout and user agent
pub fn build_client(config: &FetchConfig) -> Result<Client, SessionError> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| SessionError::Config(e.to_string()))
}

/// Check the URL field before any request goes out
pub fn parse_pdf_url(input: &str) -> Result<Url, SessionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SessionError::EmptyUrl);
    }
    let url = Url::parse(input).map_err(|e| SessionError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(SessionError::InvalidUrl(format!(
            "unsupported scheme: {}",
            other
        ))),
    }
}

/// Accept a response only if its content type mentions application/pdf
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), SessionError> {
    match content_type {
        Some(value) if value.to_ascii_lowercase().contains(PDF_MIME) => Ok(()),
        other => Err(SessionError::NotPdf {
            content_type: other.unwrap_or("none").to_string(),
        }),
    }
}

/// Download and validate a PDF
pub async fn fetch_pdf(client: &Client, url: &Url) -> Result<LoadedPdf, SessionError> {
    info!(%url, "fetching PDF");
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| SessionError::Fetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        warn!(%url, status = status.as_u16(), "PDF fetch rejected");
        return Err(SessionError::Http {
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if let Err(err) = validate_content_type(content_type) {
        warn!(%url, ?content_type, "response is not a PDF");
        return Err(err);
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SessionError::Fetch(e.to_string()))?;

    let pdf = LoadedPdf::new(
        file_name_from_url(url.as_str()),
        DocumentSource::Url(url.to_string()),
        bytes.to_vec(),
    )?;
    info!(
        file_name = %pdf.file_name,
        pages = pdf.page_count(),
        bytes = pdf.bytes.len(),
        "PDF loaded from URL"
    );
    Ok(pdf)
}
