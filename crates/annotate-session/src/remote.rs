//! Optional remote annotation storage
//!
//! The storage server is an external collaborator; this side only POSTs the
//! payload as JSON and reports whether the server accepted it.

use std::time::Duration;

use annotate_core::SavePayload;
use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::config::RemoteConfig;
use crate::error::SessionError;

#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    endpoint: Option<Url>,
    timeout: Duration,
}

impl RemoteStore {
    pub fn new(client: Client, config: &RemoteConfig) -> Result<Self, SessionError> {
        let endpoint = config
            .save_endpoint
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| SessionError::Config(format!("invalid save_endpoint: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// POST the payload; no automatic retry
    pub async fn save(&self, payload: &SavePayload) -> Result<(), SessionError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or(SessionError::RemoteNotConfigured)?;

        let response = self
            .client
            .post(endpoint.clone())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| SessionError::Remote(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%endpoint, status = status.as_u16(), "remote save rejected");
            return Err(SessionError::Http {
                status: status.as_u16(),
            });
        }

        info!(
            %endpoint,
            pdf_name = %payload.pdf_name,
            annotations = payload.annotations.document_stats.total(),
            "annotations saved remotely"
        );
        Ok(())
    }
}
