//! Network side of the upload protocol.
//!
//! [`OssTransport`] is the seam between the upload pipeline and HTTP. The
//! pipeline decides what to send and how to react; the transport only moves
//! bytes. [`HttpOssTransport`] is the reqwest implementation.

use super::credentials::UploadCredentials;
use super::form::UploadForm;
use crate::error::DocPasteError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// What the upload endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

impl UploadResponse {
    /// Any 2xx status; with `success_action_status=200` the service answers 200.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP operations the upload pipeline needs.
#[async_trait]
pub trait OssTransport: Send + Sync {
    /// GET fresh credentials. Any failure is session-fatal.
    async fn fetch_credentials(&self, url: &str) -> Result<UploadCredentials, DocPasteError>;

    /// POST one multipart form. `Err` means no response was obtained; a
    /// response with any status is `Ok`.
    async fn post_form(&self, url: &str, form: UploadForm) -> Result<UploadResponse, String>;
}

/// reqwest-backed transport with one timeout for every request.
pub struct HttpOssTransport {
    client: reqwest::Client,
}

impl HttpOssTransport {
    pub fn new(timeout_secs: u64) -> Result<Self, DocPasteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DocPasteError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl OssTransport for HttpOssTransport {
    async fn fetch_credentials(&self, url: &str) -> Result<UploadCredentials, DocPasteError> {
        let failed = |reason: String| DocPasteError::CredentialsFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let body = response.text().await.map_err(|e| failed(e.to_string()))?;
        debug!("Credentials response: {} bytes", body.len());
        UploadCredentials::from_response(&body)
    }

    async fn post_form(&self, url: &str, form: UploadForm) -> Result<UploadResponse, String> {
        let multipart = form.into_multipart().map_err(|e| e.to_string())?;
        let response = self
            .client
            .post(url)
            .multipart(multipart)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("timed out: {e}")
                } else {
                    e.to_string()
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!("Upload response: HTTP {} ({} bytes)", status, body.len());
        Ok(UploadResponse { status, body })
    }
}
