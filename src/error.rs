//! Error types for the docpaste library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocPasteError`] is **session-fatal**: the confirmation cannot proceed
//!   at all (endpoint missing from the configuration, credentials endpoint
//!   unreachable or returning garbage). Returned as `Err(DocPasteError)` from
//!   [`crate::publish::ImagePublisher::publish`] and surfaced to the user with
//!   its underlying message.
//!
//! * [`ImageUploadError`] is **per-item**: one image's upload failed but every
//!   other image is still attempted. Stored inside
//!   [`crate::output::ImageUploadResult`] so callers can report
//!   `succeeded/total` rather than losing the whole round to one bad image.
//!
//! Render-time remote image fetches have no error type: a failed fetch is
//! logged and skipped.

use thiserror::Error;

/// All fatal errors returned by the docpaste library.
///
/// Per-image upload failures use [`ImageUploadError`] and are stored in
/// [`crate::output::ImageUploadResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DocPasteError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// An endpoint required for uploading was never configured.
    #[error("Upload endpoint '{name}' is not configured.\nSet {env} in the environment or api.env.")]
    MissingEndpoint { name: &'static str, env: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Credential errors ─────────────────────────────────────────────────
    /// The credentials endpoint could not be reached or returned non-2xx.
    #[error("Failed to fetch upload credentials from '{url}': {reason}")]
    CredentialsFailed { url: String, reason: String },

    /// The credentials endpoint answered, but not with usable credentials.
    #[error("Credentials response is malformed: {reason}")]
    CredentialsMalformed { reason: String },

    /// The credentials were already past their validity window on arrival.
    #[error("Upload credentials expired at {expired_at}")]
    CredentialsExpired { expired_at: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// A confirmation was requested while another upload round was running.
    #[error("An upload is already in progress")]
    UploadInProgress,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image upload.
///
/// `index` is the 1-based position of the image among the inline images of
/// the canonical markup.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageUploadError {
    /// The data URI could not be decoded into bytes.
    #[error("Image {index}: invalid inline payload: {detail}")]
    InvalidPayload { index: usize, detail: String },

    /// The storage service answered with a non-success status.
    #[error("Image {index}: upload rejected with HTTP {status}")]
    Rejected {
        index: usize,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connection, timeout, TLS).
    #[error("Image {index}: upload failed: {detail}")]
    Transport { index: usize, detail: String },
}

impl ImageUploadError {
    /// 1-based position of the failing image.
    pub fn index(&self) -> usize {
        match self {
            ImageUploadError::InvalidPayload { index, .. }
            | ImageUploadError::Rejected { index, .. }
            | ImageUploadError::Transport { index, .. } => *index,
        }
    }
}
