//! Temporary (STS) credentials for one upload.
//!
//! The credentials endpoint answers with a JSON envelope whose `data` object
//! carries the key pair and session token:
//!
//! ```json
//! { "code": 0, "data": {
//!     "accessKeyId": "STS.Nk…", "accessKeySecret": "9x…",
//!     "securityToken": "CAIS…", "expiration": "2026-10-19T08:00:00Z" } }
//! ```
//!
//! `expiration` is optional; when present it bounds the validity window.

use crate::error::DocPasteError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Short-lived credentials authorising uploads.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadCredentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    /// End of validity in Unix seconds, when the broker states one.
    pub expires_at_epoch_secs: Option<i64>,
}

impl fmt::Debug for UploadCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("security_token", &"<redacted>")
            .field("expires_at_epoch_secs", &self.expires_at_epoch_secs)
            .finish()
    }
}

#[derive(Deserialize)]
struct Envelope {
    data: Option<WireCredentials>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCredentials {
    access_key_id: String,
    access_key_secret: String,
    security_token: String,
    #[serde(default)]
    expiration: Option<String>,
}

impl UploadCredentials {
    /// Parse a credentials endpoint response body.
    pub fn from_response(body: &str) -> Result<Self, DocPasteError> {
        let envelope: Envelope =
            serde_json::from_str(body).map_err(|e| DocPasteError::CredentialsMalformed {
                reason: e.to_string(),
            })?;
        let wire = envelope
            .data
            .ok_or_else(|| DocPasteError::CredentialsMalformed {
                reason: "No STS data in response".into(),
            })?;

        if wire.access_key_id.is_empty() || wire.access_key_secret.is_empty() {
            return Err(DocPasteError::CredentialsMalformed {
                reason: "empty access key".into(),
            });
        }

        let expires_at_epoch_secs = match wire.expiration.as_deref() {
            None | Some("") => None,
            Some(s) => Some(
                DateTime::parse_from_rfc3339(s)
                    .map_err(|e| DocPasteError::CredentialsMalformed {
                        reason: format!("bad expiration '{s}': {e}"),
                    })?
                    .timestamp(),
            ),
        };

        Ok(Self {
            access_key_id: wire.access_key_id,
            access_key_secret: wire.access_key_secret,
            security_token: wire.security_token,
            expires_at_epoch_secs,
        })
    }

    /// Whether the credentials are still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_epoch_secs
            .map_or(true, |exp| now.timestamp() < exp)
    }

    /// Fail with `CredentialsExpired` if `now` is past the validity window.
    pub fn ensure_valid(&self, now: DateTime<Utc>) -> Result<(), DocPasteError> {
        if self.is_valid_at(now) {
            return Ok(());
        }
        let expired_at = self
            .expires_at_epoch_secs
            .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        Err(DocPasteError::CredentialsExpired { expired_at })
    }
}
