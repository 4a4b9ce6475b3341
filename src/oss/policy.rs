//! Upload policy and its signature.
//!
//! A POST-object upload carries a base64 JSON policy that bounds what the
//! form may do (here: an expiry and a size range) and an HMAC-SHA1 of that
//! exact base64 string keyed with the temporary secret. The service recomputes
//! the HMAC; any byte difference between what was signed and what was sent
//! rejects the upload.

use crate::error::DocPasteError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Policy document for one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadPolicy {
    /// ISO-8601 UTC with second precision, e.g. `2026-10-19T09:00:00Z`.
    pub expiration: String,
    pub conditions: Vec<serde_json::Value>,
}

impl UploadPolicy {
    /// Policy expiring `ttl_secs` after `now`, allowing `0..=max_len` bytes.
    pub fn new(now: DateTime<Utc>, ttl_secs: u64, max_len: u64) -> Self {
        let ttl = Duration::seconds(i64::from(u32::try_from(ttl_secs).unwrap_or(u32::MAX)));
        let expiration = (now + ttl).format("%Y-%m-%dT%H:%M:%SZ").to_string();
        Self {
            expiration,
            conditions: vec![serde_json::json!(["content-length-range", 0, max_len])],
        }
    }

    /// Base64 of the policy's JSON serialization.
    pub fn encode(&self) -> Result<String, DocPasteError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| DocPasteError::Internal(format!("Failed to serialise policy: {e}")))?;
        Ok(STANDARD.encode(json))
    }
}

/// `base64(HMAC-SHA1(key = secret, message = encoded_policy))`.
pub fn sign_policy(encoded_policy: &str, secret: &str) -> Result<String, DocPasteError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| DocPasteError::Internal(format!("Invalid signing key: {e}")))?;
    mac.update(encoded_policy.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// A policy ready to be placed in the upload form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPolicy {
    pub encoded: String,
    pub signature: String,
}

impl SignedPolicy {
    pub fn new(policy: &UploadPolicy, secret: &str) -> Result<Self, DocPasteError> {
        let encoded = policy.encode()?;
        let signature = sign_policy(&encoded, secret)?;
        Ok(Self { encoded, signature })
    }
}
