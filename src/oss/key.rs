//! Object keys for uploaded images.
//!
//! Layout: `{prefix}/{hash8}.{millis}.{seq}.{salt}.{ext}`
//!
//! - `hash8`:  first 8 hex digits of SHA-256 over the first 128 image bytes
//! - `millis`: Unix time in milliseconds
//! - `seq`:    process-wide counter, strictly increasing per key
//! - `salt`:   8 random hex digits
//!
//! Byte-identical images in one round share `hash8` and usually `millis`,
//! so `seq` alone keeps their keys apart inside this process; `salt` covers
//! other processes writing to the same prefix.

use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

const HASH_INPUT_LEN: usize = 128;

static KEY_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Storage path of one uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Derive a fresh key for `bytes` stored with extension `ext`.
    pub fn derive(prefix: &str, bytes: &[u8], millis: i64, ext: &str) -> Self {
        let seq = KEY_SEQUENCE.fetch_add(1, Ordering::SeqCst);
        let salt: u32 = rand::thread_rng().gen();
        Self::from_parts(prefix, &content_hash_prefix(bytes), millis, seq, salt, ext)
    }

    /// Assemble a key from already-chosen components.
    pub fn from_parts(prefix: &str, hash: &str, millis: i64, seq: u64, salt: u32, ext: &str) -> Self {
        let name = format!("{hash}.{millis}.{seq}.{salt:08x}.{ext}");
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            Self(name)
        } else {
            Self(format!("{prefix}/{name}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// First 8 hex digits of SHA-256 over at most the first 128 bytes.
pub fn content_hash_prefix(bytes: &[u8]) -> String {
    let head = &bytes[..bytes.len().min(HASH_INPUT_LEN)];
    let digest = Sha256::digest(head);
    hex::encode(&digest[..4])
}

/// File extension for an image MIME type: `image/jpeg` → `jpeg`,
/// `image/svg+xml` → `svg`. Falls back to `png`.
pub fn extension_for_mime(mime: &str) -> String {
    mime.split_once('/')
        .map(|(_, sub)| sub)
        .map(|sub| sub.split(['+', ';']).next().unwrap_or(sub))
        .map(|sub| sub.trim().to_ascii_lowercase())
        .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or_else(|| "png".to_string())
}
