//! Result types of an upload round.

use crate::error::ImageUploadError;
use serde::{Deserialize, Serialize};

/// Outcome of one inline image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUploadResult {
    /// 1-based position among the inline images of the markup.
    pub index: usize,
    /// MIME type taken from the data URI.
    pub mime: String,
    /// Decoded payload size.
    pub size_bytes: usize,
    /// Object key, when the upload got as far as choosing one.
    pub key: Option<String>,
    /// Public URL, on success only.
    pub url: Option<String>,
    pub duration_ms: u64,
    pub error: Option<ImageUploadError>,
}

impl ImageUploadResult {
    pub fn is_success(&self) -> bool {
        self.url.is_some() && self.error.is_none()
    }
}

/// Aggregate counters for a round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishStats {
    /// Inline images found, duplicates included.
    pub total_images: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Images never attempted because the round was cancelled.
    pub skipped: usize,
    pub cancelled: bool,
    pub total_duration_ms: u64,
}

/// Everything an upload round produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutput {
    /// Canonical markup with every uploaded data URI replaced by its URL.
    pub markup: String,
    /// One entry per attempted image, in document order.
    pub images: Vec<ImageUploadResult>,
    pub stats: PublishStats,
}

impl PublishOutput {
    /// `(succeeded, total)`, the pair reported to the user.
    pub fn summary(&self) -> (usize, usize) {
        (self.stats.succeeded, self.stats.total_images)
    }

    /// Output for markup without inline images.
    pub(crate) fn unchanged(markup: String) -> Self {
        Self {
            markup,
            images: Vec::new(),
            stats: PublishStats::default(),
        }
    }
}
