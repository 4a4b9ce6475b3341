//! Progress-callback trait for per-image upload events.
//!
//! Inject an [`Arc<dyn UploadProgressCallback>`] via
//! [`crate::publish::ImagePublisher::with_progress`] to receive events as
//! the upload round works through each inline image. A desktop host drives a
//! progress dialog from it; the CLI drives an `indicatif` bar.
//!
//! # Example
//!
//! ```rust
//! use docpaste::UploadProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     uploaded: AtomicUsize,
//! }
//!
//! impl UploadProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, url: &str) {
//!         let done = self.uploaded.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("Image {index}/{total} → {url} ({done} done)");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the upload pipeline as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Images are uploaded one at a time, so calls never
/// overlap, but the trait is `Send + Sync` so the callback can be shared with
/// a UI thread.
pub trait UploadProgressCallback: Send + Sync {
    /// Called once before the first image.
    ///
    /// # Arguments
    /// * `total`: inline images found, duplicates included
    fn on_upload_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before an image's credentials are requested.
    ///
    /// # Arguments
    /// * `index`: 1-based image position
    /// * `total`: images in this round
    fn on_image_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an image is stored.
    ///
    /// # Arguments
    /// * `index`: 1-based image position
    /// * `total`: images in this round
    /// * `url`:   public URL of the stored object
    fn on_image_complete(&self, index: usize, total: usize, url: &str) {
        let _ = (index, total, url);
    }

    /// Called when an image's upload failed; the round continues.
    ///
    /// # Arguments
    /// * `index`: 1-based image position
    /// * `total`: images in this round
    /// * `error`: human-readable error description
    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after the last attempted image, also after cancellation.
    ///
    /// # Arguments
    /// * `total`:     images in this round
    /// * `succeeded`: images stored successfully
    fn on_upload_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl UploadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::publish::ImagePublisher`].
pub type ProgressCallback = Arc<dyn UploadProgressCallback>;
