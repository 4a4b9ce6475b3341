//! Render-time loading of remote images.
//!
//! The rich editor cannot fetch `http(s)` images by itself, so after every
//! sync the controller fetches each remote `src` once, decodes it, and
//! registers the bitmap with the rich surface under its URL. Nothing here
//! touches the markup and nothing here feeds the upload pipeline.
//!
//! Every failure (connect error, non-2xx, timeout, undecodable bytes) is a
//! transient skip: logged at `warn` and dropped. The image just stays
//! unrendered.

use super::locate::{locate_images, SourceKind};
use crate::config::UploadConfig;
use crate::error::DocPasteError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a single remote image could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("HTTP {status}")]
    Status { status: u16 },
    #[error("{0}")]
    Network(String),
}

/// Source of remote image bytes.
///
/// The reqwest-backed [`HttpImageFetcher`] is the production implementation;
/// tests swap in canned bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches images over HTTP with a fixed per-request timeout.
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpImageFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, DocPasteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DocPasteError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                FetchError::Network(e.to_string())
            }
        })?;
        Ok(bytes.to_vec())
    }
}

/// A decoded remote image, ready to register with the rich surface.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// URL exactly as it first appeared in the markup.
    pub url: String,
    pub image: DynamicImage,
}

/// Fetches and decodes every remote image of a markup string.
#[derive(Clone)]
pub struct RemoteImageLoader {
    fetcher: Arc<dyn ImageFetcher>,
    concurrency: usize,
}

impl RemoteImageLoader {
    /// HTTP loader using the config's fetch timeout and concurrency.
    pub fn new(config: &UploadConfig) -> Result<Self, DocPasteError> {
        let fetcher = HttpImageFetcher::new(config.remote_fetch_timeout_secs)?;
        Ok(Self::with_fetcher(
            Arc::new(fetcher),
            config.remote_fetch_concurrency,
        ))
    }

    pub fn with_fetcher(fetcher: Arc<dyn ImageFetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch every distinct remote image in `markup`.
    ///
    /// Results keep the order of first appearance; failed images are absent.
    pub async fn load(&self, markup: &str) -> Vec<FetchedImage> {
        let urls = remote_image_urls(markup);
        if urls.is_empty() {
            return Vec::new();
        }
        debug!("Loading {} remote images", urls.len());

        let results: Vec<Option<FetchedImage>> = stream::iter(urls.into_iter().map(|url| {
            let fetcher = Arc::clone(&self.fetcher);
            async move { fetch_one(fetcher.as_ref(), url).await }
        }))
        .buffered(self.concurrency)
        .collect()
        .await;

        results.into_iter().flatten().collect()
    }
}

async fn fetch_one(fetcher: &dyn ImageFetcher, url: String) -> Option<FetchedImage> {
    let bytes = match fetcher.fetch(&url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to load {}: {}", url, e);
            return None;
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(image) => {
            debug!("Loaded {} ({}x{})", url, image.width(), image.height());
            Some(FetchedImage { url, image })
        }
        Err(e) => {
            warn!("Failed to decode {}: {}", url, e);
            None
        }
    }
}

/// Distinct remote `src` values, compared case-insensitively.
pub fn remote_image_urls(markup: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    locate_images(markup)
        .into_iter()
        .filter(|occ| occ.kind == SourceKind::Remote)
        .filter_map(|occ| occ.locator.map(|l| l.value))
        .filter(|url| seen.insert(url.to_lowercase()))
        .collect()
}
