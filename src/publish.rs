//! Publishing inline images to object storage.
//!
//! [`ImagePublisher::publish`] takes canonical markup, uploads every inline
//! (`data:`) image it contains, and returns the markup with each uploaded
//! data URI replaced by the object's public URL.
//!
//! ## Failure model
//!
//! - Missing endpoints or a failed credentials request abort the round with
//!   `Err(DocPasteError)`; the markup is left as it was.
//! - A rejected or failed POST marks that one image failed; the round goes
//!   on, and the image keeps its inline data.
//! - Nothing is retried.
//!
//! ## Duplicates
//!
//! Images are collected by position, so two byte-identical pictures are two
//! uploads with two keys. Rewriting replaces, for each success in document
//! order, the first remaining quoted occurrence of its data URI; because the
//! uploads ran in document order this pairs each URL with its own position.

use crate::cancel::CancelFlag;
use crate::config::{Endpoints, UploadConfig};
use crate::error::{DocPasteError, ImageUploadError};
use crate::oss::key::extension_for_mime;
use crate::oss::{
    HttpOssTransport, ObjectKey, OssTransport, SignedPolicy, UploadForm, UploadPolicy,
};
use crate::output::{ImageUploadResult, PublishOutput, PublishStats};
use crate::pipeline::locate::{locate_images, SourceKind};
use crate::progress::ProgressCallback;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Longest upload response body kept in an error.
const MAX_ERROR_BODY: usize = 512;

/// An inline image found in canonical markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// 1-based position among inline images.
    pub index: usize,
    /// The full `data:` URI as written in the markup.
    pub data_uri: String,
}

/// Every inline image of `markup`, duplicates included, in document order.
///
/// Only `<img>` tags whose `src` is already a `data:` URI count; local and
/// remote sources are not uploaded.
pub fn find_inline_images(markup: &str) -> Vec<InlineImage> {
    locate_images(markup)
        .into_iter()
        .filter(|occ| occ.kind == SourceKind::Inline)
        .filter_map(|occ| occ.locator.map(|l| l.value))
        .enumerate()
        .map(|(i, data_uri)| InlineImage {
            index: i + 1,
            data_uri,
        })
        .collect()
}

/// Split `data:<mime>;base64,<payload>` into MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), String> {
    let rest = uri
        .get(..5)
        .filter(|s| s.eq_ignore_ascii_case("data:"))
        .map(|_| &uri[5..])
        .ok_or_else(|| "not a data URI".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URI has no payload".to_string())?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or("").trim().to_ascii_lowercase();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err("data URI is not base64-encoded".into());
    }
    let mime = if mime.is_empty() {
        "image/png".to_string()
    } else {
        mime
    };

    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(&cleaned)
        .or_else(|_| STANDARD_NO_PAD.decode(cleaned.trim_end_matches('=')))
        .map_err(|e| format!("invalid base64: {e}"))?;
    if bytes.is_empty() {
        return Err("empty payload".into());
    }
    Ok((mime, bytes))
}

/// Replace, for each `(data_uri, url)` in order, the first remaining
/// quoted occurrence of `data_uri` in `markup` with `url`.
///
/// Only a whole attribute value matches: the data URI must sit between a
/// pair of matching quotes, so it never matches the prefix of a longer one.
pub fn rewrite_markup(markup: &str, replacements: &[(&str, &str)]) -> String {
    replacements
        .iter()
        .fold(markup.to_string(), |acc, (data_uri, url)| {
            match find_quoted(&acc, data_uri) {
                Some(start) => {
                    let end = start + data_uri.len();
                    let mut out = String::with_capacity(acc.len() - data_uri.len() + url.len());
                    out.push_str(&acc[..start]);
                    out.push_str(url);
                    out.push_str(&acc[end..]);
                    out
                }
                None => acc,
            }
        })
}

/// Byte offset of the first occurrence of `value` that fills a quoted
/// attribute value exactly.
fn find_quoted(haystack: &str, value: &str) -> Option<usize> {
    if value.is_empty() {
        return None;
    }
    haystack.match_indices(value).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + value.len()..].chars().next();
        matches!(
            (before, after),
            (Some('"'), Some('"')) | (Some('\''), Some('\''))
        )
    })
}

/// Uploads inline images of canonical markup.
///
/// # Example
/// ```rust,no_run
/// use docpaste::{CancelFlag, ImagePublisher, UploadConfig};
///
/// # async fn run() -> Result<(), docpaste::DocPasteError> {
/// let publisher = ImagePublisher::new(UploadConfig::from_env()?)?;
/// let out = publisher
///     .publish(r#"<img src="data:image/png;base64,iVBORw0KGgo=">"#, &CancelFlag::new())
///     .await?;
/// let (ok, total) = out.summary();
/// println!("Uploaded {ok} of {total} images");
/// # Ok(()) }
/// ```
pub struct ImagePublisher {
    config: UploadConfig,
    transport: Arc<dyn OssTransport>,
    progress: Option<ProgressCallback>,
}

impl ImagePublisher {
    /// Publisher talking HTTP with the config's request timeout.
    pub fn new(config: UploadConfig) -> Result<Self, DocPasteError> {
        let transport = HttpOssTransport::new(config.request_timeout_secs)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Publisher using a caller-supplied transport.
    pub fn with_transport(config: UploadConfig, transport: Arc<dyn OssTransport>) -> Self {
        Self {
            config,
            transport,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload every inline image of `markup` and rewrite it.
    ///
    /// `cancel` is checked before each image; images not yet started when it
    /// trips are counted as skipped and keep their inline data.
    ///
    /// # Errors
    /// Only session-fatal conditions: a missing endpoint, or a credentials
    /// request that fails, is malformed, or is already expired.
    pub async fn publish(
        &self,
        markup: &str,
        cancel: &CancelFlag,
    ) -> Result<PublishOutput, DocPasteError> {
        let started = Instant::now();
        let images = find_inline_images(markup);
        if images.is_empty() {
            debug!("No inline images to publish");
            return Ok(PublishOutput::unchanged(markup.to_string()));
        }

        let endpoints = self.config.endpoints()?;
        let total = images.len();
        info!("Publishing {} inline images", total);
        if let Some(ref cb) = self.progress {
            cb.on_upload_start(total);
        }

        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;
        for image in &images {
            if cancel.is_cancelled() {
                info!("Upload cancelled before image {}/{}", image.index, total);
                cancelled = true;
                break;
            }
            if let Some(ref cb) = self.progress {
                cb.on_image_start(image.index, total);
            }

            let result = self.upload_one(&endpoints, image).await?;

            if let Some(ref cb) = self.progress {
                match (&result.url, &result.error) {
                    (Some(url), None) => cb.on_image_complete(image.index, total, url),
                    (_, Some(e)) => cb.on_image_error(image.index, total, &e.to_string()),
                    (None, None) => {}
                }
            }
            results.push(result);
        }

        let replacements: Vec<(&str, &str)> = results
            .iter()
            .filter_map(|r| {
                let url = r.url.as_deref()?;
                let uri = images.get(r.index - 1)?.data_uri.as_str();
                Some((uri, url))
            })
            .collect();
        let rewritten = rewrite_markup(markup, &replacements);

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - succeeded;
        let stats = PublishStats {
            total_images: total,
            succeeded,
            failed,
            skipped: total - results.len(),
            cancelled,
            total_duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "Publish complete: {}/{} images, {}ms",
            succeeded, total, stats.total_duration_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_upload_complete(total, succeeded);
        }

        Ok(PublishOutput {
            markup: rewritten,
            images: results,
            stats,
        })
    }

    /// Upload one image. Per-image failures come back inside the result;
    /// only credential problems are returned as `Err`.
    async fn upload_one(
        &self,
        endpoints: &Endpoints<'_>,
        image: &InlineImage,
    ) -> Result<ImageUploadResult, DocPasteError> {
        let start = Instant::now();
        let index = image.index;

        let (mime, bytes) = match decode_data_uri(&image.data_uri) {
            Ok(decoded) => decoded,
            Err(detail) => {
                warn!("Image {}: skipping undecodable payload: {}", index, detail);
                return Ok(ImageUploadResult {
                    index,
                    mime: String::new(),
                    size_bytes: 0,
                    key: None,
                    url: None,
                    duration_ms: start.elapsed().as_millis() as u64,
                    error: Some(ImageUploadError::InvalidPayload { index, detail }),
                });
            }
        };
        let size_bytes = bytes.len();

        let credentials = self
            .transport
            .fetch_credentials(endpoints.credentials_url)
            .await?;
        let now = Utc::now();
        credentials.ensure_valid(now)?;

        let policy = UploadPolicy::new(
            now,
            self.config.policy_ttl_secs,
            self.config.max_content_length,
        );
        let signed = SignedPolicy::new(&policy, &credentials.access_key_secret)?;

        let ext = extension_for_mime(&mime);
        let key = ObjectKey::derive(&self.config.key_prefix, &bytes, now.timestamp_millis(), &ext);
        debug!("Image {}: {} ({} bytes) → {}", index, mime, size_bytes, key);

        let form = UploadForm::new(&key, &signed, &credentials, &ext, &mime, bytes);
        let (url, error) = match self.transport.post_form(endpoints.upload_url, form).await {
            Ok(response) if response.is_success() => (
                Some(UploadConfig::object_url(endpoints.public_base_url, key.as_str())),
                None,
            ),
            Ok(response) => {
                warn!("Image {}: upload rejected with HTTP {}", index, response.status);
                let body = truncate(&response.body, MAX_ERROR_BODY);
                (
                    None,
                    Some(ImageUploadError::Rejected {
                        index,
                        status: response.status,
                        body,
                    }),
                )
            }
            Err(detail) => {
                warn!("Image {}: upload failed: {}", index, detail);
                (None, Some(ImageUploadError::Transport { index, detail }))
            }
        };

        Ok(ImageUploadResult {
            index,
            mime,
            size_bytes,
            key: Some(key.to_string()),
            url,
            duration_ms: start.elapsed().as_millis() as u64,
            error,
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\u{2026}", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_only_inline_images_by_position() {
        let html = r#"<img src="data:image/png;base64,AAAA"><img src="https://x.test/a.png">
            <img src='data:image/png;base64,AAAA'><img src="a.png">"#;
        let found = find_inline_images(html);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].index, 1);
        assert_eq!(found[1].index, 2);
        assert_eq!(found[0].data_uri, found[1].data_uri);
    }

    #[test]
    fn decodes_data_uris() {
        let (mime, bytes) = decode_data_uri("data:image/GIF;base64,R0lG").unwrap();
        assert_eq!(mime, "image/gif");
        assert_eq!(bytes, b"GIF");

        let (_, bytes) = decode_data_uri("data:image/png;base64,R0lGOA\n").unwrap();
        assert_eq!(bytes, b"GIF8");

        assert!(decode_data_uri("data:image/svg+xml;utf8,<svg/>").is_err());
        assert!(decode_data_uri("data:image/png;base64,!!!").is_err());
        assert!(decode_data_uri("https://x.test/a.png").is_err());
    }

    #[test]
    fn rewrite_pairs_duplicates_in_order() {
        let a = "data:image/png;base64,AAAA";
        let html = format!(r#"<img src="{a}"><p>x</p><img src="{a}">"#);
        let out = rewrite_markup(&html, &[(a, "https://cdn/1.png"), (a, "https://cdn/2.png")]);
        assert_eq!(
            out,
            r#"<img src="https://cdn/1.png"><p>x</p><img src="https://cdn/2.png">"#
        );
    }

    #[test]
    fn rewrite_ignores_longer_uri_with_same_prefix() {
        let long = "data:image/png;base64,AAAABBBB";
        let short = "data:image/png;base64,AAAA";
        let html = format!(r#"<img src="{long}"><img src='{short}'>"#);
        let out = rewrite_markup(&html, &[(short, "https://cdn/2.png")]);
        assert_eq!(
            out,
            format!(r#"<img src="{long}"><img src='https://cdn/2.png'>"#)
        );
    }

    #[test]
    fn rewrite_without_quoted_match_leaves_markup() {
        let html = r#"<p>data:image/png;base64,AAAA</p>"#;
        let out = rewrite_markup(html, &[("data:image/png;base64,AAAA", "https://cdn/1.png")]);
        assert_eq!(out, html);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("ééé", 3), "é\u{2026}");
    }
}
