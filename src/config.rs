//! Configuration for the upload pipeline and render-time image loading.
//!
//! All upload behaviour is controlled through [`UploadConfig`], built via its
//! [`UploadConfigBuilder`]. The config is a plain value handed to
//! [`crate::publish::ImagePublisher::new`]; nothing is read from process-wide
//! state after construction, so tests can build one without touching the
//! environment or the file system.
//!
//! Endpoints are optional at construction time. The rest of the library
//! (projection, syncing, rendering) works without them; only an upload
//! attempt requires all three, see [`UploadConfig::endpoints`].

use crate::error::DocPasteError;
use serde::{Deserialize, Serialize};

/// Environment variable holding the credentials (STS) endpoint.
pub const ENV_CREDENTIALS_URL: &str = "STS_URL";
/// Environment variable holding the object-storage upload endpoint.
pub const ENV_UPLOAD_URL: &str = "OSS_UPLOAD_URL";
/// Environment variable holding the public base URL of uploaded objects.
pub const ENV_PUBLIC_BASE_URL: &str = "OSS_BASE_URL";
/// Environment variable overriding the object key prefix.
pub const ENV_KEY_PREFIX: &str = "OSS_KEY_PREFIX";

/// Configuration for publishing inline images.
///
/// # Example
/// ```rust
/// use docpaste::UploadConfig;
///
/// let config = UploadConfig::builder()
///     .credentials_url("https://api.example.com/sts")
///     .upload_url("https://bucket.oss-cn-hangzhou.aliyuncs.com")
///     .public_base_url("https://cdn.example.com")
///     .key_prefix("course/images")
///     .build()
///     .unwrap();
/// assert!(config.endpoints().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// HTTP GET endpoint returning temporary credentials.
    pub credentials_url: Option<String>,

    /// HTTP POST endpoint accepting the multipart upload form.
    pub upload_url: Option<String>,

    /// Base URL under which uploaded objects are publicly reachable.
    /// Stored without a trailing slash.
    pub public_base_url: Option<String>,

    /// Directory-like prefix prepended to every object key. Default: `images`.
    pub key_prefix: String,

    /// Timeout for the credentials request and each upload POST, in seconds.
    /// Default: 30.
    pub request_timeout_secs: u64,

    /// Timeout for each render-time remote image fetch, in seconds. Default: 10.
    pub remote_fetch_timeout_secs: u64,

    /// Remote images fetched at once during a render pass. Default: 4.
    pub remote_fetch_concurrency: usize,

    /// Lifetime of the signed upload policy, in seconds. Default: 3600.
    pub policy_ttl_secs: u64,

    /// Upper bound of the policy's content-length-range. Default: 1 GiB.
    pub max_content_length: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            credentials_url: None,
            upload_url: None,
            public_base_url: None,
            key_prefix: "images".to_string(),
            request_timeout_secs: 30,
            remote_fetch_timeout_secs: 10,
            remote_fetch_concurrency: 4,
            policy_ttl_secs: 3600,
            max_content_length: 1024 * 1024 * 1024,
        }
    }
}

/// The three endpoints an upload round needs, all present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints<'a> {
    pub credentials_url: &'a str,
    pub upload_url: &'a str,
    pub public_base_url: &'a str,
}

impl UploadConfig {
    /// Create a new builder for `UploadConfig`.
    pub fn builder() -> UploadConfigBuilder {
        UploadConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from `STS_URL`, `OSS_UPLOAD_URL`, `OSS_BASE_URL` and
    /// `OSS_KEY_PREFIX`. Unset variables stay `None`; nothing fails here.
    pub fn from_env() -> Result<Self, DocPasteError> {
        let mut builder = Self::builder();
        if let Some(url) = env_non_empty(ENV_CREDENTIALS_URL) {
            builder = builder.credentials_url(url);
        }
        if let Some(url) = env_non_empty(ENV_UPLOAD_URL) {
            builder = builder.upload_url(url);
        }
        if let Some(url) = env_non_empty(ENV_PUBLIC_BASE_URL) {
            builder = builder.public_base_url(url);
        }
        if let Some(prefix) = env_non_empty(ENV_KEY_PREFIX) {
            builder = builder.key_prefix(prefix);
        }
        builder.build()
    }

    /// Borrow all three endpoints, or fail with the first missing one.
    pub fn endpoints(&self) -> Result<Endpoints<'_>, DocPasteError> {
        let credentials_url =
            self.credentials_url
                .as_deref()
                .ok_or(DocPasteError::MissingEndpoint {
                    name: "credentials",
                    env: ENV_CREDENTIALS_URL,
                })?;
        let upload_url = self
            .upload_url
            .as_deref()
            .ok_or(DocPasteError::MissingEndpoint {
                name: "upload",
                env: ENV_UPLOAD_URL,
            })?;
        let public_base_url =
            self.public_base_url
                .as_deref()
                .ok_or(DocPasteError::MissingEndpoint {
                    name: "public base",
                    env: ENV_PUBLIC_BASE_URL,
                })?;
        Ok(Endpoints {
            credentials_url,
            upload_url,
            public_base_url,
        })
    }

    /// Public URL of an uploaded object: `base + "/" + key`.
    pub fn object_url(base: &str, key: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), key)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builder for [`UploadConfig`].
#[derive(Debug)]
pub struct UploadConfigBuilder {
    config: UploadConfig,
}

impl UploadConfigBuilder {
    pub fn credentials_url(mut self, url: impl Into<String>) -> Self {
        self.config.credentials_url = Some(url.into());
        self
    }

    pub fn upload_url(mut self, url: impl Into<String>) -> Self {
        self.config.upload_url = Some(url.into());
        self
    }

    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.config.public_base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.config.key_prefix = prefix.trim_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn remote_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote_fetch_timeout_secs = secs;
        self
    }

    pub fn remote_fetch_concurrency(mut self, n: usize) -> Self {
        self.config.remote_fetch_concurrency = n.max(1);
        self
    }

    pub fn policy_ttl_secs(mut self, secs: u64) -> Self {
        self.config.policy_ttl_secs = secs;
        self
    }

    pub fn max_content_length(mut self, bytes: u64) -> Self {
        self.config.max_content_length = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Missing endpoints are not an error here; see [`UploadConfig::endpoints`].
    pub fn build(self) -> Result<UploadConfig, DocPasteError> {
        let c = &self.config;
        for (name, url) in [
            ("credentials_url", &c.credentials_url),
            ("upload_url", &c.upload_url),
            ("public_base_url", &c.public_base_url),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(DocPasteError::InvalidConfig(format!(
                        "{name} must be an http(s) URL, got '{url}'"
                    )));
                }
            }
        }
        if c.request_timeout_secs == 0 || c.remote_fetch_timeout_secs == 0 {
            return Err(DocPasteError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.policy_ttl_secs == 0 {
            return Err(DocPasteError::InvalidConfig(
                "Policy lifetime must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = UploadConfig::default();
        assert_eq!(c.key_prefix, "images");
        assert_eq!(c.remote_fetch_timeout_secs, 10);
        assert_eq!(c.policy_ttl_secs, 3600);
        assert_eq!(c.max_content_length, 1 << 30);
    }

    #[test]
    fn missing_endpoint_is_reported_lazily() {
        let c = UploadConfig::builder()
            .credentials_url("https://sts.example.com")
            .build()
            .expect("endpoints are optional at build time");
        match c.endpoints() {
            Err(DocPasteError::MissingEndpoint { name, .. }) => assert_eq!(name, "upload"),
            other => panic!("expected MissingEndpoint, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = UploadConfig::builder()
            .upload_url("ftp://bucket")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("upload_url"));
    }

    #[test]
    fn base_url_and_prefix_are_normalised() {
        let c = UploadConfig::builder()
            .public_base_url("https://cdn.example.com/")
            .key_prefix("/pc/course/")
            .build()
            .unwrap();
        assert_eq!(c.public_base_url.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(c.key_prefix, "pc/course");
    }

    #[test]
    fn object_url_joins_with_single_slash() {
        assert_eq!(
            UploadConfig::object_url("https://cdn.example.com/", "images/a.png"),
            "https://cdn.example.com/images/a.png"
        );
    }
}
