//! # docpaste
//!
//! Edit pasted rich content as plain text, then publish its images.
//!
//! ## Why this crate?
//!
//! Content pasted from a word processor carries its pictures inline as
//! megabytes of base64, or as `file://` paths that only exist on the author's
//! machine. Neither survives being edited as text or published to the web.
//! This crate keeps two views of one document in lock-step: the rich markup,
//! and a plain-text projection where each `<img>` is a short
//! `[Image omitted #N]` token. Once the text is right, every inline image is
//! uploaded to object storage and its data URI swapped for a public URL.
//!
//! ## Pipeline Overview
//!
//! ```text
//! paste / edit
//!  │
//!  ├─ 1. Locate       find <img> tags, classify src: inline / local / remote
//!  ├─ 2. Materialize  inline readable local files as data: URIs
//!  ├─ 3. Project      tags → [Image omitted #N] + ordered image table
//!  ├─ 4. Sync         keep rich and plain surfaces consistent (re-entrancy safe)
//!  ├─ 5. Render       fetch remote images for display only
//!  └─ 6. Publish      STS credentials → signed policy → POST → rewrite URLs
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docpaste::{project, restore, CancelFlag, ImagePublisher, UploadConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pasted = r#"<p>Hello</p><img src="data:image/png;base64,iVBORw0KGgo=">"#;
//!
//!     let projection = project(pasted);
//!     assert_eq!(projection.masked_text, "<p>Hello</p>\n[Image omitted #1]\n");
//!
//!     let edited = projection.masked_text.replace("Hello", "Hi");
//!     let markup = restore(&edited, &projection.image_table);
//!
//!     // Endpoints from STS_URL / OSS_UPLOAD_URL / OSS_BASE_URL
//!     let publisher = ImagePublisher::new(UploadConfig::from_env()?)?;
//!     let output = publisher.publish(&markup, &CancelFlag::new()).await?;
//!     let (ok, total) = output.summary();
//!     eprintln!("uploaded {ok}/{total} images");
//!     println!("{}", output.markup);
//!     Ok(())
//! }
//! ```
//!
//! Interactive hosts wrap their widgets in [`RichSurface`] and
//! [`PlainSurface`] and drive a [`SyncController`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docpaste` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! docpaste = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cancel;
pub mod config;
pub mod document;
pub mod error;
pub mod oss;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod surface;
pub mod sync;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cancel::CancelFlag;
pub use config::{UploadConfig, UploadConfigBuilder};
pub use document::{Document, ImageTable, Projection};
pub use error::{DocPasteError, ImageUploadError};
pub use output::{ImageUploadResult, PublishOutput, PublishStats};
pub use pipeline::placeholder::{placeholder_spans, project, restore};
pub use pipeline::remote::RemoteImageLoader;
pub use progress::{NoopProgressCallback, ProgressCallback, UploadProgressCallback};
pub use publish::ImagePublisher;
pub use surface::{ClipboardContent, ClipboardSink, ClipboardSource, PlainSurface, RichSurface};
pub use sync::{SyncController, SyncGuard, SyncOutcome};
