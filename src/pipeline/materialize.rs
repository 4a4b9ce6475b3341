//! Local image materialization: `src="C:/…/image001.png"` → `data:` URI.
//!
//! Word puts pasted pictures in a temp directory and references them by
//! path. Those paths mean nothing once the markup leaves this machine, so
//! every `Local` occurrence is rewritten to carry its bytes inline. A file
//! that cannot be read keeps its original tag; the failure is logged, never
//! raised.

use super::locate::{locate_images, ImageOccurrence, SourceKind};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::{debug, warn};

/// Rewrite every readable local image in `markup` to an inline data URI.
///
/// Occurrences of any other kind, and local files that fail to read, are
/// copied through byte for byte.
pub fn inline_local_images(markup: &str) -> String {
    let occurrences = locate_images(markup);
    if occurrences.is_empty() {
        return markup.to_string();
    }

    let mut out = String::with_capacity(markup.len());
    let mut last = 0;
    for occ in &occurrences {
        out.push_str(&markup[last..occ.span.start]);
        match materialize(occ) {
            Some(tag) => out.push_str(&tag),
            None => out.push_str(&occ.tag),
        }
        last = occ.span.end;
    }
    out.push_str(&markup[last..]);
    out
}

/// The inlined tag for a `Local` occurrence, or `None` to keep it as-is.
fn materialize(occ: &ImageOccurrence) -> Option<String> {
    let SourceKind::Local(path) = &occ.kind else {
        return None;
    };
    match std::fs::read(path) {
        Ok(bytes) => {
            let mime = detect_mime(path, &bytes);
            debug!(
                "Inlined local image {} ({}, {} bytes)",
                path.display(),
                mime,
                bytes.len()
            );
            Some(occ.with_src(&to_data_uri(&mime, &bytes)))
        }
        Err(e) => {
            warn!("Keeping local image {} unresolved: {}", path.display(), e);
            None
        }
    }
}

/// Encode bytes as `data:<mime>;base64,<payload>`.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Determine an image MIME type.
///
/// Order: magic bytes, then the extension's registered type when it is an
/// image type, then `image/<ext>`, then `image/png` for extension-less files.
pub fn detect_mime(path: &Path, bytes: &[u8]) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    if let Some(mime) = mime_guess::from_path(path).first() {
        if mime.type_() == mime_guess::mime::IMAGE {
            return mime.essence_str().to_string();
        }
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("image/{}", ext.to_lowercase()),
        _ => "image/png".to_string(),
    }
}
