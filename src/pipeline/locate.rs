//! Image location: find `<img>` tags in markup and classify their sources.
//!
//! Markup pasted from Word is not well-formed enough for a real HTML parser
//! to be worth it, and every later stage needs exact byte spans so it can
//! splice replacements back without touching surrounding text. Two regexes
//! are enough: one for the tag, one for the `src` attribute inside it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};

static RE_IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

// `src` must follow whitespace so `data-src=` is not mistaken for it.
static RE_SRC_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)[\s/]src\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static RE_DRIVE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]:[\\/]").unwrap());

/// How an image's bytes can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Bytes are embedded in the markup as a `data:` URI.
    Inline,
    /// Source resolves to an existing file on this machine.
    Local(PathBuf),
    /// `http://` or `https://` URL.
    Remote,
    /// Anything else, including a missing `src`; passed through untouched.
    Unresolved,
}

/// The quoted value of an image's `src` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocator {
    /// Attribute value exactly as written (no decoding).
    pub value: String,
    /// Byte range of `value` within the enclosing tag text.
    pub span_in_tag: Range<usize>,
}

/// One `<img>` tag found in a markup string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOccurrence {
    /// Byte range of the whole tag within the scanned markup.
    pub span: Range<usize>,
    /// The raw tag text, `<img` through `>`.
    pub tag: String,
    pub locator: Option<ImageLocator>,
    pub kind: SourceKind,
}

impl ImageOccurrence {
    /// The `src` value, if the tag has a quoted one.
    pub fn src(&self) -> Option<&str> {
        self.locator.as_ref().map(|l| l.value.as_str())
    }

    /// Tag text with the `src` value replaced by `new_src`.
    ///
    /// Returns the tag unchanged when it has no `src`.
    pub fn with_src(&self, new_src: &str) -> String {
        match &self.locator {
            Some(loc) => {
                let mut out = String::with_capacity(self.tag.len() + new_src.len());
                out.push_str(&self.tag[..loc.span_in_tag.start]);
                out.push_str(new_src);
                out.push_str(&self.tag[loc.span_in_tag.end..]);
                out
            }
            None => self.tag.clone(),
        }
    }
}

/// Find every `<img>` tag in `markup`, left to right, and classify it.
///
/// Tag names are matched case-insensitively; `src` may use either quote
/// style. Classification touches the file system to decide `Local`.
pub fn locate_images(markup: &str) -> Vec<ImageOccurrence> {
    RE_IMG_TAG
        .find_iter(markup)
        .map(|m| {
            let tag = m.as_str();
            let locator = extract_locator(tag);
            let kind = locator
                .as_ref()
                .map(|l| classify(&l.value))
                .unwrap_or(SourceKind::Unresolved);
            ImageOccurrence {
                span: m.range(),
                tag: tag.to_string(),
                locator,
                kind,
            }
        })
        .collect()
}

/// Byte spans of every `<img>` tag, without classifying sources.
pub fn image_tag_spans(markup: &str) -> Vec<Range<usize>> {
    RE_IMG_TAG.find_iter(markup).map(|m| m.range()).collect()
}

fn extract_locator(tag: &str) -> Option<ImageLocator> {
    let caps = RE_SRC_ATTR.captures(tag)?;
    let value = caps.get(1).or_else(|| caps.get(2))?;
    Some(ImageLocator {
        value: value.as_str().to_string(),
        span_in_tag: value.range(),
    })
}

/// Classify a `src` value.
pub fn classify(locator: &str) -> SourceKind {
    let trimmed = locator.trim();
    if starts_with_ignore_case(trimmed, "data:") {
        return SourceKind::Inline;
    }
    if let Some(path) = local_path(trimmed) {
        if path.is_file() {
            return SourceKind::Local(path);
        }
    }
    if is_remote(trimmed) {
        return SourceKind::Remote;
    }
    SourceKind::Unresolved
}

/// Check if the locator is an `http(s)` URL.
pub fn is_remote(locator: &str) -> bool {
    starts_with_ignore_case(locator, "http://") || starts_with_ignore_case(locator, "https://")
}

/// Turn a `src` value into a candidate file-system path.
///
/// Handles the shapes Word actually emits:
/// - `file:///C:/Users/x.png` → `C:/Users/x.png`
/// - `file://C:/Users/x.png` (drive in the host part) → `C:/Users/x.png`
/// - `file:////Users/x.png` (macOS) → `/Users/x.png`
/// - `C:\Users\x%20y.png` → `C:/Users/x y.png`
/// - `relative/x.png` → `relative/x.png`
///
/// Remote URLs yield `None`.
pub fn local_path(locator: &str) -> Option<PathBuf> {
    if is_remote(locator) {
        return None;
    }
    if starts_with_ignore_case(locator, "file:") {
        let rest = &locator["file:".len()..];
        let decoded = percent_decode(rest);
        let stripped = decoded.trim_start_matches('/');
        if stripped.is_empty() {
            return None;
        }
        if RE_DRIVE_PATH.is_match(stripped) {
            return Some(PathBuf::from(stripped.replace('\\', "/")));
        }
        if rest.starts_with("//") && !rest.starts_with("///") {
            // `file://host/path`: only meaningful here when host is a drive letter.
            let (host, path) = stripped.split_once('/').unwrap_or((stripped, ""));
            if host.len() == 2 && host.ends_with(':') {
                return Some(PathBuf::from(format!("{host}/{path}")));
            }
            return Some(PathBuf::from(format!("/{path}")));
        }
        return Some(PathBuf::from(format!("/{stripped}")));
    }
    let decoded = percent_decode(locator);
    if RE_DRIVE_PATH.is_match(&decoded) {
        return Some(PathBuf::from(decoded.replace('\\', "/")));
    }
    if decoded.is_empty() {
        return None;
    }
    Some(Path::new(&decoded).to_path_buf())
}

fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
