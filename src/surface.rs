//! Interfaces to the editor widgets and the clipboard.
//!
//! The library never owns a window. A host application wraps its widgets in
//! these traits and forwards their "content changed" signals to
//! [`crate::sync::SyncController::on_rich_edited`] and
//! [`crate::sync::SyncController::on_plain_edited`].
//!
//! Methods take `&self`: widget handles are shared and mutate through the
//! toolkit, and the controller may be re-entered from inside `set_*` when the
//! widget emits its change signal synchronously.

use image::DynamicImage;
use std::ops::Range;
use std::rc::Rc;

/// The rendered, editable view of the canonical markup.
pub trait RichSurface {
    /// Replace the displayed content.
    fn set_content(&self, markup: &str);

    /// Current content as markup.
    fn content(&self) -> String;

    /// Make a decoded image available for `<img src="{url}">` references.
    fn add_image_resource(&self, url: &str, image: &DynamicImage);

    /// Put `markup` on the system clipboard as rich text using the widget's
    /// own exporter. No-op by default.
    fn copy_as_rich_text(&self, markup: &str) {
        let _ = markup;
    }
}

/// The plain-text view with image placeholders.
pub trait PlainSurface {
    /// Replace the displayed text.
    fn set_text(&self, text: &str);

    /// Current text.
    fn text(&self) -> String;

    /// Visually flag placeholder tokens at these byte ranges of the current
    /// text. Presentation only. No-op by default.
    fn highlight_placeholders(&self, spans: &[Range<usize>]) {
        let _ = spans;
    }
}

impl<T: RichSurface + ?Sized> RichSurface for Rc<T> {
    fn set_content(&self, markup: &str) {
        (**self).set_content(markup)
    }

    fn content(&self) -> String {
        (**self).content()
    }

    fn add_image_resource(&self, url: &str, image: &DynamicImage) {
        (**self).add_image_resource(url, image)
    }

    fn copy_as_rich_text(&self, markup: &str) {
        (**self).copy_as_rich_text(markup)
    }
}

impl<T: PlainSurface + ?Sized> PlainSurface for Rc<T> {
    fn set_text(&self, text: &str) {
        (**self).set_text(text)
    }

    fn text(&self) -> String {
        (**self).text()
    }

    fn highlight_placeholders(&self, spans: &[Range<usize>]) {
        (**self).highlight_placeholders(spans)
    }
}

/// What a paste action found on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardContent {
    Html(String),
    Text(String),
    Empty,
}

impl ClipboardContent {
    /// Prefer rich markup, fall back to text; `None` when there is nothing.
    pub fn into_markup(self) -> Option<String> {
        match self {
            ClipboardContent::Html(s) | ClipboardContent::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Read side of the clipboard, consulted once per paste.
pub trait ClipboardSource {
    fn read(&self) -> ClipboardContent;
}

/// Write side of the clipboard.
pub trait ClipboardSink {
    fn set_text(&self, text: &str);
}
