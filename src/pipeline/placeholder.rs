//! Placeholder codec: markup ⇄ text with `[Image omitted #N]` tokens.
//!
//! A pasted Word image is often megabytes of base64. Nobody can edit markup
//! with that inline, so the plain projection swaps every `<img>` tag for a
//! short numbered token on its own line and keeps the tags in an ordered
//! [`ImageTable`]. Token `N` always means `table[N − 1]`.
//!
//! The codec never patches a table: [`project`] builds a fresh one every
//! time, and [`restore`] only reads.

use super::locate::image_tag_spans;
use super::materialize::inline_local_images;
use crate::document::{ImageTable, Projection};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::debug;

/// Text of a placeholder token without its surrounding newlines.
pub fn placeholder_token(number: usize) -> String {
    format!("[Image omitted #{number}]")
}

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[Image omitted #(\d+)\]").unwrap());

// The codec writes one newline either side of each token; restore consumes
// them again so that an untouched projection restores byte-identically.
static RE_PLACEHOLDER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n?\[Image omitted #(\d+)\]\n?").unwrap());

/// Project markup into its canonical and masked forms.
///
/// 1. Inline every readable local image.
/// 2. Scan the result left to right; each `<img>` tag goes into the table and
///    is replaced in the text copy by `\n[Image omitted #k]\n`.
pub fn project(markup: &str) -> Projection {
    let canonical = inline_local_images(markup);
    let spans = image_tag_spans(&canonical);

    let mut masked = String::with_capacity(canonical.len().min(markup.len() + 64));
    let mut tags = Vec::with_capacity(spans.len());
    let mut last = 0;
    for (i, span) in spans.iter().enumerate() {
        masked.push_str(&canonical[last..span.start]);
        masked.push('\n');
        masked.push_str(&placeholder_token(i + 1));
        masked.push('\n');
        tags.push(canonical[span.clone()].to_string());
        last = span.end;
    }
    masked.push_str(&canonical[last..]);

    debug!(
        "Projected markup: {} bytes canonical, {} bytes masked, {} images",
        canonical.len(),
        masked.len(),
        tags.len()
    );

    Projection {
        canonical_markup: canonical,
        masked_text: masked,
        image_table: ImageTable::new(tags),
    }
}

/// Rebuild markup from masked text by dereferencing each placeholder.
///
/// A placeholder whose number is outside the table (including `#0` and
/// numbers too large to parse) is dropped: neither the token nor a tag
/// appears in the output. Anything that is not a complete
/// `[Image omitted #<digits>]` token passes through unchanged.
pub fn restore(masked_text: &str, table: &ImageTable) -> String {
    let mut out = String::with_capacity(masked_text.len() + table.total_len());
    let mut last = 0;
    for caps in RE_PLACEHOLDER_LINE.captures_iter(masked_text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&masked_text[last..whole.start()]);
        let tag = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|n| table.get(n));
        match tag {
            Some(tag) => out.push_str(tag),
            None => debug!("Dropping stale placeholder #{}", &caps[1]),
        }
        last = whole.end();
    }
    out.push_str(&masked_text[last..]);
    out
}

/// Byte ranges of every placeholder token in `text`, for highlighting.
pub fn placeholder_spans(text: &str) -> Vec<Range<usize>> {
    RE_PLACEHOLDER.find_iter(text).map(|m| m.range()).collect()
}

/// Placeholder numbers in order of appearance.
pub fn placeholder_numbers(text: &str) -> Vec<usize> {
    RE_PLACEHOLDER
        .captures_iter(text)
        .filter_map(|c| c[1].parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = r#"<img src="data:image/png;base64,AAAA">"#;
    const B: &str = r#"<IMG alt='b' src='data:image/gif;base64,R0lG'>"#;

    #[test]
    fn numbers_images_left_to_right() {
        let html = format!("<p>x{A}y</p><p>{B}</p><p>{A}</p>");
        let p = project(&html);
        assert_eq!(
            p.masked_text,
            "<p>x\n[Image omitted #1]\ny</p><p>\n[Image omitted #2]\n</p><p>\n[Image omitted #3]\n</p>"
        );
        assert_eq!(p.image_table.len(), 3);
        assert_eq!(p.image_table.get(1), Some(A));
        assert_eq!(p.image_table.get(2), Some(B));
        assert_eq!(p.image_table.get(3), Some(A));
        assert_eq!(placeholder_numbers(&p.masked_text), vec![1, 2, 3]);
    }

    #[test]
    fn restore_is_byte_identical_for_inline_images() {
        let html = format!("<p>\n{A}\n</p>{B}{A}<br>tail");
        let p = project(&html);
        assert_eq!(p.canonical_markup, html);
        assert_eq!(restore(&p.masked_text, &p.image_table), p.canonical_markup);
    }

    #[test]
    fn masking_masked_text_is_idempotent() {
        let p = project(&format!("<p>{A}</p>"));
        let again = project(&p.masked_text);
        assert_eq!(again.masked_text, p.masked_text);
        assert_eq!(again.canonical_markup, p.masked_text);
        assert!(again.image_table.is_empty());
    }

    #[test]
    fn stale_placeholder_restores_to_nothing() {
        // Known sharp edge: out-of-range numbers vanish without an error.
        let table = ImageTable::new(vec![A.into(), B.into(), A.into()]);
        let out = restore("before\n[Image omitted #5]\nafter", &table);
        assert_eq!(out, "beforeafter");
        assert_eq!(restore("[Image omitted #0]", &table), "");
        assert_eq!(restore("[Image omitted #99999999999999999999999]", &table), "");
    }

    #[test]
    fn malformed_tokens_pass_through() {
        let table = ImageTable::new(vec![A.into()]);
        for text in [
            "[Image omitted #]",
            "[Image omitted #1a]",
            "[image omitted #1]",
            "[Image omitted 1]",
            "Image omitted #1]",
            "[Image omitted #-1]",
        ] {
            assert_eq!(restore(text, &table), text, "for {text:?}");
        }
    }

    #[test]
    fn user_edits_around_placeholders_survive() {
        let p = project(&format!("<p>a</p>{A}<p>b</p>{B}"));
        let edited = p.masked_text.replace("<p>a</p>", "<h1>Title</h1>");
        let out = restore(&edited, &p.image_table);
        assert_eq!(out, format!("<h1>Title</h1>{A}<p>b</p>{B}"));
    }

    #[test]
    fn reordered_placeholders_follow_their_numbers() {
        let table = ImageTable::new(vec![A.into(), B.into()]);
        let out = restore("[Image omitted #2] and [Image omitted #1]", &table);
        assert_eq!(out, format!("{B} and {A}"));
    }

    #[test]
    fn highlight_spans_cover_tokens_only() {
        let text = "x\n[Image omitted #1]\ny [Image omitted #12]";
        let spans = placeholder_spans(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].clone()], "[Image omitted #1]");
        assert_eq!(&text[spans[1].clone()], "[Image omitted #12]");
    }
}
