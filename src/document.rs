//! The document model: one content, two projections, one image table.

use serde::{Deserialize, Serialize};

/// Original `<img>` tags in placeholder order.
///
/// Index `i` holds the tag for placeholder `#(i + 1)`. A table is produced
/// whole by [`crate::pipeline::placeholder::project`] and never edited after
/// that; a new projection replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageTable {
    tags: Vec<String>,
}

impl ImageTable {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }

    /// Tag for a 1-based placeholder number.
    pub fn get(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.tags.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Sum of tag lengths, used to size restore buffers.
    pub fn total_len(&self) -> usize {
        self.tags.iter().map(String::len).sum()
    }
}

/// Result of one projection pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    /// Markup with local images inlined.
    pub canonical_markup: String,
    /// Canonical markup with every `<img>` replaced by a placeholder line.
    pub masked_text: String,
    pub image_table: ImageTable,
}

/// The live document behind both editor surfaces.
///
/// Fields are private so the table can only change together with the
/// markup it was derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    canonical: String,
    masked: String,
    images: ImageTable,
}

impl Document {
    pub fn canonical_markup(&self) -> &str {
        &self.canonical
    }

    pub fn masked_text(&self) -> &str {
        &self.masked
    }

    pub fn image_table(&self) -> &ImageTable {
        &self.images
    }

    /// Replace everything with a fresh projection.
    pub(crate) fn apply_projection(&mut self, projection: Projection) {
        self.canonical = projection.canonical_markup;
        self.masked = projection.masked_text;
        self.images = projection.image_table;
    }

    /// Record a plain-surface edit: the user's text becomes the masked
    /// projection and its restored form the canonical markup. The table
    /// stays, since the user's placeholders still point into it.
    pub(crate) fn apply_plain_edit(&mut self, masked: String, restored: String) {
        self.masked = masked;
        self.canonical = restored;
    }
}

impl From<Projection> for Document {
    fn from(projection: Projection) -> Self {
        let mut doc = Document::default();
        doc.apply_projection(projection);
        doc
    }
}
