//! Input document and OCR collaborator seams.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{PageContent, TextFragment};

/// A rasterized page handed to an [`OcrEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageImage {
    /// 0-based page index
    pub page_index: usize,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoded image bytes, in whatever format the engine expects
    pub data: Vec<u8>,
}

/// A decodable input document.
///
/// Implement this trait on top of a PDF decoding layer. Implementations are
/// shared across worker threads, so page access must not need `&mut self`.
pub trait DocumentSource: Send + Sync {
    /// Caller-facing label (usually the file name).
    fn label(&self) -> &str;

    /// Number of pages. Fails with [`Error::Decode`] or [`Error::Encrypted`]
    /// when the document cannot be opened at all.
    fn page_count(&self) -> Result<usize>;

    /// Decode one page into its content primitives.
    fn decode_page(&self, page_index: usize) -> Result<PageContent>;

    /// Rasterize one page for OCR.
    fn render_page(&self, page_index: usize) -> Result<PageImage> {
        Err(Error::Ocr(format!(
            "'{}' cannot render page {}",
            self.label(),
            page_index + 1
        )))
    }
}

/// Text recognition for image-only pages.
pub trait OcrEngine: Send + Sync {
    /// Recognize positioned text on a page image.
    fn recognize(&self, image: &PageImage) -> Result<Vec<TextFragment>>;
}

/// A document whose pages are already decoded, e.g. loaded from a JSON dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    /// Document label
    #[serde(default)]
    pub label: String,

    /// Decoded pages, in page order
    #[serde(default)]
    pub pages: Vec<PageContent>,
}

impl MemoryDocument {
    /// Create a document from pages.
    pub fn new(label: impl Into<String>, pages: Vec<PageContent>) -> Self {
        Self {
            label: label.into(),
            pages,
        }
    }

    /// Read a JSON page dump.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parse a JSON page dump.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl DocumentSource for MemoryDocument {
    fn label(&self) -> &str {
        &self.label
    }

    fn page_count(&self) -> Result<usize> {
        Ok(self.pages.len())
    }

    fn decode_page(&self, page_index: usize) -> Result<PageContent> {
        let mut page = self
            .pages
            .get(page_index)
            .cloned()
            .ok_or(Error::PageOutOfRange(page_index, self.pages.len()))?;
        page.page_index = page_index;
        Ok(page)
    }
}
