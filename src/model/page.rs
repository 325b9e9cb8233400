//! Page content primitives.
//!
//! Coordinates are page-relative with the origin at the top-left corner:
//! `y0` is the top edge and `y1` the bottom edge of a box, so `y` grows
//! downward the way text is read.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Horizontal centre.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical centre.
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One positioned run of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// The text content
    pub text: String,
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
    /// 0-based index of the page this fragment belongs to
    #[serde(default)]
    pub page_index: usize,
}

impl TextFragment {
    /// Create a new fragment.
    pub fn new(text: impl Into<String>, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            text: text.into(),
            x0,
            y0,
            x1,
            y1,
            page_index: 0,
        }
    }

    /// Set the page index and return self.
    pub fn on_page(mut self, page_index: usize) -> Self {
        self.page_index = page_index;
        self
    }

    /// Bounding box of the fragment.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x0, self.y0, self.x1, self.y1)
    }

    /// Height of the fragment.
    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Horizontal centre.
    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical centre.
    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }
}

/// Orientation of a ruling line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Left-to-right line
    Horizontal,
    /// Top-to-bottom line
    Vertical,
}

/// A drawn line used as a structural boundary hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulingLine {
    /// Start X
    pub x0: f32,
    /// Start Y
    pub y0: f32,
    /// End X
    pub x1: f32,
    /// End Y
    pub y1: f32,
    /// Line orientation
    pub orientation: Orientation,
}

impl RulingLine {
    /// Create a vertical line at `x` spanning `y0..y1`.
    pub fn vertical(x: f32, y0: f32, y1: f32) -> Self {
        Self {
            x0: x,
            y0,
            x1: x,
            y1,
            orientation: Orientation::Vertical,
        }
    }

    /// Create a horizontal line at `y` spanning `x0..x1`.
    pub fn horizontal(y: f32, x0: f32, x1: f32) -> Self {
        Self {
            x0,
            y0: y,
            x1,
            y1: y,
            orientation: Orientation::Horizontal,
        }
    }

    /// Check if this is a vertical line.
    pub fn is_vertical(&self) -> bool {
        self.orientation == Orientation::Vertical
    }

    /// Check if this is a horizontal line.
    pub fn is_horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    /// X position of a vertical line.
    pub fn x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Y position of a horizontal line.
    pub fn y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Vertical extent as (top, bottom).
    pub fn y_span(&self) -> (f32, f32) {
        (self.y0.min(self.y1), self.y0.max(self.y1))
    }
}

/// A filled-in form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Fully qualified field name
    pub name: String,
    /// Field value as text
    pub value: String,
    /// 0-based page index
    #[serde(default)]
    pub page_index: usize,
}

impl FormField {
    /// Create a new form field.
    pub fn new(name: impl Into<String>, value: impl Into<String>, page_index: usize) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            page_index,
        }
    }
}

/// Normalized view of one page's content, as produced by a decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// 0-based page index within the document
    #[serde(default)]
    pub page_index: usize,

    /// Text fragments in decoder order
    #[serde(default)]
    pub fragments: Vec<TextFragment>,

    /// Ruling lines
    #[serde(default)]
    pub lines: Vec<RulingLine>,

    /// Form field values
    #[serde(default)]
    pub form_fields: Vec<FormField>,
}

impl PageContent {
    /// Create an empty page.
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            ..Self::default()
        }
    }

    /// Add a text fragment, stamping it with this page's index.
    pub fn add_fragment(&mut self, fragment: TextFragment) {
        self.fragments.push(fragment.on_page(self.page_index));
    }

    /// Add a text fragment and return self.
    pub fn with_fragment(mut self, fragment: TextFragment) -> Self {
        self.add_fragment(fragment);
        self
    }

    /// Add a ruling line and return self.
    pub fn with_line(mut self, line: RulingLine) -> Self {
        self.lines.push(line);
        self
    }

    /// Add a form field and return self.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields
            .push(FormField::new(name, value, self.page_index));
        self
    }

    /// Replace the fragments (e.g. with OCR output), restamping page indices.
    pub fn replace_fragments(&mut self, fragments: Vec<TextFragment>) {
        let page_index = self.page_index;
        self.fragments = fragments
            .into_iter()
            .map(|f| f.on_page(page_index))
            .collect();
    }

    /// Check if the page carries no fragments, lines, or fields.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.lines.is_empty() && self.form_fields.is_empty()
    }

    /// Check if the page has any native text.
    pub fn has_text(&self) -> bool {
        self.fragments.iter().any(|f| !f.text.trim().is_empty())
    }

    /// Vertical ruling lines on this page.
    pub fn vertical_lines(&self) -> impl Iterator<Item = &RulingLine> {
        self.lines.iter().filter(|l| l.is_vertical())
    }

    /// Horizontal ruling lines on this page.
    pub fn horizontal_lines(&self) -> impl Iterator<Item = &RulingLine> {
        self.lines.iter().filter(|l| l.is_horizontal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_geometry() {
        let f = TextFragment::new("Name", 10.0, 100.0, 40.0, 110.0);
        assert_eq!(f.height(), 10.0);
        assert_eq!(f.center_x(), 25.0);
        assert_eq!(f.center_y(), 105.0);
    }

    #[test]
    fn test_page_stamps_fragments() {
        let page = PageContent::new(3).with_fragment(TextFragment::new("A", 0.0, 0.0, 5.0, 5.0));
        assert_eq!(page.fragments[0].page_index, 3);
        assert!(page.has_text());
        assert!(!page.is_empty());
    }

    #[test]
    fn test_empty_page() {
        let page = PageContent::new(0);
        assert!(page.is_empty());
        assert!(!page.has_text());
    }

    #[test]
    fn test_line_helpers() {
        let v = RulingLine::vertical(50.0, 120.0, 10.0);
        assert!(v.is_vertical());
        assert_eq!(v.x(), 50.0);
        assert_eq!(v.y_span(), (10.0, 120.0));

        let h = RulingLine::horizontal(30.0, 0.0, 100.0);
        assert!(h.is_horizontal());
        assert_eq!(h.y(), 30.0);
    }

    #[test]
    fn test_page_deserialize_defaults() {
        let page: PageContent = serde_json::from_str(
            r#"{"page_index": 1, "fragments": [{"text": "x", "x0": 0, "y0": 0, "x1": 1, "y1": 1}]}"#,
        )
        .unwrap();
        assert_eq!(page.page_index, 1);
        assert!(page.lines.is_empty());
        assert!(page.form_fields.is_empty());
    }
}
