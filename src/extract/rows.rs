//! Row clustering over positioned text fragments.
//!
//! Pure functions shared by table detection and pattern matching.

use crate::model::TextFragment;

use super::options::DetectorConfig;

/// Row height assumed when a page carries no measurable fragments.
const FALLBACK_LINE_HEIGHT: f32 = 10.0;

/// A physical text row: fragments whose vertical centres fall within the
/// row tolerance of the row's first fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentRow {
    /// Fragments sorted left to right
    pub fragments: Vec<TextFragment>,
    /// Smallest `y0` of the row
    pub top: f32,
    /// Largest `y1` of the row
    pub bottom: f32,
}

impl FragmentRow {
    fn from_fragments(mut fragments: Vec<TextFragment>) -> Self {
        fragments.sort_by(|a, b| a.x0.total_cmp(&b.x0));
        let top = fragments.iter().map(|f| f.y0).fold(f32::INFINITY, f32::min);
        let bottom = fragments
            .iter()
            .map(|f| f.y1)
            .fold(f32::NEG_INFINITY, f32::max);
        Self {
            fragments,
            top,
            bottom,
        }
    }

    /// Vertical centre of the row.
    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// Row text: fragment texts joined by a space, left to right.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check if the row has no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Median height of the fragments, ignoring degenerate boxes.
pub fn median_height(fragments: &[TextFragment]) -> Option<f32> {
    let mut heights: Vec<f32> = fragments
        .iter()
        .map(TextFragment::height)
        .filter(|h| *h > 0.0)
        .collect();
    if heights.is_empty() {
        return None;
    }
    heights.sort_by(f32::total_cmp);
    let mid = heights.len() / 2;
    Some(if heights.len() % 2 == 0 {
        (heights[mid - 1] + heights[mid]) / 2.0
    } else {
        heights[mid]
    })
}

/// Row tolerance for a page: the configured value, or a fraction of the
/// median fragment height.
pub fn row_tolerance(fragments: &[TextFragment], config: &DetectorConfig) -> f32 {
    if let Some(tolerance) = config.row_tolerance {
        return tolerance;
    }
    median_height(fragments).unwrap_or(FALLBACK_LINE_HEIGHT) * config.tolerance_factor
}

/// Group fragments into rows, top to bottom.
///
/// Fragments are sorted by vertical centre, then left edge. A fragment joins
/// the current row when its centre is within `tolerance` of the row's first
/// fragment; otherwise it opens a new row. Blank fragments are ignored.
pub fn cluster_rows(fragments: &[TextFragment], tolerance: f32) -> Vec<FragmentRow> {
    let mut sorted: Vec<TextFragment> = fragments
        .iter()
        .filter(|f| !f.text.trim().is_empty())
        .cloned()
        .collect();
    if sorted.is_empty() {
        return vec![];
    }

    sorted.sort_by(|a, b| {
        a.center_y()
            .total_cmp(&b.center_y())
            .then_with(|| a.x0.total_cmp(&b.x0))
    });

    let mut rows: Vec<FragmentRow> = Vec::new();
    let mut current: Vec<TextFragment> = Vec::new();
    let mut anchor: Option<f32> = None;

    for fragment in sorted {
        let center = fragment.center_y();
        match anchor {
            Some(y) if (center - y).abs() <= tolerance => current.push(fragment),
            _ => {
                if !current.is_empty() {
                    rows.push(FragmentRow::from_fragments(std::mem::take(&mut current)));
                }
                anchor = Some(center);
                current.push(fragment);
            }
        }
    }

    if !current.is_empty() {
        rows.push(FragmentRow::from_fragments(current));
    }

    rows
}
