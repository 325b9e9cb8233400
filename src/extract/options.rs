//! Extraction options and configuration.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options consumed by the extraction engine.
///
/// Field names match the keys of the on-disk configuration the caller
/// loads; every key is optional and falls back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Which strategy turns pages into records
    pub extraction_method: ExtractionMethod,

    /// Whether `auto` may pick table detection
    pub table_detection: bool,

    /// Ordered named text patterns
    pub text_patterns: Vec<TextPattern>,

    /// Match patterns against clustered rows (true) or single fragments (false)
    pub row_structure: bool,

    /// Trim cells and normalize Unicode
    pub clean_data: bool,

    /// Collapse internal whitespace runs to one space
    pub collapse_whitespace: bool,

    /// Fold multi-line and column-spanning cells into one value
    pub merge_cells: bool,

    /// Separator used when folding cells
    pub cell_join: String,

    /// Drop rows whose cells are all empty
    pub skip_empty_rows: bool,

    /// First row of each table names the columns
    pub header_row: bool,

    /// Output delimiter, for the caller's serializer
    pub delimiter: String,

    /// Output encoding label, for the caller's serializer
    pub encoding: String,

    /// Pages to process (all when absent)
    pub page_range: Option<PageRange>,

    /// Run OCR on pages without native text
    pub ocr_enabled: bool,

    /// Let multi-line continuation cross page boundaries
    pub continuation_across_pages: bool,

    /// Geometric tolerances for table detection
    pub detector: DetectorConfig,

    /// Worker pool size (available parallelism when absent)
    pub max_workers: Option<usize>,

    /// Per-document time budget in milliseconds (unbounded when absent)
    pub timeout_ms: Option<u64>,
}

impl ExtractOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the extraction method.
    pub fn with_method(mut self, method: ExtractionMethod) -> Self {
        self.extraction_method = method;
        self
    }

    /// Enable or disable table detection for `auto`.
    pub fn with_table_detection(mut self, enabled: bool) -> Self {
        self.table_detection = enabled;
        self
    }

    /// Append a named text pattern.
    pub fn with_pattern(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.text_patterns.push(TextPattern::new(name, pattern));
        self
    }

    /// Match patterns against rows or single fragments.
    pub fn with_row_structure(mut self, rows: bool) -> Self {
        self.row_structure = rows;
        self
    }

    /// Enable or disable cleaning.
    pub fn with_clean_data(mut self, clean: bool) -> Self {
        self.clean_data = clean;
        self
    }

    /// Enable or disable whitespace collapsing.
    pub fn with_collapse_whitespace(mut self, collapse: bool) -> Self {
        self.collapse_whitespace = collapse;
        self
    }

    /// Enable or disable cell merging.
    pub fn with_merge_cells(mut self, merge: bool) -> Self {
        self.merge_cells = merge;
        self
    }

    /// Set the separator used when folding cells.
    pub fn with_cell_join(mut self, join: impl Into<String>) -> Self {
        self.cell_join = join.into();
        self
    }

    /// Enable or disable empty-row dropping.
    pub fn with_skip_empty_rows(mut self, skip: bool) -> Self {
        self.skip_empty_rows = skip;
        self
    }

    /// Enable or disable header rows.
    pub fn with_header_row(mut self, header: bool) -> Self {
        self.header_row = header;
        self
    }

    /// Set the output delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Set the output encoding label.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set page range.
    pub fn with_pages(mut self, pages: PageRange) -> Self {
        self.page_range = Some(pages);
        self
    }

    /// Enable or disable OCR for image-only pages.
    pub fn with_ocr(mut self, enabled: bool) -> Self {
        self.ocr_enabled = enabled;
        self
    }

    /// Let continuation rows cross page boundaries.
    pub fn with_continuation_across_pages(mut self, enabled: bool) -> Self {
        self.continuation_across_pages = enabled;
        self
    }

    /// Set detector tolerances.
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Set the worker pool size.
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Set the per-document time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Per-document time budget.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Check if a 0-based page index is selected.
    pub fn includes_page(&self, page_index: usize) -> bool {
        self.page_range
            .as_ref()
            .map_or(true, |range| range.includes_index(page_index))
    }

    /// Reject out-of-range option values.
    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(Error::InvalidOption("delimiter must not be empty".into()));
        }
        if self.max_workers == Some(0) {
            return Err(Error::InvalidOption("max_workers must be at least 1".into()));
        }
        self.detector.validate()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            extraction_method: ExtractionMethod::Auto,
            table_detection: true,
            text_patterns: Vec::new(),
            row_structure: true,
            clean_data: true,
            collapse_whitespace: false,
            merge_cells: true,
            cell_join: " ".to_string(),
            skip_empty_rows: true,
            header_row: true,
            delimiter: ",".to_string(),
            encoding: "utf-8".to_string(),
            page_range: None,
            ocr_enabled: false,
            continuation_across_pages: false,
            detector: DetectorConfig::default(),
            max_workers: None,
            timeout_ms: None,
        }
    }
}

/// Extraction strategy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Pick a strategy per document
    #[default]
    Auto,
    /// Geometric table detection
    Table,
    /// Named text patterns
    Pattern,
    /// Form field values
    Form,
}

/// Geometric tolerances used by table detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Fixed row tolerance in points (derived from fragment heights when absent)
    pub row_tolerance: Option<f32>,

    /// Row tolerance as a fraction of the median fragment height
    pub tolerance_factor: f32,

    /// A vertical gap above `table_gap_factor * row_tolerance` splits tables
    pub table_gap_factor: f32,

    /// Smallest horizontal gap treated as a column separator candidate
    pub min_column_gap: f32,

    /// Share of multi-fragment rows that must agree on a separator
    pub min_gap_ratio: f32,
}

impl DetectorConfig {
    /// Reject non-positive tolerances and ratios outside (0, 1].
    pub fn validate(&self) -> Result<()> {
        if let Some(tol) = self.row_tolerance {
            if !(tol > 0.0) {
                return Err(Error::InvalidOption("row_tolerance must be positive".into()));
            }
        }
        if !(self.tolerance_factor > 0.0) {
            return Err(Error::InvalidOption(
                "tolerance_factor must be positive".into(),
            ));
        }
        if !(self.table_gap_factor > 0.0) {
            return Err(Error::InvalidOption(
                "table_gap_factor must be positive".into(),
            ));
        }
        if self.min_column_gap < 0.0 {
            return Err(Error::InvalidOption(
                "min_column_gap must not be negative".into(),
            ));
        }
        if !(self.min_gap_ratio > 0.0 && self.min_gap_ratio <= 1.0) {
            return Err(Error::InvalidOption(
                "min_gap_ratio must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            row_tolerance: None,
            tolerance_factor: 0.5,
            table_gap_factor: 3.0,
            min_column_gap: 8.0,
            min_gap_ratio: 0.5,
        }
    }
}

/// A named regular expression.
///
/// Deserializes from either `{"name": …, "pattern": …}` or a bare pattern
/// string, which is then its own name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPattern")]
pub struct TextPattern {
    /// Field name the match is stored under
    pub name: String,
    /// Regular expression; the first capture group is the value when present
    pub pattern: String,
}

impl TextPattern {
    /// Create a named pattern.
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPattern {
    Named { name: String, pattern: String },
    Bare(String),
}

impl From<RawPattern> for TextPattern {
    fn from(raw: RawPattern) -> Self {
        match raw {
            RawPattern::Named { name, pattern } => TextPattern { name, pattern },
            RawPattern::Bare(pattern) => TextPattern {
                name: pattern.clone(),
                pattern,
            },
        }
    }
}

/// Page selection (1-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PageRange {
    /// All pages
    #[default]
    All,
    /// A contiguous range of pages
    Range(RangeInclusive<u32>),
    /// Sorted, non-overlapping page ranges
    Pages(Vec<RangeInclusive<u32>>),
}

impl PageRange {
    /// Check if a 1-based page number is selected.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageRange::All => true,
            PageRange::Range(range) => range.contains(&page),
            PageRange::Pages(ranges) => ranges.iter().any(|r| r.contains(&page)),
        }
    }

    /// Check if a 0-based page index is selected.
    pub fn includes_index(&self, page_index: usize) -> bool {
        u32::try_from(page_index + 1).map_or(false, |page| self.includes(page))
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageRange::All);
        }

        let invalid = |what: &str| Error::InvalidPageRange(format!("{} in '{}'", what, s));

        // Simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| invalid("invalid start page"))?;
                let end: u32 = end.trim().parse().map_err(|_| invalid("invalid end page"))?;
                if start == 0 || end < start {
                    return Err(invalid("empty range"));
                }
                return Ok(PageRange::Range(start..=end));
            }
        }

        let mut ranges = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start.trim().parse().map_err(|_| invalid("invalid page number"))?;
                let end: u32 = end.trim().parse().map_err(|_| invalid("invalid page number"))?;
                if start == 0 || end < start {
                    return Err(invalid("empty range"));
                }
                ranges.push(start..=end);
            } else {
                let p: u32 = part.parse().map_err(|_| invalid("invalid page number"))?;
                if p == 0 {
                    return Err(invalid("pages are 1-based"));
                }
                ranges.push(p..=p);
            }
        }

        Ok(PageRange::Pages(merge_ranges(ranges)))
    }
}

/// Sort ranges and merge the ones that overlap or touch.
fn merge_ranges(mut ranges: Vec<RangeInclusive<u32>>) -> Vec<RangeInclusive<u32>> {
    ranges.sort_unstable_by_key(|r| (*r.start(), *r.end()));
    let mut merged: Vec<RangeInclusive<u32>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if *range.start() <= last.end().saturating_add(1) => {
                if range.end() > last.end() {
                    *last = *last.start()..=*range.end();
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRange::All => f.write_str("all"),
            PageRange::Range(range) => write!(f, "{}-{}", range.start(), range.end()),
            PageRange::Pages(ranges) => {
                let parts: Vec<String> = ranges
                    .iter()
                    .map(|r| {
                        if r.start() == r.end() {
                            r.start().to_string()
                        } else {
                            format!("{}-{}", r.start(), r.end())
                        }
                    })
                    .collect();
                f.write_str(&parts.join(","))
            }
        }
    }
}

impl TryFrom<String> for PageRange {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        PageRange::parse(&s)
    }
}

impl From<PageRange> for String {
    fn from(range: PageRange) -> Self {
        range.to_string()
    }
}
