//! Extraction results, warnings and batch summaries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Record;
use crate::error::ErrorKind;

/// Category of a non-fatal extraction issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A page had no fragments and no lines
    EmptyPage,
    /// A single page could not be decoded and was skipped
    PageDecode,
    /// OCR failed for an image-only page
    Ocr,
    /// Neither tables nor pattern matches were found
    NoStructureFound,
    /// A template mapping referenced an absent column
    TemplateMismatch,
    /// A pattern matched nothing in the whole document
    PatternUnmatched,
}

/// A non-fatal issue attached to a document's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Warning category
    pub kind: WarningKind,
    /// Page the warning refers to, if any
    pub page_index: Option<usize>,
    /// Human-readable message
    pub message: String,
}

impl Warning {
    /// Create a document-level warning.
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            page_index: None,
            message: message.into(),
        }
    }

    /// Create a warning tied to a page.
    pub fn on_page(kind: WarningKind, page_index: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            page_index: Some(page_index),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page_index {
            Some(page) => write!(f, "page {}: {}", page + 1, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Statistics collected while extracting one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    /// Pages that went through the pipeline
    pub pages_processed: u32,

    /// Pages whose fragments came from OCR
    pub ocr_pages: u32,

    /// Tables detected
    pub tables_detected: u32,

    /// Pattern matches found
    pub pattern_matches: u32,

    /// Records emitted
    pub records: u32,
}

impl DocumentStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &DocumentStats) {
        self.pages_processed += other.pages_processed;
        self.ocr_pages += other.ocr_pages;
        self.tables_detected += other.tables_detected;
        self.pattern_matches += other.pattern_matches;
        self.records += other.records;
    }
}

/// The durable result of extracting one document.
///
/// Either populated with records and warnings, or marked with an
/// [`ErrorKind`] and holding zero records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Output column names shared by every record
    pub columns: Vec<String>,

    /// Records in document order
    pub records: Vec<Record>,

    /// Non-fatal issues, in the order they were found
    pub warnings: Vec<Warning>,

    /// Document-level failure, if any
    pub error: Option<ErrorKind>,

    /// Extraction statistics
    pub stats: DocumentStats,
}

impl ExtractionResult {
    /// Create an empty, successful result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty-but-valid result marked with a failure.
    pub fn failed(error: ErrorKind) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Check if the document failed.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Warnings of a given kind.
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// One slot of a batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Position of the document in the input
    pub index: usize,

    /// Caller-facing document label
    pub label: String,

    /// Extraction result
    pub result: ExtractionResult,

    /// Wall-clock time spent on the document
    pub elapsed_ms: u64,
}

/// Aggregated results of a batch, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// One outcome per input document
    pub documents: Vec<DocumentOutcome>,

    /// When the batch started
    pub started_at: DateTime<Utc>,

    /// When the batch completed
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    /// Number of documents in the batch.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the batch had no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of documents that produced a result.
    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|d| !d.result.is_failed()).count()
    }

    /// Number of documents marked with an error.
    pub fn failed(&self) -> usize {
        self.documents.iter().filter(|d| d.result.is_failed()).count()
    }

    /// Share of successful documents, in percent.
    pub fn success_rate(&self) -> f64 {
        if self.documents.is_empty() {
            return 0.0;
        }
        self.succeeded() as f64 / self.documents.len() as f64 * 100.0
    }

    /// Total records across all documents.
    pub fn total_records(&self) -> usize {
        self.documents.iter().map(|d| d.result.record_count()).sum()
    }

    /// Labels of failed documents with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ErrorKind)> {
        self.documents
            .iter()
            .filter_map(|d| d.result.error.as_ref().map(|e| (d.label.as_str(), e)))
    }

    /// Combined statistics of every document.
    pub fn stats(&self) -> DocumentStats {
        let mut stats = DocumentStats::new();
        for doc in &self.documents {
            stats.merge(&doc.result.stats);
        }
        stats
    }
}
