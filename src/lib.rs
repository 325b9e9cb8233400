//! # pdfrows
//!
//! Structured-data extraction from PDF page content.
//!
//! This library turns decoded page primitives (positioned text fragments,
//! ruling lines, form field values) into uniform tabular records, ready to
//! be written as delimited text.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfrows::{extract_pages, ExtractOptions, PageContent, Template, TextFragment};
//!
//! fn main() -> pdfrows::Result<()> {
//!     let page = PageContent::new(0)
//!         .with_fragment(TextFragment::new("Name", 0.0, 0.0, 30.0, 10.0))
//!         .with_fragment(TextFragment::new("Age", 100.0, 0.0, 120.0, 10.0))
//!         .with_fragment(TextFragment::new("Alice", 0.0, 15.0, 30.0, 25.0))
//!         .with_fragment(TextFragment::new("30", 100.0, 15.0, 115.0, 25.0));
//!
//!     let result = extract_pages(&[page], &ExtractOptions::default(), &Template::new())?;
//!     for record in &result.records {
//!         println!("{:?}", record);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Table detection**: row clustering, ruling-line and gap-based columns,
//!   spanning cells, multi-line continuation rows
//! - **Pattern extraction**: ordered named regular expressions over rows
//! - **Form extraction**: form field values as records
//! - **Templates**: map detected columns to caller-declared output columns
//! - **Batch processing**: parallel documents with per-document failure
//!   isolation, timeouts and cancellation

pub mod batch;
pub mod error;
pub mod extract;
pub mod model;

// Re-export commonly used types
pub use batch::{
    BatchOrchestrator, CancellationToken, DocumentSource, MemoryDocument, OcrEngine, PageImage,
};
pub use error::{Error, ErrorKind, Result};
pub use extract::{
    extract_pages, DataCleaner, DetectorConfig, ExtractOptions, ExtractionMethod, PageRange,
    PatternMatch, PatternMatcher, RecordAssembler, Strategy, TableDetector, TemplateMapper,
    TextPattern,
};
pub use model::{
    BatchSummary, BoundingBox, Cell, DocumentOutcome, DocumentStats, ExtractionResult, FormField,
    Orientation, PageContent, Record, RulingLine, Table, TableRow, Template, TextFragment,
    Warning, WarningKind,
};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// Load a JSON page dump as a document.
///
/// The label defaults to the file name when the dump does not carry one.
///
/// # Example
///
/// ```no_run
/// use pdfrows::load_document;
///
/// let doc = load_document("invoice.pages.json").unwrap();
/// println!("Pages: {}", doc.pages.len());
/// ```
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<MemoryDocument> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut doc = MemoryDocument::from_reader(reader)?;
    if doc.label.is_empty() {
        doc.label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
    }
    Ok(doc)
}

/// Extract records from pages with default options.
pub fn extract(pages: &[PageContent]) -> Result<ExtractionResult> {
    extract_pages(pages, &ExtractOptions::default(), &Template::default())
}

/// Builder API for extraction.
///
/// # Example
///
/// ```no_run
/// use pdfrows::{ExtractionMethod, Pdfrows, Template};
///
/// let result = Pdfrows::new()
///     .with_method(ExtractionMethod::Table)
///     .with_header_row(true)
///     .with_template(Template::new().map("Amount", "amount"))
///     .extract(&[])
///     .unwrap();
/// ```
#[derive(Clone, Default)]
pub struct Pdfrows {
    options: ExtractOptions,
    template: Template,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl Pdfrows {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all extraction options.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the extraction method.
    pub fn with_method(mut self, method: ExtractionMethod) -> Self {
        self.options.extraction_method = method;
        self
    }

    /// Append a named text pattern.
    pub fn with_pattern(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.options = self.options.with_pattern(name, pattern);
        self
    }

    /// Enable or disable header rows.
    pub fn with_header_row(mut self, header: bool) -> Self {
        self.options.header_row = header;
        self
    }

    /// Set page range.
    pub fn with_pages(mut self, pages: PageRange) -> Self {
        self.options.page_range = Some(pages);
        self
    }

    /// Set the output template.
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    /// Set the OCR engine used by batches.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.options.ocr_enabled = true;
        self.ocr = Some(engine);
        self
    }

    /// Extract records from already decoded pages.
    pub fn extract(&self, pages: &[PageContent]) -> Result<ExtractionResult> {
        extract_pages(pages, &self.options, &self.template)
    }

    /// Build a batch orchestrator with these settings.
    pub fn orchestrator(&self) -> BatchOrchestrator {
        let orchestrator =
            BatchOrchestrator::new(self.options.clone()).with_template(self.template.clone());
        match &self.ocr {
            Some(engine) => orchestrator.with_ocr_engine(Arc::clone(engine)),
            None => orchestrator,
        }
    }

    /// Process a batch of documents.
    pub fn run(&self, documents: &[Arc<dyn DocumentSource>]) -> BatchSummary {
        self.orchestrator().run(documents)
    }

    /// Extraction options in use.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }
}
