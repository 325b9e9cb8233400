//! Batch processing across documents.
//!
//! Documents run in parallel on a fixed-size worker pool; the pages of one
//! document run sequentially and in order. Each document is an isolated
//! failure domain: whatever goes wrong with it ends up as an [`ErrorKind`]
//! in its own slot of the [`BatchSummary`], never as a batch error.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pdfrows::batch::{BatchOrchestrator, DocumentSource, MemoryDocument};
//! use pdfrows::ExtractOptions;
//!
//! let doc = MemoryDocument::from_json(r#"{"label": "a.pdf", "pages": []}"#)?;
//! let docs: Vec<Arc<dyn DocumentSource>> = vec![Arc::new(doc)];
//!
//! let summary = BatchOrchestrator::new(ExtractOptions::default()).run(&docs);
//! println!("{} of {} documents succeeded", summary.succeeded(), summary.len());
//! # Ok::<(), pdfrows::Error>(())
//! ```

mod source;

pub use source::{DocumentSource, MemoryDocument, OcrEngine, PageImage};

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::RecvTimeoutError;

use crate::error::{Error, ErrorKind, Result};
use crate::extract::{extract_pages, ExtractOptions};
use crate::model::{
    BatchSummary, DocumentOutcome, ExtractionResult, PageContent, Template, Warning, WarningKind,
};

/// Cooperative cancellation signal.
///
/// Clones share the same flag. A [`child`](Self::child) token has its own
/// flag and also observes its parent's.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token cancelled by either itself or this token.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .map_or(false, |p| p.load(Ordering::SeqCst))
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Runs the extraction pipeline over a batch of documents.
#[derive(Clone)]
pub struct BatchOrchestrator {
    options: ExtractOptions,
    template: Template,
    ocr: Option<Arc<dyn OcrEngine>>,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    /// Create an orchestrator with extraction options.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            template: Template::default(),
            ocr: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the output template.
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    /// Set the OCR engine used for image-only pages.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this orchestrator's batches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Extraction options in use.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Process every document and return one outcome per document, in
    /// input order.
    pub fn run(&self, documents: &[Arc<dyn DocumentSource>]) -> BatchSummary {
        let started_at = Utc::now();
        let workers = self.worker_count(documents.len());
        log::info!(
            "batch: {} documents on {} workers",
            documents.len(),
            workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pdfrows-worker-{}", i))
            .build();

        let mut slots: Vec<Option<DocumentOutcome>> = (0..documents.len()).map(|_| None).collect();

        match pool {
            Ok(pool) => {
                let (tx, rx) = crossbeam_channel::unbounded::<DocumentOutcome>();
                pool.scope(|scope| {
                    for (index, doc) in documents.iter().enumerate() {
                        let tx = tx.clone();
                        scope.spawn(move |_| {
                            let _ = tx.send(self.run_document(index, doc));
                        });
                    }
                });
                drop(tx);
                for outcome in rx.iter() {
                    let index = outcome.index;
                    slots[index] = Some(outcome);
                }
            }
            Err(e) => {
                log::warn!("worker pool unavailable ({}), processing sequentially", e);
                for (index, doc) in documents.iter().enumerate() {
                    slots[index] = Some(self.run_document(index, doc));
                }
            }
        }

        let documents: Vec<DocumentOutcome> = slots
            .into_iter()
            .zip(documents)
            .enumerate()
            .map(|(index, (slot, doc))| {
                slot.unwrap_or_else(|| DocumentOutcome {
                    index,
                    label: doc.label().to_string(),
                    result: ExtractionResult::failed(ErrorKind::Internal(
                        "document produced no result".to_string(),
                    )),
                    elapsed_ms: 0,
                })
            })
            .collect();

        let summary = BatchSummary {
            documents,
            started_at,
            finished_at: Utc::now(),
        };
        log::info!(
            "batch: {} succeeded, {} failed, {} records",
            summary.succeeded(),
            summary.failed(),
            summary.total_records()
        );
        summary
    }

    fn worker_count(&self, documents: usize) -> usize {
        let available = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        self.options
            .max_workers
            .unwrap_or(available)
            .min(documents)
            .max(1)
    }

    fn run_document(&self, index: usize, doc: &Arc<dyn DocumentSource>) -> DocumentOutcome {
        let start = Instant::now();
        let label = doc.label().to_string();
        log::info!("processing '{}'", label);

        let outcome = if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            match self.options.timeout() {
                Some(timeout) => self.run_with_timeout(index, doc, timeout),
                None => self.run_guarded(doc),
            }
        };

        let result = match outcome {
            Ok(result) => {
                for warning in &result.warnings {
                    log::debug!("'{}': {}", label, warning);
                }
                result
            }
            Err(e) => {
                log::warn!("'{}' failed: {}", label, e);
                ExtractionResult::failed(ErrorKind::from(&e))
            }
        };

        DocumentOutcome {
            index,
            label,
            result,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn run_guarded(&self, doc: &Arc<dyn DocumentSource>) -> Result<ExtractionResult> {
        let run = || {
            process_document(
                doc.as_ref(),
                &self.options,
                &self.template,
                self.ocr.as_deref(),
                &self.cancel,
            )
        };
        panic::catch_unwind(AssertUnwindSafe(run))
            .unwrap_or_else(|_| Err(Error::Other("document worker panicked".to_string())))
    }

    /// Run a document on its own thread and wait at most `timeout` for it.
    ///
    /// On expiry the thread's token is cancelled so it stops at its next
    /// page step; its late result is discarded.
    fn run_with_timeout(
        &self,
        index: usize,
        doc: &Arc<dyn DocumentSource>,
        timeout: Duration,
    ) -> Result<ExtractionResult> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let token = self.cancel.child();

        let source = Arc::clone(doc);
        let options = self.options.clone();
        let template = self.template.clone();
        let ocr = self.ocr.clone();
        let worker_token = token.clone();

        thread::Builder::new()
            .name(format!("pdfrows-doc-{}", index))
            .spawn(move || {
                let result = process_document(
                    source.as_ref(),
                    &options,
                    &template,
                    ocr.as_deref(),
                    &worker_token,
                );
                let _ = tx.send(result);
            })
            .map_err(|e| Error::Other(format!("failed to start document thread: {}", e)))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                token.cancel();
                Err(Error::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Other("document worker panicked".to_string()))
            }
        }
    }
}

/// Decode, OCR and extract one document.
///
/// Pages outside the page range are never decoded. A page that fails to
/// decode is skipped with a warning; the document fails only when it has
/// no pages or none of its selected pages can be decoded. Cancellation is
/// checked before every page.
pub fn process_document(
    source: &dyn DocumentSource,
    options: &ExtractOptions,
    template: &Template,
    ocr: Option<&dyn OcrEngine>,
    cancel: &CancellationToken,
) -> Result<ExtractionResult> {
    options.validate()?;
    template.validate()?;
    cancel.check()?;

    let page_count = source.page_count()?;
    if page_count == 0 {
        return Err(Error::Decode(format!("'{}' has no pages", source.label())));
    }

    let mut pages: Vec<PageContent> = Vec::new();
    let mut warnings: Vec<Warning> = Vec::new();
    let mut selected = 0;
    let mut ocr_attempts = 0;
    let mut ocr_failures: Vec<String> = Vec::new();
    let mut ocr_pages = 0;

    for page_index in 0..page_count {
        if !options.includes_page(page_index) {
            continue;
        }
        cancel.check()?;
        selected += 1;

        let mut page = match source.decode_page(page_index) {
            Ok(page) => page,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                log::warn!("page {}: decode failed: {}", page_index + 1, e);
                warnings.push(Warning::on_page(
                    WarningKind::PageDecode,
                    page_index,
                    format!("page could not be decoded: {}", e),
                ));
                continue;
            }
        };

        page.page_index = page_index;
        let fragments = std::mem::take(&mut page.fragments);
        page.replace_fragments(fragments);

        if !page.has_text() && options.ocr_enabled {
            if let Some(engine) = ocr {
                ocr_attempts += 1;
                match source
                    .render_page(page_index)
                    .and_then(|image| engine.recognize(&image))
                {
                    Ok(fragments) => {
                        log::debug!(
                            "page {}: OCR produced {} fragments",
                            page_index + 1,
                            fragments.len()
                        );
                        if !fragments.is_empty() {
                            page.replace_fragments(fragments);
                            ocr_pages += 1;
                        }
                    }
                    Err(e) => {
                        log::warn!("page {}: OCR failed: {}", page_index + 1, e);
                        warnings.push(Warning::on_page(
                            WarningKind::Ocr,
                            page_index,
                            format!("OCR failed: {}", e),
                        ));
                        ocr_failures.push(e.to_string());
                    }
                }
            }
        }

        pages.push(page);
    }

    if selected > 0 && pages.is_empty() {
        return Err(Error::Decode(format!(
            "none of the {} selected pages of '{}' could be decoded",
            selected,
            source.label()
        )));
    }
    if ocr_attempts > 0 && ocr_attempts == pages.len() && ocr_failures.len() == ocr_attempts {
        return Err(Error::Ocr(ocr_failures.join("; ")));
    }

    cancel.check()?;
    let mut result = extract_pages(&pages, options, template)?;
    warnings.append(&mut result.warnings);
    result.warnings = warnings;
    result.stats.ocr_pages = ocr_pages;

    log::info!(
        "'{}': {} records from {} pages",
        source.label(),
        result.record_count(),
        result.stats.pages_processed
    );
    Ok(result)
}
