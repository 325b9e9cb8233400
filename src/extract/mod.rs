//! Structured-data extraction from decoded page content.
//!
//! The pipeline for one document runs in a fixed order:
//! strategy selection, then detection ([`TableDetector`], [`PatternMatcher`]
//! or form fields), cleaning ([`DataCleaner`]), template mapping
//! ([`TemplateMapper`]) and assembly into a single schema
//! ([`RecordAssembler`]).

mod assemble;
mod clean;
mod mapper;
mod options;
mod pattern;
pub mod rows;
mod table_detector;

pub use assemble::{disambiguate, header_names, RecordAssembler, RecordBatch};
pub use clean::{clean_text, collapse_whitespace, DataCleaner};
pub use mapper::{Mapped, TemplateMapper};
pub use options::{DetectorConfig, ExtractOptions, ExtractionMethod, PageRange, TextPattern};
pub use pattern::{MatchPosition, PatternMatch, PatternMatcher, PatternOutcome};
pub use table_detector::{Detection, TableDetector};

use crate::error::Result;
use crate::model::{
    DocumentStats, ExtractionResult, FormField, PageContent, Template, Warning, WarningKind,
};

/// Extraction strategy resolved for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Geometric table detection
    Table,
    /// Named text patterns
    Pattern,
    /// Form field values
    Form,
}

impl Strategy {
    /// Resolve the strategy for a document's pages.
    ///
    /// `auto` picks `form` when the pages carry form fields but no text,
    /// else `table` when table detection is enabled, else `pattern` when
    /// patterns are configured, else `table`.
    pub fn resolve(options: &ExtractOptions, pages: &[PageContent]) -> Self {
        match options.extraction_method {
            ExtractionMethod::Table => Strategy::Table,
            ExtractionMethod::Pattern => Strategy::Pattern,
            ExtractionMethod::Form => Strategy::Form,
            ExtractionMethod::Auto => {
                let has_fields = pages.iter().any(|p| !p.form_fields.is_empty());
                let has_text = pages.iter().any(PageContent::has_text);
                if has_fields && !has_text {
                    Strategy::Form
                } else if options.table_detection || options.text_patterns.is_empty() {
                    Strategy::Table
                } else {
                    Strategy::Pattern
                }
            }
        }
    }
}

/// Records found by one strategy, before the result is put together.
struct Partial {
    batch: RecordBatch,
    warnings: Vec<Warning>,
    found: bool,
}

/// Run the extraction pipeline over one document's decoded pages.
///
/// Pages outside `options.page_range` are skipped. Configuration problems
/// (invalid options, patterns or template) are errors; everything else
/// found along the way is reported as a warning on the result.
pub fn extract_pages(
    pages: &[PageContent],
    options: &ExtractOptions,
    template: &Template,
) -> Result<ExtractionResult> {
    options.validate()?;
    template.validate()?;
    let matcher = PatternMatcher::from_options(options)?;

    let selected: Vec<PageContent> = pages
        .iter()
        .filter(|p| options.includes_page(p.page_index))
        .cloned()
        .collect();

    let mut stats = DocumentStats {
        pages_processed: selected.len() as u32,
        ..Default::default()
    };

    let strategy = Strategy::resolve(options, &selected);
    log::debug!("extract: {} pages with {:?} strategy", selected.len(), strategy);

    let mapper = TemplateMapper::new(template.clone());
    let mut partial = match strategy {
        Strategy::Table => extract_tables(&selected, options, &mapper, &mut stats),
        Strategy::Pattern => extract_patterns(&selected, &matcher, &mapper, &mut stats),
        Strategy::Form => extract_forms(&selected, &mapper),
    };

    if strategy == Strategy::Table
        && !partial.found
        && options.extraction_method == ExtractionMethod::Auto
        && !matcher.is_empty()
    {
        log::info!("no tables found, falling back to pattern matching");
        let fallback = extract_patterns(&selected, &matcher, &mapper, &mut stats);
        let mut warnings = partial.warnings;
        warnings.extend(fallback.warnings);
        partial = Partial {
            batch: fallback.batch,
            warnings,
            found: fallback.found,
        };
    }

    let mut warnings = partial.warnings;
    if !partial.found {
        log::warn!("no tables, pattern matches or form fields found");
        warnings.push(Warning::new(
            WarningKind::NoStructureFound,
            "no tables, pattern matches or form fields were found",
        ));
    }

    stats.records = partial.batch.records.len() as u32;

    Ok(ExtractionResult {
        columns: partial.batch.columns,
        records: partial.batch.records,
        warnings,
        error: None,
        stats,
    })
}

fn extract_tables(
    pages: &[PageContent],
    options: &ExtractOptions,
    mapper: &TemplateMapper,
    stats: &mut DocumentStats,
) -> Partial {
    let detection = TableDetector::from_options(options).detect(pages);
    let mut warnings = detection.warnings;
    stats.tables_detected = detection.tables.len() as u32;

    let cleaner = DataCleaner::from_options(options);
    let assembler = RecordAssembler::new(options.header_row);

    let mut batches = Vec::new();
    for table in detection.tables {
        let table = cleaner.clean(table);
        if table.is_empty() {
            continue;
        }
        if mapper.template().is_empty() {
            batches.push(assembler.assemble(&table));
        } else {
            let mapped = mapper.map_table(&table, options.header_row);
            warnings.extend(mapped.warnings);
            batches.push(mapped.batch);
        }
    }

    Partial {
        found: stats.tables_detected > 0,
        batch: assembler.unify(batches),
        warnings,
    }
}

fn extract_patterns(
    pages: &[PageContent],
    matcher: &PatternMatcher,
    mapper: &TemplateMapper,
    stats: &mut DocumentStats,
) -> Partial {
    let outcome = matcher.match_pages(pages);
    stats.pattern_matches = outcome.matches.len() as u32;

    let names: Vec<String> = matcher.names().map(str::to_string).collect();
    let mapped = mapper.map_matches(&names, &outcome.matches);

    let mut warnings = outcome.warnings;
    warnings.extend(mapped.warnings);
    Partial {
        found: !outcome.matches.is_empty(),
        batch: mapped.batch,
        warnings,
    }
}

fn extract_forms(pages: &[PageContent], mapper: &TemplateMapper) -> Partial {
    let fields: Vec<FormField> = pages
        .iter()
        .flat_map(|p| p.form_fields.iter().cloned())
        .collect();
    let mapped = mapper.map_fields(&fields);
    Partial {
        found: !fields.is_empty(),
        batch: mapped.batch,
        warnings: mapped.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextFragment;

    fn frag(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> TextFragment {
        TextFragment::new(text, x0, y0, x1, y1)
    }

    fn name_age_page() -> PageContent {
        PageContent::new(0)
            .with_fragment(frag("Name", 0.0, 0.0, 30.0, 10.0))
            .with_fragment(frag("Age", 100.0, 0.0, 120.0, 10.0))
            .with_fragment(frag("Alice", 0.0, 15.0, 30.0, 25.0))
            .with_fragment(frag("30", 100.0, 15.0, 115.0, 25.0))
            .with_fragment(frag("Bob", 100.0, 26.0, 120.0, 36.0))
    }

    #[test]
    fn test_continuation_scenario() {
        let result =
            extract_pages(&[name_age_page()], &ExtractOptions::default(), &Template::new())
                .unwrap();

        assert_eq!(result.columns, vec!["Name", "Age"]);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].get("Name"), Some("Alice"));
        assert_eq!(result.records[0].get("Age"), Some("30 Bob"));
        assert!(result.warnings.is_empty());
        assert_eq!(result.stats.tables_detected, 1);
        assert_eq!(result.stats.records, 1);
    }

    #[test]
    fn test_template_scenario() {
        let page = PageContent::new(0)
            .with_fragment(frag("first", 0.0, 0.0, 30.0, 10.0))
            .with_fragment(frag("second", 0.0, 15.0, 30.0, 25.0));
        let options = ExtractOptions::default().with_header_row(false);
        let template = Template::new().map("col_1", "value").map("col_2", "col_2");

        let result = extract_pages(&[page], &options, &template).unwrap();
        assert_eq!(result.columns, vec!["value", "col_2"]);
        assert_eq!(result.records.len(), 2);
        assert!(result.records.iter().all(|r| r.get("col_2") == Some("")));
        assert_eq!(result.warnings_of(WarningKind::TemplateMismatch).count(), 1);
    }

    #[test]
    fn test_pattern_strategy() {
        let page = PageContent::new(0)
            .with_fragment(frag("Total: 42", 0.0, 0.0, 60.0, 10.0))
            .with_fragment(frag("Other text", 0.0, 20.0, 60.0, 30.0));
        let options = ExtractOptions::default()
            .with_method(ExtractionMethod::Pattern)
            .with_pattern("total", r"Total:\s*(\d+)");

        let result = extract_pages(&[page], &options, &Template::new()).unwrap();
        assert_eq!(result.columns, vec!["total"]);
        assert_eq!(result.records[0].get("total"), Some("42"));
        assert!(result.warnings.is_empty());
        assert_eq!(result.stats.pattern_matches, 1);
    }

    #[test]
    fn test_auto_resolves_form() {
        let page = PageContent::new(0)
            .with_field("name", "Alice")
            .with_field("city", "Oslo");
        let options = ExtractOptions::default();
        assert_eq!(Strategy::resolve(&options, &[page.clone()]), Strategy::Form);

        let result = extract_pages(&[page], &options, &Template::new()).unwrap();
        assert_eq!(result.columns, vec!["name", "city"]);
        assert_eq!(result.records[0].get("city"), Some("Oslo"));
    }

    #[test]
    fn test_auto_resolution_order() {
        let page = PageContent::new(0).with_fragment(frag("x", 0.0, 0.0, 5.0, 5.0));
        let pages = [page];

        let options = ExtractOptions::default();
        assert_eq!(Strategy::resolve(&options, &pages), Strategy::Table);

        let options = ExtractOptions::default()
            .with_table_detection(false)
            .with_pattern("x", "x");
        assert_eq!(Strategy::resolve(&options, &pages), Strategy::Pattern);

        let options = ExtractOptions::default().with_table_detection(false);
        assert_eq!(Strategy::resolve(&options, &pages), Strategy::Table);
    }

    #[test]
    fn test_auto_falls_back_to_patterns() {
        let options = ExtractOptions::default().with_pattern("total", r"Total:\s*(\d+)");
        let page = PageContent::new(0).with_line(crate::model::RulingLine::horizontal(5.0, 0.0, 10.0));
        let result = extract_pages(&[page], &options, &Template::new()).unwrap();

        // no text at all: the table pass finds nothing and so does the fallback
        assert_eq!(result.columns, vec!["total"]);
        assert!(result.records.is_empty());
        assert_eq!(result.warnings_of(WarningKind::PatternUnmatched).count(), 1);
        assert_eq!(result.warnings_of(WarningKind::NoStructureFound).count(), 1);
    }

    #[test]
    fn test_empty_page_is_not_fatal() {
        let result =
            extract_pages(&[PageContent::new(0)], &ExtractOptions::default(), &Template::new())
                .unwrap();
        assert!(!result.is_failed());
        assert!(result.records.is_empty());
        assert_eq!(result.warnings_of(WarningKind::EmptyPage).count(), 1);
        assert_eq!(result.warnings_of(WarningKind::NoStructureFound).count(), 1);
    }

    #[test]
    fn test_page_range_filters() {
        let second = PageContent::new(1)
            .with_fragment(frag("A", 0.0, 0.0, 20.0, 10.0))
            .with_fragment(frag("B", 60.0, 0.0, 80.0, 10.0))
            .with_fragment(frag("1", 0.0, 20.0, 20.0, 30.0))
            .with_fragment(frag("2", 60.0, 20.0, 80.0, 30.0));
        let options = ExtractOptions::default().with_pages(PageRange::parse("2").unwrap());

        let result =
            extract_pages(&[name_age_page(), second], &options, &Template::new()).unwrap();
        assert_eq!(result.stats.pages_processed, 1);
        assert_eq!(result.columns, vec!["A", "B"]);
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let options = ExtractOptions::default().with_pattern("bad", "(");
        let err = extract_pages(&[], &options, &Template::new()).unwrap_err();
        assert!(matches!(
            crate::error::ErrorKind::from(&err),
            crate::error::ErrorKind::Configuration(_)
        ));
    }

    #[test]
    fn test_duplicate_pattern_names_are_configuration_error() {
        let page = PageContent::new(0).with_fragment(frag("Date: 2024-01-02", 0.0, 0.0, 90.0, 10.0));
        let options = ExtractOptions::default()
            .with_method(ExtractionMethod::Pattern)
            .with_pattern("date", r"Date:\s*(\d{4}-\d{2}-\d{2})")
            .with_pattern("date", r"(\d{2}/\d{2}/\d{4})");

        let err = extract_pages(&[page], &options, &Template::new()).unwrap_err();
        assert!(matches!(
            crate::error::ErrorKind::from(&err),
            crate::error::ErrorKind::Configuration(_)
        ));
    }
}
