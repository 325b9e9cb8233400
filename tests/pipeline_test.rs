//! End-to-end tests of the extraction pipeline on decoded pages.

use pdfrows::extract::{MatchPosition, PatternMatcher, TextPattern};
use pdfrows::{
    extract_pages, ExtractOptions, ExtractionMethod, MemoryDocument, PageContent, RulingLine,
    Template, TextFragment, WarningKind,
};

fn frag(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> TextFragment {
    TextFragment::new(text, x0, y0, x1, y1)
}

#[test]
fn test_continuation_row_merges_into_previous_record() {
    let page = PageContent::new(0)
        .with_fragment(frag("Name", 0.0, 0.0, 30.0, 10.0))
        .with_fragment(frag("Age", 100.0, 0.0, 120.0, 10.0))
        .with_fragment(frag("Alice", 0.0, 15.0, 30.0, 25.0))
        .with_fragment(frag("30", 100.0, 15.0, 115.0, 25.0))
        .with_fragment(frag("Bob", 100.0, 26.0, 120.0, 36.0));
    let options = ExtractOptions::default()
        .with_skip_empty_rows(true)
        .with_merge_cells(true)
        .with_header_row(true);

    let result = extract_pages(&[page], &options, &Template::new()).unwrap();

    assert_eq!(result.columns, vec!["Name", "Age"]);
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].get("Name"), Some("Alice"));
    assert_eq!(result.records[0].get("Age"), Some("30 Bob"));
}

#[test]
fn test_total_pattern_matches_first_row() {
    let page = PageContent::new(0)
        .with_fragment(frag("Total: 42", 0.0, 0.0, 60.0, 10.0))
        .with_fragment(frag("Other text", 0.0, 20.0, 70.0, 30.0));

    let matcher = PatternMatcher::new(&[TextPattern::new("total", r"Total:\s*(\d+)")]).unwrap();
    let outcome = matcher.match_pages(&[page]);

    assert_eq!(outcome.matches.len(), 1);
    let m = &outcome.matches[0];
    assert_eq!((m.name.as_str(), m.value.as_str()), ("total", "42"));
    assert_eq!(m.page_index, 0);
    assert_eq!(m.position, MatchPosition::Row(0));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_template_column_missing_from_table() {
    let page = PageContent::new(0)
        .with_fragment(frag("north", 0.0, 0.0, 30.0, 10.0))
        .with_fragment(frag("south", 0.0, 15.0, 30.0, 25.0))
        .with_fragment(frag("east", 0.0, 30.0, 30.0, 40.0));
    let options = ExtractOptions::default().with_header_row(false);
    let template = Template::new().map("col_1", "region").map("col_2", "col_2");

    let result = extract_pages(&[page], &options, &template).unwrap();

    assert_eq!(result.columns, vec!["region", "col_2"]);
    assert_eq!(result.records.len(), 3);
    for record in &result.records {
        assert_eq!(record.get("col_2"), Some(""));
    }
    assert_eq!(result.warnings_of(WarningKind::TemplateMismatch).count(), 1);
}

#[test]
fn test_tables_unified_across_pages() {
    let first = PageContent::new(0)
        .with_fragment(frag("Name", 0.0, 0.0, 30.0, 10.0))
        .with_fragment(frag("Age", 100.0, 0.0, 120.0, 10.0))
        .with_fragment(frag("Alice", 0.0, 20.0, 30.0, 30.0))
        .with_fragment(frag("30", 100.0, 20.0, 115.0, 30.0));
    let second = PageContent::new(1)
        .with_fragment(frag("Name", 0.0, 0.0, 30.0, 10.0))
        .with_fragment(frag("City", 100.0, 0.0, 120.0, 10.0))
        .with_fragment(frag("Bob", 0.0, 20.0, 30.0, 30.0))
        .with_fragment(frag("Oslo", 100.0, 20.0, 125.0, 30.0));

    let result = extract_pages(&[first, second], &ExtractOptions::default(), &Template::new())
        .unwrap();

    assert_eq!(result.columns, vec!["Name", "Age", "City"]);
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[1].get("Age"), Some(""));
    assert_eq!(result.records[1].get("City"), Some("Oslo"));
    assert_eq!(result.stats.tables_detected, 2);
}

#[test]
fn test_ruled_table_with_spanning_title() {
    let page = PageContent::new(0)
        .with_line(RulingLine::vertical(0.0, 0.0, 60.0))
        .with_line(RulingLine::vertical(80.0, 0.0, 60.0))
        .with_line(RulingLine::vertical(160.0, 0.0, 60.0))
        .with_fragment(frag("Item", 5.0, 5.0, 30.0, 15.0))
        .with_fragment(frag("Price", 85.0, 5.0, 115.0, 15.0))
        .with_fragment(frag("Pen", 5.0, 25.0, 25.0, 35.0))
        .with_fragment(frag("1.50", 85.0, 25.0, 110.0, 35.0))
        .with_fragment(frag("Total due on receipt", 5.0, 45.0, 150.0, 55.0));

    let result = extract_pages(&[page], &ExtractOptions::default(), &Template::new()).unwrap();

    assert_eq!(result.columns, vec!["Item", "Price"]);
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[1].get("Item"), Some("Total due on receipt"));
    assert_eq!(result.records[1].get("Price"), Some(""));
}

#[test]
fn test_pattern_records_from_json_dump() {
    let doc = MemoryDocument::from_json(
        r#"{
            "label": "invoices.pdf",
            "pages": [
                {"page_index": 0, "fragments": [
                    {"text": "Invoice INV-001", "x0": 0, "y0": 0, "x1": 90, "y1": 10},
                    {"text": "Total: 120", "x0": 0, "y0": 20, "x1": 60, "y1": 30},
                    {"text": "Invoice INV-002", "x0": 0, "y0": 40, "x1": 90, "y1": 50},
                    {"text": "Total: 75", "x0": 0, "y0": 60, "x1": 60, "y1": 70}
                ]}
            ]
        }"#,
    )
    .unwrap();

    let options = ExtractOptions::default()
        .with_method(ExtractionMethod::Pattern)
        .with_pattern("invoice", r"Invoice\s+(\S+)")
        .with_pattern("total", r"Total:\s*(\d+)");
    let template = Template::new().map("invoice", "Invoice No").map("total", "Amount");

    let result = extract_pages(&doc.pages, &options, &template).unwrap();

    assert_eq!(result.columns, vec!["Invoice No", "Amount"]);
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].get("Invoice No"), Some("INV-001"));
    assert_eq!(result.records[1].get("Amount"), Some("75"));
    assert_eq!(result.stats.pattern_matches, 4);
}

#[test]
fn test_form_fields_with_template() {
    let page = PageContent::new(0)
        .with_field("applicant.name", "Alice")
        .with_field("applicant.city", "Oslo");
    let options = ExtractOptions::default().with_method(ExtractionMethod::Form);
    let template = Template::new()
        .map("applicant.name", "Name")
        .map("applicant.phone", "Phone");

    let result = extract_pages(&[page], &options, &template).unwrap();

    assert_eq!(result.columns, vec!["Name", "Phone"]);
    assert_eq!(result.records[0].get("Name"), Some("Alice"));
    assert_eq!(result.records[0].get("Phone"), Some(""));
    assert_eq!(result.warnings_of(WarningKind::TemplateMismatch).count(), 1);
}

#[test]
fn test_result_serializes() {
    let page = PageContent::new(0)
        .with_fragment(frag("A", 0.0, 0.0, 20.0, 10.0))
        .with_fragment(frag("B", 60.0, 0.0, 80.0, 10.0))
        .with_fragment(frag("1", 0.0, 20.0, 20.0, 30.0))
        .with_fragment(frag("2", 60.0, 20.0, 80.0, 30.0));
    let result = extract_pages(&[page], &ExtractOptions::default(), &Template::new()).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["records"][0]["A"], "1");
    assert_eq!(json["error"], serde_json::Value::Null);
}
