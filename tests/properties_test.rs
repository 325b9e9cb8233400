//! Property-based tests for extraction invariants.

use pdfrows::extract::{DataCleaner, PatternMatcher, RecordAssembler, TableDetector, TextPattern};
use pdfrows::{ExtractOptions, PageContent, Table, TextFragment};
use proptest::prelude::*;

fn cell_text() -> impl Strategy<Value = String> {
    "[a-c ]{0,4}"
}

fn table_rows() -> impl Strategy<Value = Vec<Vec<String>>> {
    (1usize..5).prop_flat_map(|cols| {
        prop::collection::vec(prop::collection::vec(cell_text(), cols), 0..15)
    })
}

/// Property: dropping empty rows never adds rows and keeps survivors in order
#[test]
fn proptest_skip_empty_rows_monotonic() {
    proptest!(|(rows in table_rows())| {
        let options = ExtractOptions::default()
            .with_merge_cells(false)
            .with_clean_data(false);
        let table = Table::from_rows(rows.clone());
        let before = table.row_count();

        let cleaned = DataCleaner::from_options(&options).clean(table);
        prop_assert!(cleaned.row_count() <= before);

        let expected: Vec<Vec<String>> = rows
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .collect();
        prop_assert_eq!(cleaned.values(), expected);
    });
}

/// Property: cleaning an already cleaned table changes nothing
#[test]
fn proptest_clean_idempotent() {
    proptest!(|(rows in table_rows(), extra in prop::collection::vec(cell_text(), 0..4), collapse in any::<bool>())| {
        let mut table = Table::from_rows(rows);
        if let Some(row) = table.rows.last_mut() {
            for (cell, line) in row.cells.iter_mut().zip(&extra) {
                cell.append_line(line, None);
            }
        }

        let cleaner = DataCleaner::from_options(
            &ExtractOptions::default().with_collapse_whitespace(collapse),
        );
        let once = cleaner.clean(table);
        let twice = cleaner.clean(once.clone());
        prop_assert_eq!(once, twice);
    });
}

/// Property: every record has exactly the header's columns, in order
#[test]
fn proptest_header_schema() {
    proptest!(|(rows in table_rows())| {
        let table = Table::from_rows(rows);
        let batch = RecordAssembler::new(true).assemble(&table);

        prop_assert_eq!(batch.columns.len(), table.column_count);
        for record in &batch.records {
            let columns: Vec<&str> = record.columns().collect();
            prop_assert_eq!(columns, batch.columns.iter().map(String::as_str).collect::<Vec<_>>());
        }
    });
}

fn lines_page(lines: &[String]) -> PageContent {
    let mut page = PageContent::new(0);
    for (i, line) in lines.iter().enumerate() {
        let top = i as f32 * 20.0;
        page.add_fragment(TextFragment::new(line.clone(), 0.0, top, 200.0, top + 10.0));
    }
    page
}

/// Property: repeated pattern runs yield identical match sequences
#[test]
fn proptest_pattern_order_deterministic() {
    proptest!(|(lines in prop::collection::vec("(Total: [0-9]{1,3}|Ref [A-Z]{2}|[a-z ]{0,10})", 0..12))| {
        let matcher = PatternMatcher::new(&[
            TextPattern::new("total", r"Total:\s*(\d+)"),
            TextPattern::new("ref", r"Ref ([A-Z]+)"),
            TextPattern::new("digit", r"\d"),
        ])
        .unwrap();
        let pages = vec![lines_page(&lines)];

        let first = matcher.match_pages(&pages);
        let second = matcher.match_pages(&pages);
        prop_assert_eq!(&first.matches, &second.matches);
        prop_assert_eq!(first.warnings, second.warnings);
    });
}

/// Property: detected rows always span the full column count
#[test]
fn proptest_rows_full_width() {
    proptest!(|(grid in prop::collection::vec(prop::collection::vec(any::<bool>(), 1..5), 1..10))| {
        let mut page = PageContent::new(0);
        for (r, row) in grid.iter().enumerate() {
            for (c, present) in row.iter().enumerate() {
                if *present {
                    let x0 = c as f32 * 80.0;
                    let y0 = r as f32 * 15.0;
                    page.add_fragment(TextFragment::new(format!("r{}c{}", r, c), x0, y0, x0 + 30.0, y0 + 10.0));
                }
            }
        }

        let detection = TableDetector::new().detect(&[page]);
        for table in &detection.tables {
            for row in &table.rows {
                prop_assert_eq!(row.cells.len(), table.column_count);
            }
        }
    });
}
