//! Cell merging and data cleanup.

use unicode_normalization::UnicodeNormalization;

use crate::model::{Table, TableRow};

use super::options::ExtractOptions;

const LIGATURES: &[(&str, &str)] = &[
    ("\u{FB00}", "ff"),
    ("\u{FB01}", "fi"),
    ("\u{FB02}", "fl"),
    ("\u{FB03}", "ffi"),
    ("\u{FB04}", "ffl"),
    ("\u{FB05}", "st"),
    ("\u{FB06}", "st"),
];

/// Table cleanup pipeline.
///
/// Stages run in a fixed order, each behind its own switch:
/// 1. merge multi-line and column-spanning cells into one value
/// 2. trim, fix ligatures and normalize Unicode to NFC
/// 3. collapse internal whitespace runs
/// 4. drop rows whose cells are all empty
///
/// Only stage 4 changes the shape of a table. Running the pipeline on its
/// own output changes nothing.
#[derive(Debug, Clone)]
pub struct DataCleaner {
    merge_cells: bool,
    cell_join: String,
    clean_data: bool,
    collapse_whitespace: bool,
    skip_empty_rows: bool,
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::from_options(&ExtractOptions::default())
    }
}

impl DataCleaner {
    /// Create a cleaner from extraction options.
    pub fn from_options(options: &ExtractOptions) -> Self {
        Self {
            merge_cells: options.merge_cells,
            cell_join: options.cell_join.clone(),
            clean_data: options.clean_data,
            collapse_whitespace: options.collapse_whitespace,
            skip_empty_rows: options.skip_empty_rows,
        }
    }

    /// Clean a table.
    pub fn clean(&self, mut table: Table) -> Table {
        for row in &mut table.rows {
            if self.merge_cells {
                self.merge_row(row);
            }
            for cell in &mut row.cells {
                if self.clean_data {
                    cell.text = clean_text(&cell.text);
                }
                if self.collapse_whitespace {
                    cell.text = collapse_whitespace(&cell.text);
                }
            }
        }

        if self.skip_empty_rows {
            let before = table.rows.len();
            table.rows.retain(|row| !row.is_blank());
            if table.rows.len() != before {
                log::debug!(
                    "DataCleaner: dropped {} empty rows",
                    before - table.rows.len()
                );
                table.reindex();
            }
        }

        table
    }

    fn merge_row(&self, row: &mut TableRow) {
        for col in 0..row.cells.len() {
            if row.cells[col].text.contains('\n') {
                let joined = join_lines(&row.cells[col].text, &self.cell_join);
                row.cells[col].text = joined;
            }

            let span = row.cells[col].spans_cols;
            if span <= 1 {
                continue;
            }

            let end = (col + span).min(row.cells.len());
            let mut parts = vec![row.cells[col].text.clone()];
            for covered in &mut row.cells[col + 1..end] {
                if !covered.is_empty() {
                    parts.push(join_lines(&covered.text, &self.cell_join));
                }
                covered.text.clear();
            }
            row.cells[col].text = parts
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .collect::<Vec<_>>()
                .join(&self.cell_join);
        }
    }
}

/// Join the non-empty trimmed lines of `text` with `join`.
fn join_lines(text: &str, join: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(join)
}

/// Trim, replace ligatures and normalize to NFC.
pub fn clean_text(text: &str) -> String {
    let mut result: String = text.trim().nfc().collect();
    for (ligature, replacement) in LIGATURES {
        if result.contains(ligature) {
            result = result.replace(ligature, replacement);
        }
    }
    result
}

/// Collapse whitespace runs to a single space, line by line.
pub fn collapse_whitespace(text: &str) -> String {
    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}
