//! Table types.

use super::BoundingBox;
use serde::{Deserialize, Serialize};

/// A detected table.
///
/// Every row holds exactly `column_count` cells; positions without content
/// carry empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows in the table, top to bottom
    pub rows: Vec<TableRow>,

    /// Number of logical columns
    pub column_count: usize,

    /// Page on which the table starts
    pub page_index: usize,

    /// Column boundaries (X coordinates, `column_count + 1` entries when known)
    pub column_boundaries: Vec<f32>,
}

impl Table {
    /// Create a new empty table.
    pub fn new(column_count: usize, page_index: usize) -> Self {
        Self {
            rows: Vec::new(),
            column_count,
            page_index,
            column_boundaries: Vec::new(),
        }
    }

    /// Build a table from plain text values, padding short rows.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect())
            .collect();
        let column_count = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut table = Table::new(column_count, 0);
        for values in rows {
            table.push_values(values);
        }
        table
    }

    /// Append a row of text values, padding it to the column count.
    pub fn push_values(&mut self, values: Vec<String>) {
        let row_index = self.rows.len();
        let mut cells: Vec<Cell> = values
            .into_iter()
            .take(self.column_count)
            .enumerate()
            .map(|(col, text)| Cell::text(row_index, col, text))
            .collect();
        while cells.len() < self.column_count {
            cells.push(Cell::empty(row_index, cells.len()));
        }
        self.rows.push(TableRow::new(cells));
    }

    /// Add a row to the table, padding or truncating it to the column count.
    pub fn add_row(&mut self, mut row: TableRow) {
        let row_index = self.rows.len();
        row.cells.truncate(self.column_count);
        while row.cells.len() < self.column_count {
            let col = row.cells.len();
            row.cells.push(Cell::empty(row_index, col));
        }
        for (col, cell) in row.cells.iter_mut().enumerate() {
            cell.row = row_index;
            cell.col = col;
        }
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Text of every cell, row by row.
    pub fn values(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(TableRow::values).collect()
    }

    /// Check if any cell spans several rows or columns.
    pub fn has_merged_cells(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|r| &r.cells)
            .any(Cell::is_merged)
    }

    /// Renumber `row` on every cell after rows were removed.
    pub(crate) fn reindex(&mut self) {
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            for cell in &mut row.cells {
                cell.row = row_index;
            }
        }
    }
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in the row
    pub cells: Vec<Cell>,
}

impl TableRow {
    /// Create a new row with cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Text of every cell.
    pub fn values(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.text.clone()).collect()
    }

    /// Check if every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Row index within the table
    pub row: usize,

    /// Column index within the table
    pub col: usize,

    /// Cell text; continuation lines are separated by `\n`
    pub text: String,

    /// Area covered by the cell's fragments
    pub bounding_box: Option<BoundingBox>,

    /// Number of physical text lines folded into this cell
    pub spans_rows: usize,

    /// Number of columns this cell spans
    pub spans_cols: usize,
}

impl Cell {
    /// Create a new cell with text content.
    pub fn text(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            text: text.into(),
            bounding_box: None,
            spans_rows: 1,
            spans_cols: 1,
        }
    }

    /// Create an empty cell.
    pub fn empty(row: usize, col: usize) -> Self {
        Self::text(row, col, String::new())
    }

    /// Set colspan and return self.
    pub fn colspan(mut self, span: usize) -> Self {
        self.spans_cols = span.max(1);
        self
    }

    /// Check if the cell holds no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Check if this cell spans multiple rows or columns.
    pub fn is_merged(&self) -> bool {
        self.spans_rows > 1 || self.spans_cols > 1
    }

    /// Append a continuation line to this cell.
    pub fn append_line(&mut self, line: &str, bbox: Option<BoundingBox>) {
        if self.text.is_empty() {
            self.text = line.to_string();
        } else {
            self.text.push('\n');
            self.text.push_str(line);
        }
        self.spans_rows += 1;
        self.bounding_box = match (self.bounding_box, bbox) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_new() {
        let table = Table::new(0, 0);
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count, 0);
    }

    #[test]
    fn test_table_from_rows_pads() {
        let table = Table::from_rows(vec![vec!["Name", "Age"], vec!["Alice"]]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count, 2);
        assert_eq!(table.rows[1].cells.len(), 2);
        assert!(table.rows[1].cells[1].is_empty());
        assert_eq!(table.rows[1].cells[1].row, 1);
        assert_eq!(table.rows[1].cells[1].col, 1);
    }

    #[test]
    fn test_merged_cells() {
        let mut table = Table::new(2, 0);
        table.add_row(TableRow::new(vec![Cell::text(0, 0, "Merged").colspan(2)]));

        assert!(table.has_merged_cells());
        assert_eq!(table.rows[0].cells.len(), 2);
    }

    #[test]
    fn test_append_line() {
        let mut cell = Cell::text(0, 1, "30");
        cell.append_line("Bob", None);
        assert_eq!(cell.text, "30\nBob");
        assert_eq!(cell.spans_rows, 2);
        assert!(cell.is_merged());
    }

    #[test]
    fn test_blank_row() {
        let table = Table::from_rows(vec![vec!["", "  "]]);
        assert!(table.rows[0].is_blank());
    }
}
