//! Record assembly with a stable column schema.

use std::collections::HashSet;

use crate::model::{positional_name, Record, Table, TableRow};

/// Records sharing one ordered column set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    /// Column names, in output order
    pub columns: Vec<String>,
    /// Records, each with exactly `columns`
    pub records: Vec<Record>,
}

impl RecordBatch {
    /// Build a batch from column names and row values aligned with them.
    pub fn from_rows(columns: Vec<String>, rows: impl IntoIterator<Item = Vec<String>>) -> Self {
        let records = rows
            .into_iter()
            .map(|values| {
                let mut record = Record::new();
                let mut values = values.into_iter();
                for column in &columns {
                    record.insert(column.clone(), values.next().unwrap_or_default());
                }
                record
            })
            .collect();
        Self { columns, records }
    }

    /// Check if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Make a list of column names usable as a schema.
///
/// Blank names become positional (`column_N`), repeated names get `_2`,
/// `_3`, … suffixes.
pub fn disambiguate(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    names
        .into_iter()
        .enumerate()
        .map(|(col, name)| {
            let base = match name.trim() {
                "" => positional_name(col),
                trimmed => trimmed.to_string(),
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while seen.contains(&candidate) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Column names taken from a header row.
pub fn header_names(row: &TableRow) -> Vec<String> {
    disambiguate(row.values())
}

/// Turns cleaned tables into records.
#[derive(Debug, Clone, Default)]
pub struct RecordAssembler {
    header_row: bool,
}

impl RecordAssembler {
    /// Create an assembler; with `header_row`, row 0 of each table names
    /// its columns.
    pub fn new(header_row: bool) -> Self {
        Self { header_row }
    }

    /// Records of one table.
    pub fn assemble(&self, table: &Table) -> RecordBatch {
        let (columns, data) = match table.rows.split_first() {
            Some((header, rest)) if self.header_row => (header_names(header), rest),
            _ => (
                (0..table.column_count).map(positional_name).collect(),
                table.rows.as_slice(),
            ),
        };
        RecordBatch::from_rows(columns, data.iter().map(TableRow::values))
    }

    /// Merge batches into one schema: the union of their columns in
    /// first-seen order, with absent values left empty.
    pub fn unify(&self, batches: Vec<RecordBatch>) -> RecordBatch {
        let mut columns: Vec<String> = Vec::new();
        for batch in &batches {
            for column in &batch.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let records = batches
            .iter()
            .flat_map(|b| b.records.iter())
            .map(|r| r.conform(&columns))
            .collect();

        RecordBatch { columns, records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_with_header() {
        let table = Table::from_rows(vec![vec!["Name", "Age"], vec!["Alice", "30"]]);
        let batch = RecordAssembler::new(true).assemble(&table);
        assert_eq!(batch.columns, vec!["Name", "Age"]);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].get("Age"), Some("30"));
    }

    #[test]
    fn test_assemble_positional() {
        let table = Table::from_rows(vec![vec!["Name", "Age"], vec!["Alice", "30"]]);
        let batch = RecordAssembler::new(false).assemble(&table);
        assert_eq!(batch.columns, vec!["column_1", "column_2"]);
        assert_eq!(batch.records.len(), 2);
    }

    #[test]
    fn test_header_only_table_keeps_schema() {
        let table = Table::from_rows(vec![vec!["Name", "Age"]]);
        let batch = RecordAssembler::new(true).assemble(&table);
        assert_eq!(batch.columns.len(), 2);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_disambiguate() {
        let names = vec!["Name".into(), "".into(), "Name".into(), "Name".into()];
        assert_eq!(
            disambiguate(names),
            vec!["Name", "column_2", "Name_2", "Name_3"]
        );
    }

    #[test]
    fn test_unify_union_first_seen() {
        let assembler = RecordAssembler::new(true);
        let a = assembler.assemble(&Table::from_rows(vec![vec!["Name", "Age"], vec!["Alice", "30"]]));
        let b = assembler.assemble(&Table::from_rows(vec![vec!["Name", "City"], vec!["Bob", "Oslo"]]));
        let unified = assembler.unify(vec![a, b]);

        assert_eq!(unified.columns, vec!["Name", "Age", "City"]);
        assert_eq!(unified.records.len(), 2);
        assert_eq!(unified.records[0].get("City"), Some(""));
        assert_eq!(unified.records[1].get("Age"), Some(""));
        for record in &unified.records {
            assert_eq!(record.columns().collect::<Vec<_>>(), unified.columns);
        }
    }
}
