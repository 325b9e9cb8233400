//! Template mapping from detected structure to output columns.

use crate::model::{column_key, positional_name, FormField, Table, TableRow, Template, Warning, WarningKind};

use super::assemble::{disambiguate, header_names, RecordBatch};
use super::pattern::PatternMatch;

/// Records produced by a mapping, with the issues found on the way.
#[derive(Debug, Clone, Default)]
pub struct Mapped {
    /// Mapped records and their schema
    pub batch: RecordBatch,
    /// One `TemplateMismatch` warning per mapping whose source is absent
    pub warnings: Vec<Warning>,
}

/// Maps tables, pattern matches and form fields through a [`Template`].
///
/// With an empty template every source key passes through under its own
/// name. Otherwise the output schema is exactly the template's declared
/// columns, followed by the unmapped source columns when the template has
/// `catch_all` set.
#[derive(Debug, Clone, Default)]
pub struct TemplateMapper {
    template: Template,
}

impl TemplateMapper {
    /// Create a mapper for a template.
    pub fn new(template: Template) -> Self {
        Self { template }
    }

    /// The template in use.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Map one table.
    ///
    /// Columns are addressed by positional key (`col_1`, …) and, when
    /// `header` is set, also by header text; the header row itself is not
    /// emitted as a record.
    pub fn map_table(&self, table: &Table, header: bool) -> Mapped {
        let (headers, data) = match table.rows.split_first() {
            Some((first, rest)) if header => (Some(header_names(first)), rest),
            _ => (None, table.rows.as_slice()),
        };

        let names: Vec<String> = headers
            .clone()
            .unwrap_or_else(|| (0..table.column_count).map(positional_name).collect());

        let lookup = |key: &str| -> Option<usize> {
            if let Some(col) = headers
                .as_ref()
                .and_then(|h| h.iter().position(|name| name == key))
            {
                return Some(col);
            }
            (0..table.column_count).find(|&col| column_key(col) == key)
        };

        let rows: Vec<Vec<String>> = data.iter().map(TableRow::values).collect();
        self.remap(&names, rows, lookup, Some(table.page_index))
    }

    /// Group pattern matches into records.
    ///
    /// Matches fill one record in order; a record is closed when a name it
    /// already holds comes up again. `names` gives the pattern declaration
    /// order, which is the passthrough column order.
    pub fn map_matches(&self, names: &[String], matches: &[PatternMatch]) -> Mapped {
        let rows = sequential_fill(
            names,
            matches.iter().map(|m| (m.name.as_str(), m.value.as_str())),
        );
        self.remap(names, rows, |key| names.iter().position(|n| n == key), None)
    }

    /// Group form fields into records, with columns in first-seen name order.
    pub fn map_fields(&self, fields: &[FormField]) -> Mapped {
        let mut names: Vec<String> = Vec::new();
        for field in fields {
            if !names.contains(&field.name) {
                names.push(field.name.clone());
            }
        }
        let rows = sequential_fill(
            &names,
            fields.iter().map(|f| (f.name.as_str(), f.value.as_str())),
        );
        self.remap(&names, rows, |key| names.iter().position(|n| n == key), None)
    }

    fn remap(
        &self,
        names: &[String],
        rows: Vec<Vec<String>>,
        lookup: impl Fn(&str) -> Option<usize>,
        page_index: Option<usize>,
    ) -> Mapped {
        if self.template.is_empty() {
            return Mapped {
                batch: RecordBatch::from_rows(names.to_vec(), rows),
                warnings: Vec::new(),
            };
        }

        let mut warnings = Vec::new();
        let mut sources: Vec<Option<usize>> = Vec::new();
        let mut columns: Vec<String> = Vec::new();

        for (key, output) in &self.template.field_mappings {
            let source = lookup(key);
            if source.is_none() {
                let message = format!(
                    "template maps '{}' to '{}' but no such column was detected",
                    key, output
                );
                log::warn!("{}", message);
                warnings.push(Warning {
                    kind: WarningKind::TemplateMismatch,
                    page_index,
                    message,
                });
            }
            sources.push(source);
            columns.push(output.clone());
        }

        if self.template.catch_all {
            for (col, name) in names.iter().enumerate() {
                if !sources.contains(&Some(col)) {
                    sources.push(Some(col));
                    columns.push(name.clone());
                }
            }
            // declared names come first, so only catch-all names get suffixed
            columns = disambiguate(columns);
        }

        let mapped_rows = rows.into_iter().map(|values| {
            sources
                .iter()
                .map(|source| {
                    source
                        .and_then(|col| values.get(col).cloned())
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
        });

        Mapped {
            batch: RecordBatch::from_rows(columns, mapped_rows),
            warnings,
        }
    }
}

/// Fill records from `(name, value)` pairs, starting a new record whenever
/// a name repeats. Values are aligned with `names`.
fn sequential_fill<'a>(
    names: &[String],
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut current: Vec<Option<String>> = vec![None; names.len()];

    for (name, value) in pairs {
        let Some(col) = names.iter().position(|n| n == name) else {
            continue;
        };
        if current[col].is_some() {
            rows.push(std::mem::replace(&mut current, vec![None; names.len()]));
        }
        current[col] = Some(value.to_string());
    }
    if current.iter().any(Option::is_some) {
        rows.push(current);
    }

    rows.into_iter()
        .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
        .collect()
}
