//! Output templates.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Caller-declared mapping from detected structure to output columns.
///
/// Keys are source keys: a positional column key (`col_1`, `col_2`, …),
/// a header text when header rows are enabled, a pattern name, or a form
/// field name. Values are output column names. Declaration order is the
/// output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Ordered source-key → output-column mappings
    #[serde(default)]
    pub field_mappings: IndexMap<String, String>,

    /// Keep unmapped columns after the declared ones
    #[serde(default)]
    pub catch_all: bool,
}

impl Template {
    /// Create an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping and return self.
    pub fn map(mut self, source: impl Into<String>, output: impl Into<String>) -> Self {
        self.field_mappings.insert(source.into(), output.into());
        self
    }

    /// Enable or disable the catch-all and return self.
    pub fn with_catch_all(mut self, catch_all: bool) -> Self {
        self.catch_all = catch_all;
        self
    }

    /// Declared output columns, in order.
    pub fn output_columns(&self) -> Vec<String> {
        self.field_mappings.values().cloned().collect()
    }

    /// Check if the template declares no mappings.
    pub fn is_empty(&self) -> bool {
        self.field_mappings.is_empty()
    }

    /// Check that output names are non-empty and unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for (source, output) in &self.field_mappings {
            if source.trim().is_empty() {
                return Err(Error::InvalidTemplate("empty source key".to_string()));
            }
            if output.trim().is_empty() {
                return Err(Error::InvalidTemplate(format!(
                    "mapping for '{}' has an empty output column",
                    source
                )));
            }
            if !seen.insert(output.as_str()) {
                return Err(Error::InvalidTemplate(format!(
                    "output column '{}' is declared more than once",
                    output
                )));
            }
        }
        Ok(())
    }
}

/// Positional key of a 0-based column index (`col_1` for column 0).
pub fn column_key(col: usize) -> String {
    format!("col_{}", col + 1)
}

/// Positional output name of a 0-based column index (`column_1` for column 0).
pub fn positional_name(col: usize) -> String {
    format!("column_{}", col + 1)
}
