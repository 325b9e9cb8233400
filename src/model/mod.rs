//! Data model for page content and extraction output.
//!
//! Page primitives ([`TextFragment`], [`RulingLine`], [`FormField`]) come in
//! from a decoder, [`Table`] and [`Cell`] live only while one document is
//! processed, and [`ExtractionResult`] / [`BatchSummary`] are what callers
//! keep.

mod page;
mod record;
mod result;
mod table;
mod template;

pub use page::{BoundingBox, FormField, Orientation, PageContent, RulingLine, TextFragment};
pub use record::Record;
pub use result::{
    BatchSummary, DocumentOutcome, DocumentStats, ExtractionResult, Warning, WarningKind,
};
pub use table::{Cell, Table, TableRow};
pub use template::{column_key, positional_name, Template};
