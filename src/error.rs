//! Error types for pdfrows.

use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for pdfrows operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during extraction.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source document could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The source document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Text recognition failed.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// A text pattern failed to compile.
    #[error("Invalid pattern '{name}': {source}")]
    InvalidPattern {
        /// Pattern name
        name: String,
        /// Regex compilation error
        #[source]
        source: regex::Error,
    },

    /// The template is malformed.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// An option value is out of range.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// The per-document time budget was exceeded.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Processing was cancelled.
    #[error("Cancelled")]
    Cancelled,

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

/// Document-level failure recorded in an extraction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unreadable, corrupt, encrypted or empty input
    Decode(String),
    /// Recognition failure that left the document without any result
    Ocr(String),
    /// Pattern, template or option misconfiguration
    Configuration(String),
    /// Per-document time budget exceeded
    Timeout,
    /// Batch cancelled before the document finished
    Cancelled,
    /// The document's worker panicked
    Internal(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Decode(msg) => write!(f, "decode error: {}", msg),
            ErrorKind::Ocr(msg) => write!(f, "OCR error: {}", msg),
            ErrorKind::Configuration(msg) => write!(f, "configuration error: {}", msg),
            ErrorKind::Timeout => f.write_str("timed out"),
            ErrorKind::Cancelled => f.write_str("cancelled"),
            ErrorKind::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl From<&Error> for ErrorKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::Io(_)
            | Error::Json(_)
            | Error::Decode(_)
            | Error::Encrypted
            | Error::PageOutOfRange(..) => ErrorKind::Decode(err.to_string()),
            Error::Ocr(msg) => ErrorKind::Ocr(msg.clone()),
            Error::InvalidPattern { .. }
            | Error::InvalidTemplate(_)
            | Error::InvalidPageRange(_)
            | Error::InvalidOption(_) => ErrorKind::Configuration(err.to_string()),
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Other(msg) => ErrorKind::Internal(msg.clone()),
        }
    }
}

impl From<Error> for ErrorKind {
    fn from(err: Error) -> Self {
        ErrorKind::from(&err)
    }
}
