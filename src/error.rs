//! All error types for the locwriter crate.
//!
//! These are returned from all fallible operations (validation, rendering, encoding, writing, etc.).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot encode entries {keys:?} as {encoding}")]
    Encoding { encoding: String, keys: Vec<String> },

    #[error("cannot render entries {keys:?}: {reason}")]
    Render { keys: Vec<String>, reason: String },

    #[error("existing file `{}` cannot be merged: {reason}", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The coarse error taxonomy surfaced to orchestration code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No creator is registered for the requested format.
    UnsupportedFormat,
    /// Duplicate keys or structurally invalid entries.
    InvalidInput,
    /// A value cannot be represented in the configured encoding.
    Encoding,
    /// A codec-specific grammar violation.
    Render,
    /// Unwritable destination, unreadable snapshot, or failed commit.
    Io,
}

impl Error {
    /// Creates a new render error for one entry.
    pub fn render_error(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Render {
            keys: vec![key.into()],
            reason: reason.into(),
        }
    }

    /// Creates a new invalid-input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::InvalidInput(_) | Error::Parse(_) => ErrorKind::InvalidInput,
            Error::Encoding { .. } => ErrorKind::Encoding,
            Error::Render { .. } => ErrorKind::Render,
            Error::CorruptSnapshot { .. } | Error::Io(_) | Error::XmlParse(_) => ErrorKind::Io,
        }
    }

    /// Keys of the entries this error is about, if any.
    pub fn keys(&self) -> &[String] {
        match self {
            Error::Encoding { keys, .. } | Error::Render { keys, .. } => keys,
            _ => &[],
        }
    }
}
