//! Per-write configuration for [`crate::FileCreator`].

use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{encoding::TextEncoding, error::Error};

/// The line terminator written between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    Cr,
    /// CRLF on Windows, LF elsewhere.
    Native,
}

impl LineEnding {
    /// Every line ending convention.
    pub const ALL: [LineEnding; 4] = [
        LineEnding::Lf,
        LineEnding::CrLf,
        LineEnding::Cr,
        LineEnding::Native,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
            LineEnding::Native if cfg!(windows) => "\r\n",
            LineEnding::Native => "\n",
        }
    }

    /// Rewrites the `\n` breaks of rendered output with this terminator.
    pub fn apply(&self, rendered: String) -> String {
        match self.as_str() {
            "\n" => rendered,
            terminator => rendered.replace('\n', terminator),
        }
    }
}

/// Whether an existing destination file is consulted before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteStrategy {
    /// Ignore any existing file; output contains exactly the given records.
    ReplaceAll,
    /// Read the existing file and merge according to the codec's merge policy.
    #[default]
    MergeWithExisting,
}

/// Options for one `create` call.
///
/// # Example
///
/// ```rust
/// use locwriter::{CreateOptions, LineEnding, OverwriteStrategy, TextEncoding};
///
/// let options = CreateOptions::from_json_str(
///     r#"{ "encoding": "utf-16le", "line_ending": "cr_lf" }"#,
/// )?;
/// assert_eq!(options.encoding, TextEncoding::Utf16Le);
/// assert_eq!(options.line_ending, LineEnding::CrLf);
/// assert_eq!(options.overwrite_strategy, OverwriteStrategy::MergeWithExisting);
/// # Ok::<(), locwriter::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CreateOptions {
    /// Output text encoding (default UTF-8).
    pub encoding: TextEncoding,
    /// Line terminator convention (default LF).
    pub line_ending: LineEnding,
    /// Replace or merge with an existing destination (default merge).
    pub overwrite_strategy: OverwriteStrategy,
}

impl CreateOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output encoding.
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the line terminator.
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Sets the overwrite strategy.
    pub fn with_overwrite_strategy(mut self, overwrite_strategy: OverwriteStrategy) -> Self {
        self.overwrite_strategy = overwrite_strategy;
        self
    }

    /// Parses options from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::Parse)
    }

    /// Loads options from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path).map_err(Error::Io)?);
        serde_json::from_reader(reader).map_err(Error::Parse)
    }
}
