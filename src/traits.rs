//! Traits for format-specific rendering and parsing in locwriter.

use std::{fmt::Debug, path::PathBuf};

use crate::{error::Error, formats::FormatType, options::CreateOptions, types::Records};

/// How a codec combines new records with the content of an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Entries only present in the existing file are dropped.
    Replace,
    /// Entries only present in the existing file are kept in place.
    PreserveExisting,
}

/// The prior content of a destination, read once per write.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Where the content was read from.
    pub path: PathBuf,
    /// Decoded text of the file.
    pub text: String,
    /// The entries parsed out of `text`.
    pub records: Records,
}

/// The format-specific half of a file creator.
///
/// A codec turns [`Records`] into the text grammar of one format and back.
/// Everything else (snapshot reading, merging, encoding, atomic commit) is
/// handled once by [`crate::creator::FileCreator`].
///
/// # Example
///
/// ```rust
/// use locwriter::formats::TextCodec;
/// use locwriter::traits::FormatCodec;
/// use locwriter::types::{Entry, Records};
/// use locwriter::CreateOptions;
///
/// let records: Records = vec![Entry::new("greeting", "Hello")].into_iter().collect();
/// let text = TextCodec.render(&records, None, &CreateOptions::default())?;
/// assert_eq!(text, "greeting=Hello\n");
/// assert_eq!(TextCodec.parse(&text)?, records);
/// # Ok::<(), locwriter::Error>(())
/// ```
pub trait FormatCodec: Debug + Send + Sync {
    /// The format this codec writes.
    fn format(&self) -> FormatType;

    /// How new records are combined with an existing file's entries.
    fn merge_policy(&self) -> MergePolicy;

    /// Render records as text, using `\n` line breaks.
    ///
    /// `snapshot` is the existing destination content, for codecs that keep
    /// non-entry content around (the records are already merged). `options`
    /// is there for formats that declare their own encoding.
    fn render(
        &self,
        records: &Records,
        snapshot: Option<&Snapshot>,
        options: &CreateOptions,
    ) -> Result<String, Error>;

    /// Parse text produced by this codec (or a compatible tool) back into records.
    fn parse(&self, content: &str) -> Result<Records, Error>;
}
