//! The write pipeline shared by every format.
//!
//! A [`FileCreator`] wraps one [`FormatCodec`] and owns everything that is not
//! format specific: validation, reading the existing destination, merging,
//! encoding and the atomic commit.

use std::{
    borrow::Cow,
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use encoding_rs_io::DecodeReaderBytesBuilder;
use tracing::{debug, info, warn};

use crate::{
    atomic::StagedWrite,
    encoding::TextEncoding,
    error::{Error, ErrorKind},
    formats::{
        FormatType, MarkupCodec, PropertyListCodec, RichTextCodec, StringsTableCodec, TextCodec,
    },
    options::{CreateOptions, OverwriteStrategy},
    traits::{FormatCodec, Snapshot},
    types::Records,
};

/// Writes [`Records`] to disk in one format.
///
/// Creators are immutable and cheap to clone; one instance can serve any
/// number of concurrent `create` calls on distinct paths.
///
/// # Example
///
/// ```rust,no_run
/// use locwriter::{CreateOptions, Entry, FileCreator, FormatType, Records};
///
/// let records: Records = vec![
///     Entry::new("greeting", "Hello").with_comment("shown on launch"),
///     Entry::new("farewell", "Bye"),
/// ]
/// .into_iter()
/// .collect();
///
/// let creator = FileCreator::for_format(FormatType::Text);
/// let written = creator.create(&records, "en.txt", &CreateOptions::default())?;
/// assert_eq!(written.entries, 2);
/// # Ok::<(), locwriter::CreateError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCreator {
    codec: Arc<dyn FormatCodec>,
}

/// A successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    /// The destination that now holds the new content.
    pub path: PathBuf,
    pub format: FormatType,
    /// Number of entries in the written file, after merging.
    pub entries: usize,
    /// Size of the written file.
    pub bytes: usize,
    /// Whether an existing file was merged into the output.
    pub merged: bool,
}

/// A failed write. The destination is left as it was.
#[derive(Debug, thiserror::Error)]
#[error("cannot write `{}`: {error}", path.display())]
pub struct CreateError {
    /// The destination the write was aimed at.
    pub path: PathBuf,
    #[source]
    pub error: Error,
    /// Entries that could not be rendered or encoded, if the failure was about entries.
    pub rejected_keys: Vec<String>,
}

/// Outcome of one `create` call.
pub type WriteResult = Result<Written, CreateError>;

impl CreateError {
    pub fn new(path: impl Into<PathBuf>, error: Error) -> Self {
        CreateError {
            path: path.into(),
            rejected_keys: error.keys().to_vec(),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl FileCreator {
    /// Creates a file creator around a codec.
    pub fn new<C: FormatCodec + 'static>(codec: C) -> Self {
        FileCreator {
            codec: Arc::new(codec),
        }
    }

    /// The built-in creator for `format`.
    pub fn for_format(format: FormatType) -> Self {
        match format {
            FormatType::Text => FileCreator::new(TextCodec),
            FormatType::StringsTable => FileCreator::new(StringsTableCodec),
            FormatType::RichText => FileCreator::new(RichTextCodec),
            FormatType::Markup => FileCreator::new(MarkupCodec),
            FormatType::PropertyList => FileCreator::new(PropertyListCodec),
        }
    }

    pub fn format(&self) -> FormatType {
        self.codec.format()
    }

    pub fn codec(&self) -> &dyn FormatCodec {
        self.codec.as_ref()
    }

    /// Writes `records` to `destination`.
    ///
    /// With [`OverwriteStrategy::MergeWithExisting`] an existing destination is
    /// read first and merged according to the codec's merge policy. A missing
    /// (or empty) destination is not an error. The output is committed with a
    /// temporary-file rename, so on failure the destination is untouched.
    pub fn create<P: AsRef<Path>>(
        &self,
        records: &Records,
        destination: P,
        options: &CreateOptions,
    ) -> WriteResult {
        let destination = destination.as_ref();
        match self.try_create(records, destination, options) {
            Ok(written) => {
                info!(
                    path = %written.path.display(),
                    format = %written.format,
                    entries = written.entries,
                    bytes = written.bytes,
                    merged = written.merged,
                    "wrote localization file"
                );
                Ok(written)
            }
            Err(error) => {
                warn!(
                    path = %destination.display(),
                    format = %self.format(),
                    kind = ?error.kind(),
                    "failed to write localization file: {}",
                    error
                );
                Err(CreateError::new(destination, error))
            }
        }
    }

    fn try_create(
        &self,
        records: &Records,
        destination: &Path,
        options: &CreateOptions,
    ) -> Result<Written, Error> {
        records.validate()?;

        let snapshot = match options.overwrite_strategy {
            OverwriteStrategy::ReplaceAll => None,
            OverwriteStrategy::MergeWithExisting => {
                self.read_snapshot(destination, options.encoding)?
            }
        };

        let merged = self.merge(records, snapshot.as_ref());
        let bytes = self.encode(&merged, snapshot.as_ref(), options)?;

        let path = StagedWrite::stage(destination, &bytes)?.commit()?;

        Ok(Written {
            path,
            format: self.format(),
            entries: merged.len(),
            bytes: bytes.len(),
            merged: snapshot.is_some(),
        })
    }

    /// Validates, merges and encodes `records` without touching the filesystem.
    pub fn render_to_bytes(
        &self,
        records: &Records,
        snapshot: Option<&Snapshot>,
        options: &CreateOptions,
    ) -> Result<Vec<u8>, Error> {
        records.validate()?;
        let merged = self.merge(records, snapshot);
        self.encode(&merged, snapshot, options)
    }

    fn merge<'a>(&self, records: &'a Records, snapshot: Option<&Snapshot>) -> Cow<'a, Records> {
        match snapshot {
            Some(snapshot) => {
                let policy = self.codec.merge_policy();
                let merged = records.merged_over(&snapshot.records, policy);
                debug!(
                    ?policy,
                    existing = snapshot.records.len(),
                    incoming = records.len(),
                    merged = merged.len(),
                    "merged with existing file"
                );
                Cow::Owned(merged)
            }
            None => Cow::Borrowed(records),
        }
    }

    fn encode(
        &self,
        records: &Records,
        snapshot: Option<&Snapshot>,
        options: &CreateOptions,
    ) -> Result<Vec<u8>, Error> {
        let rendered = self.codec.render(records, snapshot, options)?;
        let rendered = options.line_ending.apply(rendered);

        options.encoding.encode(&rendered).ok_or_else(|| Error::Encoding {
            encoding: options.encoding.label().to_string(),
            keys: unencodable_keys(records, options.encoding),
        })
    }

    /// Reads the destination as it is before the write.
    ///
    /// Returns `Ok(None)` if there is no file or it holds only whitespace.
    pub fn read_snapshot<P: AsRef<Path>>(
        &self,
        path: P,
        encoding: TextEncoding,
    ) -> Result<Option<Snapshot>, Error> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no existing file");
                return Ok(None);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let text = encoding
            .decode_strict(&bytes)
            .ok_or_else(|| Error::CorruptSnapshot {
                path: path.to_path_buf(),
                reason: format!("content is not valid {}", encoding),
            })?;

        if text.trim().is_empty() {
            debug!(path = %path.display(), "existing file is empty");
            return Ok(None);
        }

        let records = self
            .codec
            .parse(&text)
            .map_err(|e| Error::CorruptSnapshot {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        debug!(
            path = %path.display(),
            entries = records.len(),
            "read existing file"
        );

        Ok(Some(Snapshot {
            path: path.to_path_buf(),
            text,
            records,
        }))
    }

    /// Reads a file written in this creator's format.
    ///
    /// A byte order mark overrides `encoding`. Malformed sequences are
    /// replaced rather than rejected.
    pub fn read<P: AsRef<Path>>(&self, path: P, encoding: TextEncoding) -> Result<Records, Error> {
        let file = File::open(path)?;
        let mut decoder = DecodeReaderBytesBuilder::new()
            .encoding(Some(encoding.as_encoding()))
            .bom_override(true)
            .build(file);

        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded)?;
        self.codec.parse(&decoded)
    }
}

fn unencodable_keys(records: &Records, encoding: TextEncoding) -> Vec<String> {
    records
        .entries
        .iter()
        .filter(|entry| {
            !encoding.can_encode(&entry.key)
                || !encoding.can_encode(&entry.value)
                || entry
                    .comment
                    .as_deref()
                    .is_some_and(|comment| !encoding.can_encode(comment))
        })
        .map(|entry| entry.key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{options::LineEnding, types::Entry};

    fn sample() -> Records {
        vec![
            Entry::new("greeting", "Hello").with_comment("shown on launch"),
            Entry::new("farewell", "Bye"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_create_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.txt");
        let written = FileCreator::for_format(FormatType::Text)
            .create(&sample(), &path, &CreateOptions::default())
            .unwrap();

        let content = "# shown on launch\ngreeting=Hello\nfarewell=Bye\n";
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
        assert_eq!(
            written,
            Written {
                path,
                format: FormatType::Text,
                entries: 2,
                bytes: content.len(),
                merged: false,
            }
        );
    }

    #[test]
    fn test_render_to_bytes_applies_line_ending_and_encoding() {
        let options = CreateOptions::new()
            .with_encoding(TextEncoding::Utf16Le)
            .with_line_ending(LineEnding::CrLf);
        let bytes = FileCreator::for_format(FormatType::Text)
            .render_to_bytes(&sample(), None, &options)
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
        let text = TextEncoding::Utf16Le.decode_strict(&bytes).unwrap();
        assert_eq!(text, "# shown on launch\r\ngreeting=Hello\r\nfarewell=Bye\r\n");
    }

    #[test]
    fn test_encoding_error_names_keys() {
        let records: Records = vec![
            Entry::new("plain", "ok"),
            Entry::new("snowman", "☃"),
            Entry::new("note", "ok").with_comment("✓ reviewed"),
        ]
        .into_iter()
        .collect();
        let options = CreateOptions::new()
            .with_encoding(TextEncoding::from_label("windows-1252").unwrap());
        let err = FileCreator::for_format(FormatType::Text)
            .render_to_bytes(&records, None, &options)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert_eq!(err.keys(), ["snowman", "note"].map(String::from));
    }

    #[test]
    fn test_read_snapshot_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let creator = FileCreator::for_format(FormatType::RichText);
        let path = dir.path().join("en.rtf");
        assert!(creator.read_snapshot(&path, TextEncoding::Utf8).unwrap().is_none());

        fs::write(&path, "\n").unwrap();
        assert!(creator.read_snapshot(&path, TextEncoding::Utf8).unwrap().is_none());
    }

    #[test]
    fn test_read_snapshot_rejects_malformed_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.txt");
        fs::write(&path, [b'a', b'=', 0xFF, b'\n']).unwrap();
        let err = FileCreator::for_format(FormatType::Text)
            .read_snapshot(&path, TextEncoding::Utf8)
            .unwrap_err();
        assert!(matches!(err, Error::CorruptSnapshot { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_create_error_carries_path_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.txt");
        let records: Records = vec![Entry::new("a=b", "x")].into_iter().collect();
        let err = FileCreator::for_format(FormatType::Text)
            .create(&records, &path, &CreateOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
        assert_eq!(err.path, path);
        assert_eq!(err.rejected_keys, vec!["a=b".to_string()]);
        assert!(err.to_string().contains("en.txt"));
        assert!(!path.exists());
    }

    #[test]
    fn test_read_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.txt");
        let options = CreateOptions::new().with_encoding(TextEncoding::Utf16Be);
        let creator = FileCreator::for_format(FormatType::Text);
        creator.create(&sample(), &path, &options).unwrap();

        // The byte order mark wins over the encoding passed in
        assert_eq!(creator.read(&path, TextEncoding::Utf8).unwrap(), sample());
    }

    #[test]
    fn test_creator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileCreator>();
        assert_send_sync::<CreateError>();
    }
}
