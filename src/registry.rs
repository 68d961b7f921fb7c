//! Mapping from [`FormatType`] to the [`FileCreator`] that writes it.

use std::{collections::HashMap, path::Path, str::FromStr, sync::Arc};

use lazy_static::lazy_static;

use crate::{
    creator::{CreateError, FileCreator, WriteResult},
    error::Error,
    formats::FormatType,
    options::CreateOptions,
    types::Records,
};

lazy_static! {
    static ref DEFAULT_REGISTRY: CreatorRegistry = CreatorRegistry::with_defaults();
}

/// The process-wide registry holding the built-in creator of every format.
pub fn registry() -> &'static CreatorRegistry {
    &DEFAULT_REGISTRY
}

/// Writes `records` in `format` through the default registry.
///
/// # Example
///
/// ```rust,no_run
/// use locwriter::{create, CreateOptions, Entry, FormatType, Records};
///
/// let records: Records = vec![Entry::new("greeting", "Hello")].into_iter().collect();
/// let written = create(
///     FormatType::StringsTable,
///     &records,
///     "en.lproj/Localizable.strings",
///     &CreateOptions::default(),
/// )?;
/// println!("wrote {} bytes to {}", written.bytes, written.path.display());
/// # Ok::<(), locwriter::CreateError>(())
/// ```
pub fn create<P: AsRef<Path>>(
    format: FormatType,
    records: &Records,
    destination: P,
    options: &CreateOptions,
) -> WriteResult {
    registry().create(format, records, destination, options)
}

/// Creators keyed by the format they write.
///
/// A registry is filled once and then only read, so it can be shared freely
/// between threads.
#[derive(Debug, Clone, Default)]
pub struct CreatorRegistry {
    creators: HashMap<FormatType, Arc<FileCreator>>,
}

impl CreatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in creator of every [`FormatType`].
    pub fn with_defaults() -> Self {
        let mut registry = CreatorRegistry::new();
        for format in FormatType::ALL {
            registry.register(FileCreator::for_format(format));
        }
        registry
    }

    /// Adds `creator` under its own format, returning the creator it replaces.
    pub fn register(&mut self, creator: FileCreator) -> Option<Arc<FileCreator>> {
        self.creators.insert(creator.format(), Arc::new(creator))
    }

    /// The creator for `format`.
    pub fn resolve(&self, format: FormatType) -> Result<Arc<FileCreator>, Error> {
        self.creators
            .get(&format)
            .cloned()
            .ok_or_else(|| Error::UnsupportedFormat(format.to_string()))
    }

    /// The creator for a format name or file extension, e.g. `"strings"` or `"xml"`.
    pub fn resolve_name(&self, name: &str) -> Result<Arc<FileCreator>, Error> {
        self.resolve(FormatType::from_str(name)?)
    }

    /// The creator for the extension of `path`.
    pub fn resolve_path<P: AsRef<Path>>(&self, path: P) -> Result<Arc<FileCreator>, Error> {
        let path = path.as_ref();
        let format = FormatType::from_path(path).ok_or_else(|| {
            Error::UnsupportedFormat(format!("no format for `{}`", path.display()))
        })?;
        self.resolve(format)
    }

    /// Registered formats, in [`FormatType::ALL`] order.
    pub fn formats(&self) -> Vec<FormatType> {
        FormatType::ALL
            .into_iter()
            .filter(|format| self.creators.contains_key(format))
            .collect()
    }

    /// Resolves `format` and writes `records` with it.
    ///
    /// An unregistered format fails with [`Error::UnsupportedFormat`] before
    /// anything is read or written.
    pub fn create<P: AsRef<Path>>(
        &self,
        format: FormatType,
        records: &Records,
        destination: P,
        options: &CreateOptions,
    ) -> WriteResult {
        let destination = destination.as_ref();
        let creator = self
            .resolve(format)
            .map_err(|e| CreateError::new(destination, e))?;
        creator.create(records, destination, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, types::Entry};

    #[test]
    fn test_defaults_cover_every_format() {
        let registry = CreatorRegistry::with_defaults();
        assert_eq!(registry.formats(), FormatType::ALL.to_vec());
        for format in FormatType::ALL {
            assert_eq!(registry.resolve(format).unwrap().format(), format);
        }
    }

    #[test]
    fn test_resolve_unregistered_format() {
        let mut registry = CreatorRegistry::new();
        registry.register(FileCreator::for_format(FormatType::Text));
        assert_eq!(registry.formats(), vec![FormatType::Text]);

        let err = registry.resolve(FormatType::Markup).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_resolve_name_and_path() {
        let registry = registry();
        assert_eq!(
            registry.resolve_name("strings").unwrap().format(),
            FormatType::StringsTable
        );
        assert_eq!(
            registry.resolve_path("res/values-de/strings.xml").unwrap().format(),
            FormatType::Markup
        );
        assert_eq!(
            registry.resolve_path("Info.PLIST").unwrap().format(),
            FormatType::PropertyList
        );
        assert_eq!(
            registry.resolve_name("docx").unwrap_err().kind(),
            ErrorKind::UnsupportedFormat
        );
        assert_eq!(
            registry.resolve_path("README").unwrap_err().kind(),
            ErrorKind::UnsupportedFormat
        );
    }

    #[test]
    fn test_register_replaces_creator() {
        let mut registry = CreatorRegistry::with_defaults();
        let replaced = registry.register(FileCreator::for_format(FormatType::RichText));
        assert_eq!(replaced.unwrap().format(), FormatType::RichText);
        assert_eq!(registry.formats().len(), FormatType::ALL.len());
    }

    #[test]
    fn test_create_with_unregistered_format_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.xml");
        let records: Records = vec![Entry::new("a", "1")].into_iter().collect();

        let err = CreatorRegistry::new()
            .create(FormatType::Markup, &records, &path, &CreateOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(err.path, path);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CreatorRegistry>();
    }
}
