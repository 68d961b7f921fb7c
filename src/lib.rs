//! Atomic, merge-aware writers for localization files.
//!
//! Build a [`Records`] model, pick a [`FormatType`] and hand both to a
//! [`FileCreator`] (usually through the [`registry()`] or [`create()`]).
//! Every format shares one pipeline: validate the entries, read and merge an
//! existing destination, render with the format's codec, encode, and commit
//! through a temporary file so the destination is never left half written.
//!
//! Supported formats are plain text, Apple `.strings` tables, RTF documents,
//! XML resource files and XML property lists.
//!
//! ```rust,no_run
//! use locwriter::{create, CreateOptions, Entry, FormatType, LineEnding, Records};
//!
//! let records: Records = vec![
//!     Entry::new("greeting", "Hello").with_comment("shown on launch"),
//!     Entry::new("farewell", "Bye"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let options = CreateOptions::new().with_line_ending(LineEnding::CrLf);
//! match create(FormatType::Text, &records, "en.txt", &options) {
//!     Ok(written) => println!("{} entries in {}", written.entries, written.path.display()),
//!     Err(e) => eprintln!("{:?} error: {} (keys: {:?})", e.kind(), e, e.rejected_keys),
//! }
//! ```

#![forbid(unsafe_code)]

pub mod atomic;
pub mod creator;
pub mod encoding;
pub mod error;
pub mod formats;
pub mod options;
pub mod registry;
pub mod traits;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    creator::{CreateError, FileCreator, WriteResult, Written},
    encoding::TextEncoding,
    error::{Error, ErrorKind},
    formats::FormatType,
    options::{CreateOptions, LineEnding, OverwriteStrategy},
    registry::{CreatorRegistry, create, registry},
    traits::{FormatCodec, MergePolicy},
    types::{Entry, Records},
};
