//! All supported localization file formats for locwriter.
//!
//! This module re-exports the codec for each format and provides
//! the [`FormatType`] enum used to select one.

pub mod markup;
pub mod plist;
pub mod rtf;
pub mod strings;
pub mod text;

use std::{
    fmt::{Display, Formatter},
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

// Reexporting the codecs for easier access
pub use markup::Codec as MarkupCodec;
pub use plist::Codec as PropertyListCodec;
pub use rtf::Codec as RichTextCodec;
pub use strings::Codec as StringsTableCodec;
pub use text::Codec as TextCodec;

use crate::Error;

/// Identifies one output format.
///
/// The format selects the codec as well as the output conventions (file extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatType {
    /// Plain text, one `key=value` line per entry.
    Text,
    /// Apple-style `.strings` table.
    StringsTable,
    /// Rich text (RTF) document.
    RichText,
    /// XML resource file.
    Markup,
    /// XML property list.
    PropertyList,
}

impl FormatType {
    /// Every format, in registration order.
    pub const ALL: [FormatType; 5] = [
        FormatType::Text,
        FormatType::StringsTable,
        FormatType::RichText,
        FormatType::Markup,
        FormatType::PropertyList,
    ];

    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Text => "txt",
            FormatType::StringsTable => "strings",
            FormatType::RichText => "rtf",
            FormatType::Markup => "xml",
            FormatType::PropertyList => "plist",
        }
    }

    /// Infers a format from a file path's extension (case-insensitive).
    ///
    /// # Example
    /// ```rust
    /// use locwriter::formats::FormatType;
    /// assert_eq!(FormatType::from_path("en.lproj/InfoPlist.strings"), Some(FormatType::StringsTable));
    /// assert_eq!(FormatType::from_path("Readme.TXT"), Some(FormatType::Text));
    /// assert_eq!(FormatType::from_path("image.png"), None);
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<FormatType> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        FormatType::ALL
            .into_iter()
            .find(|format| format.extension() == extension)
    }
}

/// Implements [`std::fmt::Display`] for [`FormatType`].
///
/// # Example
/// ```rust
/// use locwriter::formats::FormatType;
/// assert_eq!(FormatType::Text.to_string(), "text");
/// assert_eq!(FormatType::PropertyList.to_string(), "plist");
/// ```
impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatType::Text => write!(f, "text"),
            FormatType::StringsTable => write!(f, "strings"),
            FormatType::RichText => write!(f, "rtf"),
            FormatType::Markup => write!(f, "xml"),
            FormatType::PropertyList => write!(f, "plist"),
        }
    }
}

/// Accepts format names and extensions, case-insensitive.
///
/// Returns [`crate::error::Error::UnsupportedFormat`] for unknown strings.
impl FromStr for FormatType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('.').to_ascii_lowercase();
        match s.as_str() {
            "text" | "txt" | "plain" => Ok(FormatType::Text),
            "strings" | "stringstable" | "string-table" => Ok(FormatType::StringsTable),
            "rtf" | "richtext" | "rich-text" => Ok(FormatType::RichText),
            "xml" | "markup" => Ok(FormatType::Markup),
            "plist" | "propertylist" | "property-list" => Ok(FormatType::PropertyList),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}
