//! Text encodings for rendered output and existing-file snapshots.
//!
//! Unicode encodings are handled directly; everything else goes through `encoding_rs`.

use std::fmt::{Display, Formatter};

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The byte encoding a creator writes.
///
/// UTF-16 output always starts with a byte order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// UTF-8 preceded by `EF BB BF`.
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// Any other encoding `encoding_rs` can produce (e.g. `windows-1252`, `Shift_JIS`).
    Other(&'static Encoding),
}

impl TextEncoding {
    /// Resolves a WHATWG encoding label, plus `utf-8-bom` for [`TextEncoding::Utf8Bom`].
    ///
    /// # Example
    /// ```rust
    /// use locwriter::encoding::TextEncoding;
    /// assert_eq!(TextEncoding::from_label("UTF-8").unwrap(), TextEncoding::Utf8);
    /// assert_eq!(TextEncoding::from_label("utf-16").unwrap(), TextEncoding::Utf16Le);
    /// assert_eq!(TextEncoding::from_label("latin1").unwrap().label(), "windows-1252");
    /// assert!(TextEncoding::from_label("klingon").is_err());
    /// ```
    pub fn from_label(label: &str) -> Result<Self, Error> {
        let label = label.trim().to_ascii_lowercase();
        if matches!(label.as_str(), "utf-8-bom" | "utf8-bom" | "utf-8-sig") {
            return Ok(TextEncoding::Utf8Bom);
        }

        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| Error::invalid_input(format!("unknown encoding `{}`", label)))?;

        if encoding == UTF_8 {
            Ok(TextEncoding::Utf8)
        } else if encoding == UTF_16LE {
            Ok(TextEncoding::Utf16Le)
        } else if encoding == UTF_16BE {
            Ok(TextEncoding::Utf16Be)
        } else if encoding.output_encoding() != encoding {
            Err(Error::invalid_input(format!(
                "encoding `{}` cannot be used for output",
                encoding.name()
            )))
        } else {
            Ok(TextEncoding::Other(encoding))
        }
    }

    /// The canonical label of this encoding.
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Bom => "utf-8-bom",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Other(encoding) => encoding.name(),
        }
    }

    /// The `encoding_rs` encoding used to decode files written with this encoding.
    pub fn as_encoding(&self) -> &'static Encoding {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => UTF_8,
            TextEncoding::Utf16Le => UTF_16LE,
            TextEncoding::Utf16Be => UTF_16BE,
            TextEncoding::Other(encoding) => encoding,
        }
    }

    fn bom(&self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8Bom => &[0xEF, 0xBB, 0xBF],
            TextEncoding::Utf16Le => &[0xFF, 0xFE],
            TextEncoding::Utf16Be => &[0xFE, 0xFF],
            TextEncoding::Utf8 | TextEncoding::Other(_) => &[],
        }
    }

    /// Returns `true` if every character of `text` is representable.
    pub fn can_encode(&self, text: &str) -> bool {
        match self {
            TextEncoding::Other(encoding) => !encoding.encode(text).2,
            _ => true,
        }
    }

    /// Encodes `text`, or returns `None` if it contains unrepresentable characters.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        let mut bytes = self.bom().to_vec();
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => bytes.extend_from_slice(text.as_bytes()),
            TextEncoding::Utf16Le => {
                bytes.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_le_bytes());
                }
            }
            TextEncoding::Utf16Be => {
                bytes.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_be_bytes());
                }
            }
            TextEncoding::Other(encoding) => {
                let (encoded, _, had_errors) = encoding.encode(text);
                if had_errors {
                    return None;
                }
                bytes.extend_from_slice(&encoded);
            }
        }
        Some(bytes)
    }

    /// Decodes `bytes` without replacing malformed sequences.
    ///
    /// A byte order mark wins over this encoding. Returns `None` if the bytes
    /// are not valid in the detected encoding.
    pub fn decode_strict(&self, bytes: &[u8]) -> Option<String> {
        let (encoding, body) = match Encoding::for_bom(bytes) {
            Some((encoding, bom_length)) => (encoding, &bytes[bom_length..]),
            None => (self.as_encoding(), bytes),
        };
        encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .map(|text| text.into_owned())
    }
}

impl Display for TextEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TextEncoding::from_label(&value)
    }
}

impl From<TextEncoding> for String {
    fn from(value: TextEncoding) -> Self {
        value.label().to_string()
    }
}
