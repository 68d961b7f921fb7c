//! Support for plain-text localization files.
//!
//! Each entry is one `key=value` line, optionally preceded by `# comment` lines.
//! Values escape backslashes and line breaks (`\\`, `\n`, `\r`) so that every entry
//! stays on a single line. Plain text carries no structure that could hold unknown
//! content, so writing over an existing file drops entries that are not re-supplied.

use crate::{
    error::Error,
    formats::FormatType,
    options::CreateOptions,
    traits::{FormatCodec, MergePolicy, Snapshot},
    types::{Entry, Records},
};

const DELIMITER: char = '=';
const COMMENT_MARKER: char = '#';

/// Plain-text codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec;

impl FormatCodec for Codec {
    fn format(&self) -> FormatType {
        FormatType::Text
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Replace
    }

    fn render(
        &self,
        records: &Records,
        _snapshot: Option<&Snapshot>,
        _options: &CreateOptions,
    ) -> Result<String, Error> {
        let mut content = String::new();
        let mut rejected = Vec::new();
        let mut reason = String::new();

        for entry in &records.entries {
            match render_entry(entry) {
                Ok(lines) => content.push_str(&lines),
                Err(why) => {
                    if reason.is_empty() {
                        reason = why;
                    }
                    rejected.push(entry.key.clone());
                }
            }
        }

        if rejected.is_empty() {
            Ok(content)
        } else {
            Err(Error::Render {
                keys: rejected,
                reason,
            })
        }
    }

    fn parse(&self, content: &str) -> Result<Records, Error> {
        let content = content.replace("\r\n", "\n").replace('\r', "\n");
        let mut records = Records::new();
        let mut pending_comment: Vec<&str> = Vec::new();

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                pending_comment.clear();
                continue;
            }

            if let Some(comment) = line.strip_prefix(COMMENT_MARKER) {
                pending_comment.push(comment.strip_prefix(' ').unwrap_or(comment));
                continue;
            }

            let (key, value) = line.split_once(DELIMITER).ok_or_else(|| {
                Error::invalid_input(format!("line {}: expected `key=value`", index + 1))
            })?;

            let comment = if pending_comment.is_empty() {
                None
            } else {
                Some(pending_comment.join("\n"))
            };
            pending_comment.clear();

            records.push(Entry {
                key: key.to_string(),
                value: unescape(value),
                comment,
            });
        }

        Ok(records)
    }
}

fn render_entry(entry: &Entry) -> Result<String, String> {
    let mut lines = String::new();

    if let Some(comment) = &entry.comment {
        for line in comment.split('\n') {
            check_controls(line, "comment")?;
            if line.is_empty() {
                lines.push(COMMENT_MARKER);
            } else {
                lines.push(COMMENT_MARKER);
                lines.push(' ');
                lines.push_str(line);
            }
            lines.push('\n');
        }
    }

    if entry.key.contains(DELIMITER) {
        return Err(format!("key `{}` contains the `=` delimiter", entry.key));
    }
    if entry.key.starts_with(COMMENT_MARKER) {
        return Err(format!("key `{}` starts with the comment marker", entry.key));
    }
    if entry.key.contains(['\n', '\r']) {
        return Err("keys cannot contain line breaks".to_string());
    }
    check_controls(&entry.key, "key")?;

    let value = escape(&entry.value)?;
    lines.push_str(&entry.key);
    lines.push(DELIMITER);
    lines.push_str(&value);
    lines.push('\n');
    Ok(lines)
}

/// Rejects control characters other than tab (and the line breaks handled elsewhere).
fn check_controls(text: &str, what: &str) -> Result<(), String> {
    match text
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        Some(c) => Err(format!(
            "{} contains control character U+{:04X}",
            what, c as u32
        )),
        None if what == "comment" && text.contains('\r') => {
            Err("comments cannot contain carriage returns".to_string())
        }
        None => Ok(()),
    }
}

fn escape(value: &str) -> Result<String, String> {
    check_controls(value, "value")?;
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            '\n' => escaped.push_str(r"\n"),
            '\r' => escaped.push_str(r"\r"),
            c => escaped.push(c),
        }
    }
    Ok(escaped)
}

fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => result.push('\\'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}
