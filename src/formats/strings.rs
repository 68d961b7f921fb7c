//! Support for Apple-style `.strings` tables.
//!
//! Provides rendering and parsing of `"key" = "value";` pairs with `/* comment */`
//! annotations. An optional `//: Language: xx` header line carries the language.
//! Entries already in the destination that are not re-supplied are kept.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::Error,
    formats::FormatType,
    options::CreateOptions,
    traits::{FormatCodec, MergePolicy, Snapshot},
    types::{Entry, Records},
};

lazy_static! {
    // "key" = "value"; with an optional trailing comment
    static ref PAIR_REGEX: Regex = Regex::new(
        r#"^"((?:[^"\\]|\\.)*)"\s*=\s*"((?:[^"\\]|\\.)*)"\s*;\s*(?://.*|/\*.*\*/)?$"#
    )
    .unwrap();
    // //: Name: value
    static ref HEADER_REGEX: Regex = Regex::new(r"^//:\s*([^:]+?)\s*:\s*(.*?)\s*$").unwrap();
}

/// String-table codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec;

impl FormatCodec for Codec {
    fn format(&self) -> FormatType {
        FormatType::StringsTable
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::PreserveExisting
    }

    fn render(
        &self,
        records: &Records,
        _snapshot: Option<&Snapshot>,
        _options: &CreateOptions,
    ) -> Result<String, Error> {
        let mut content = String::new();

        if let Some(language) = &records.language {
            content.push_str(&format!("//: Language: {}\n\n", language));
        }

        let mut rejected = Vec::new();
        for entry in &records.entries {
            match &entry.comment {
                Some(comment) if comment.contains("*/") || comment.contains('\r') => {
                    rejected.push(entry.key.clone());
                    continue;
                }
                Some(comment) => content.push_str(&format!("/* {} */\n", comment)),
                None => {}
            }
            content.push_str(&format!(
                "\"{}\" = \"{}\";\n\n",
                escape(&entry.key),
                escape(&entry.value)
            ));
        }

        if !rejected.is_empty() {
            return Err(Error::Render {
                keys: rejected,
                reason: "comments cannot contain `*/` or carriage returns".to_string(),
            });
        }

        // Drop the separator after the last pair
        if content.ends_with("\n\n") {
            content.pop();
        }
        Ok(content)
    }

    fn parse(&self, content: &str) -> Result<Records, Error> {
        let content = content.replace("\r\n", "\n").replace('\r', "\n");
        let mut header = HashMap::<String, String>::new();
        let mut entries = Vec::new();
        let mut last_comment: Option<String> = None;
        let mut open_comment: Option<Vec<&str>> = None;

        for (index, line) in content.lines().enumerate() {
            if let Some(mut parts) = open_comment.take() {
                match line.find("*/") {
                    Some(end) => {
                        parts.push(&line[..end]);
                        last_comment = Some(strip_block_padding(&parts.join("\n")));
                    }
                    None => {
                        parts.push(line);
                        open_comment = Some(parts);
                    }
                }
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(captures) = HEADER_REGEX.captures(trimmed) {
                header.insert(captures[1].to_string(), captures[2].to_string());
            } else if let Some(comment) = trimmed.strip_prefix("//") {
                last_comment = Some(comment.strip_prefix(' ').unwrap_or(comment).to_string());
            } else if let Some(comment) = line.trim_start().strip_prefix("/*") {
                match comment.find("*/") {
                    Some(end) => last_comment = Some(strip_block_padding(&comment[..end])),
                    None => open_comment = Some(vec![comment]),
                }
            } else if let Some(captures) = PAIR_REGEX.captures(trimmed) {
                entries.push(Entry {
                    key: unescape(&captures[1]),
                    value: unescape(&captures[2]),
                    comment: last_comment.take(),
                });
            } else {
                return Err(Error::invalid_input(format!(
                    "line {}: expected `\"key\" = \"value\";`",
                    index + 1
                )));
            }
        }

        if open_comment.is_some() {
            return Err(Error::invalid_input("unterminated `/*` comment"));
        }

        Ok(Records {
            language: header.remove("Language").filter(|l| !l.is_empty()),
            entries,
        })
    }
}

fn strip_block_padding(comment: &str) -> String {
    let comment = comment.strip_prefix(' ').unwrap_or(comment);
    comment.strip_suffix(' ').unwrap_or(comment).to_string()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str(r"\n"),
            '\r' => escaped.push_str(r"\r"),
            '\t' => escaped.push_str(r"\t"),
            c if c.is_control() => escaped.push_str(&format!("\\U{:04X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some(marker @ ('U' | 'u')) => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 => {
                        result.push(decoded);
                        for _ in 0..4 {
                            chars.next();
                        }
                    }
                    _ => {
                        result.push('\\');
                        result.push(marker);
                    }
                }
            }
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}
