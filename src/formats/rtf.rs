//! Support for rich-text (RTF) localization files.
//!
//! Entries are written one paragraph per line. The key and the optional comment
//! live in ignorable `{\*\…}` destinations, so RTF readers only show the values:
//!
//! ```text
//! {\*\loccomment Shown on launch}
//! {\*\lockey greeting}Hello\par
//! ```
//!
//! Everything around the entry lines (font and colour tables, document
//! formatting) belongs to the document, not to the records. When a file already
//! exists that surrounding content is carried over; its entries are not.

use encoding_rs::WINDOWS_1252;

use crate::{
    error::Error,
    formats::FormatType,
    options::CreateOptions,
    traits::{FormatCodec, MergePolicy, Snapshot},
    types::{Entry, Records},
};

const KEY_PREFIX: &str = r"{\*\lockey ";
const COMMENT_PREFIX: &str = r"{\*\loccomment ";
const PARAGRAPH: &str = r"\par";

const DEFAULT_PRELUDE: &str = concat!(
    r"{\rtf1\ansi\ansicpg1252\deff0",
    "\n",
    r"{\fonttbl{\f0\fswiss Helvetica;}}",
    "\n",
    r"\f0\fs24",
    "\n",
);

/// Rich-text codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec;

impl FormatCodec for Codec {
    fn format(&self) -> FormatType {
        FormatType::RichText
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::Replace
    }

    fn render(
        &self,
        records: &Records,
        snapshot: Option<&Snapshot>,
        _options: &CreateOptions,
    ) -> Result<String, Error> {
        let (prelude, trailer) = match snapshot {
            Some(snapshot) => surroundings(&snapshot.text)?,
            None => (DEFAULT_PRELUDE.to_string(), String::new()),
        };

        let mut content = prelude;
        for entry in &records.entries {
            if let Some(comment) = &entry.comment {
                content.push_str(COMMENT_PREFIX);
                content.push_str(&escape(comment));
                content.push_str("}\n");
            }
            content.push_str(KEY_PREFIX);
            content.push_str(&escape(&entry.key));
            content.push('}');
            content.push_str(&escape(&entry.value));
            content.push_str(PARAGRAPH);
            content.push('\n');
        }
        content.push_str(&trailer);
        content.push_str("}\n");
        Ok(content)
    }

    fn parse(&self, content: &str) -> Result<Records, Error> {
        let content = content.replace("\r\n", "\n").replace('\r', "\n");
        if !content.trim_start().starts_with(r"{\rtf") {
            return Err(Error::invalid_input("not an RTF document"));
        }

        let mut records = Records::new();
        let mut pending_comment = None;

        for (index, line) in content.lines().enumerate() {
            if let Some(rest) = line.strip_prefix(COMMENT_PREFIX) {
                let (comment, _) = split_group(rest).ok_or_else(|| unterminated(index))?;
                pending_comment = Some(unescape(comment));
            } else if let Some(rest) = line.strip_prefix(KEY_PREFIX) {
                let (key, value) = split_group(rest).ok_or_else(|| unterminated(index))?;
                let value = value.strip_suffix(PARAGRAPH).ok_or_else(|| {
                    Error::invalid_input(format!("line {}: entry must end with \\par", index + 1))
                })?;
                records.push(Entry {
                    key: unescape(key),
                    value: unescape(value),
                    comment: pending_comment.take(),
                });
            }
        }

        Ok(records)
    }
}

fn unterminated(index: usize) -> Error {
    Error::invalid_input(format!("line {}: unterminated group", index + 1))
}

fn is_entry_line(line: &str) -> bool {
    line.starts_with(KEY_PREFIX) || line.starts_with(COMMENT_PREFIX)
}

/// Splits an existing document into the text before the first entry line
/// and the text between the last entry line and the closing brace.
fn surroundings(text: &str) -> Result<(String, String), Error> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = text.lines().collect();

    match (
        lines.iter().position(|l| is_entry_line(l)),
        lines.iter().rposition(|l| is_entry_line(l)),
    ) {
        (Some(first), Some(last)) => {
            let prelude = lines[..first].iter().map(|l| format!("{}\n", l)).collect();
            let mut trailer: Vec<&str> = lines[last + 1..].to_vec();
            // The closing brace is written again after the trailer
            while trailer.last().is_some_and(|l| l.trim().is_empty()) {
                trailer.pop();
            }
            match trailer.pop().map(str::trim_end) {
                Some(closing) if closing.ends_with('}') => {
                    let kept = &closing[..closing.len() - 1];
                    if !kept.is_empty() {
                        trailer.push(kept);
                    }
                }
                _ => return Err(Error::invalid_input("RTF document is not closed")),
            }
            let trailer = trailer.iter().map(|l| format!("{}\n", l)).collect();
            Ok((prelude, trailer))
        }
        _ => {
            let body = text.trim_end();
            let prelude = body
                .strip_suffix('}')
                .ok_or_else(|| Error::invalid_input("RTF document is not closed"))?;
            let mut prelude = prelude.to_string();
            if !prelude.ends_with('\n') {
                prelude.push('\n');
            }
            Ok((prelude, String::new()))
        }
    }
}

/// Splits `text` at the first unescaped `}` into the group body and the rest.
fn split_group(text: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '}' => return Some((&text[..index], &text[index + 1..])),
            _ => {}
        }
    }
    None
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            '{' => escaped.push_str(r"\{"),
            '}' => escaped.push_str(r"\}"),
            '\n' => escaped.push_str(r"\line "),
            '\t' => escaped.push_str(r"\tab "),
            ' '..='~' => escaped.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // RTF stores \u values as signed 16-bit numbers
                    escaped.push_str(&format!(r"\u{}?", *unit as i16));
                }
            }
        }
    }
    escaped
}

fn unescape(text: &str) -> String {
    let mut units: Vec<u16> = Vec::new();
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    let flush = |units: &mut Vec<u16>, result: &mut String| {
        if !units.is_empty() {
            result.extend(char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or('\u{FFFD}')));
        }
    };

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush(&mut units, &mut result);
            result.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some(symbol @ ('\\' | '{' | '}')) => {
                chars.next();
                flush(&mut units, &mut result);
                result.push(symbol);
            }
            Some('\'') => {
                chars.next();
                let hex: String = chars.by_ref().take(2).collect();
                flush(&mut units, &mut result);
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push_str(&WINDOWS_1252.decode_without_bom_handling(&[byte]).0);
                }
            }
            Some(letter) if letter.is_ascii_alphabetic() => {
                let mut word = String::new();
                while let Some(&l) = chars.peek().filter(|l| l.is_ascii_alphabetic()) {
                    word.push(l);
                    chars.next();
                }
                let mut number = String::new();
                if chars.peek() == Some(&'-') {
                    number.push('-');
                    chars.next();
                }
                while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    number.push(d);
                    chars.next();
                }
                if chars.peek() == Some(&' ') {
                    chars.next();
                }

                match word.as_str() {
                    "u" => {
                        if let Ok(value) = number.parse::<i16>() {
                            units.push(value as u16);
                        }
                        // Skip the single fallback character
                        chars.next();
                        continue;
                    }
                    "line" => {
                        flush(&mut units, &mut result);
                        result.push('\n');
                    }
                    "tab" => {
                        flush(&mut units, &mut result);
                        result.push('\t');
                    }
                    _ => flush(&mut units, &mut result),
                }
            }
            _ => {
                flush(&mut units, &mut result);
                result.push('\\');
            }
        }
    }
    flush(&mut units, &mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::path::PathBuf;

    fn sample() -> Records {
        vec![
            Entry::new("greeting", "Hello").with_comment("shown on launch"),
            Entry::new("farewell", "Bye"),
        ]
        .into_iter()
        .collect()
    }

    fn snapshot(text: &str) -> Snapshot {
        Snapshot {
            path: PathBuf::from("Readme.rtf"),
            text: text.to_string(),
            records: Codec.parse(text).unwrap(),
        }
    }

    #[test]
    fn test_render_default_document() {
        let rendered = Codec.render(&sample(), None, &CreateOptions::default()).unwrap();
        assert_eq!(
            rendered,
            indoc! {r"
                {\rtf1\ansi\ansicpg1252\deff0
                {\fonttbl{\f0\fswiss Helvetica;}}
                \f0\fs24
                {\*\loccomment shown on launch}
                {\*\lockey greeting}Hello\par
                {\*\lockey farewell}Bye\par
                }
            "}
        );
        assert_eq!(Codec.parse(&rendered).unwrap(), sample());
    }

    #[test]
    fn test_escapes_round_trip() {
        let records: Records = vec![
            Entry::new("{braces}", "back\\slash {x}\nnext\tline"),
            Entry::new("unicode", "Café ☃ 😀 \r 12"),
            Entry::new("key ü", "\\u123?"),
        ]
        .into_iter()
        .collect();
        let rendered = Codec.render(&records, None, &CreateOptions::default()).unwrap();
        assert!(rendered.contains(r"{\*\lockey \{braces\}}back\\slash \{x\}\line next\tab line\par"));
        assert!(rendered.contains(r"Caf\u233? \u9731? \u-10179?\u-8704? \u13? 12"));
        assert_eq!(Codec.parse(&rendered).unwrap(), records);
    }

    #[test]
    fn test_snapshot_prelude_and_trailer_are_kept() {
        let existing = indoc! {r"
            {\rtf1\ansi\ansicpg1252\cocoartf2709
            {\fonttbl\f0\fnil\fcharset0 Menlo-Regular;}
            {\colortbl;\red255\green255\blue255;}
            \f0\fs22 \cf0
            {\*\lockey stale}Gone\par
            Footer text\par
            }
        "};
        let rendered = Codec
            .render(&sample(), Some(&snapshot(existing)), &CreateOptions::default())
            .unwrap();
        assert!(rendered.starts_with(
            "{\\rtf1\\ansi\\ansicpg1252\\cocoartf2709\n{\\fonttbl\\f0\\fnil\\fcharset0 Menlo-Regular;}\n"
        ));
        assert!(!rendered.contains("stale"));
        assert!(rendered.ends_with("{\\*\\lockey farewell}Bye\\par\nFooter text\\par\n}\n"));
        assert_eq!(Codec.parse(&rendered).unwrap(), sample());
    }

    #[test]
    fn test_snapshot_without_entries_keeps_document() {
        let rendered = Codec
            .render(
                &sample(),
                Some(&snapshot(r"{\rtf1\ansi Intro\par}")),
                &CreateOptions::default(),
            )
            .unwrap();
        assert!(rendered.starts_with("{\\rtf1\\ansi Intro\\par\n{\\*\\loccomment"));
        assert!(rendered.ends_with("Bye\\par\n}\n"));
    }

    #[test]
    fn test_lone_carriage_returns() {
        let rendered = Codec.render(&sample(), None, &CreateOptions::default()).unwrap();
        let old_mac = rendered.replace('\n', "\r");
        assert_eq!(Codec.parse(&old_mac).unwrap(), sample());

        // Entries of the existing document are found, so none leak into the prelude
        let records: Records = vec![Entry::new("greeting", "Hi")].into_iter().collect();
        let rerendered = Codec
            .render(&records, Some(&snapshot(&old_mac)), &CreateOptions::default())
            .unwrap();
        assert_eq!(rerendered.matches("lockey").count(), 1);
        assert_eq!(Codec.parse(&rerendered).unwrap(), records);
    }

    #[test]
    fn test_parse_decodes_cocoa_hex_escapes() {
        let parsed = Codec
            .parse("{\\rtf1\n{\\*\\lockey cafe}Caf\\'e9\\par\n}")
            .unwrap();
        assert_eq!(parsed.entries[0].value, "Café");
    }

    #[test]
    fn test_parse_rejects_non_rtf() {
        assert!(Codec.parse("greeting=Hello").is_err());
        assert!(Codec.parse("{\\rtf1\n{\\*\\lockey a}no paragraph\n}").is_err());
    }
}
