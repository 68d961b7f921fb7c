//! Support for XML resource files.
//!
//! Entries are `<string name="key">value</string>` elements under a `<resources>`
//! root, each optionally preceded by an XML comment. Line breaks inside values
//! are written as character references so they survive line-ending conversion.
//! Entries already in the destination that are not re-supplied are kept;
//! elements other than `<string>` are not.

use std::borrow::Cow;

use quick_xml::{
    Reader, Writer,
    escape::escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    encoding::TextEncoding,
    error::Error,
    formats::FormatType,
    options::CreateOptions,
    traits::{FormatCodec, MergePolicy, Snapshot},
    types::{Entry, Records},
};

const INDENT: &str = "    ";

/// Markup codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec;

impl FormatCodec for Codec {
    fn format(&self) -> FormatType {
        FormatType::Markup
    }

    fn merge_policy(&self) -> MergePolicy {
        MergePolicy::PreserveExisting
    }

    fn render(
        &self,
        records: &Records,
        _snapshot: Option<&Snapshot>,
        options: &CreateOptions,
    ) -> Result<String, Error> {
        check_entries(records)?;

        let mut xml_writer = Writer::new(Vec::new());
        xml_writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some(declared_encoding(&options.encoding)),
            None,
        )))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;

        let mut resources = BytesStart::new("resources");
        if let Some(language) = &records.language {
            resources.push_attribute(("xml:lang", language.as_str()));
        }
        xml_writer.write_event(Event::Start(resources))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;

        for entry in &records.entries {
            if let Some(comment) = &entry.comment {
                xml_writer.write_event(Event::Text(BytesText::new(INDENT)))?;
                xml_writer.write_event(Event::Comment(BytesText::from_escaped(format!(
                    " {} ",
                    comment
                ))))?;
                xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
            }

            let mut elem = BytesStart::new("string");
            elem.push_attribute(("name", entry.key.as_str()));
            xml_writer.write_event(Event::Text(BytesText::new(INDENT)))?;
            xml_writer.write_event(Event::Start(elem))?;
            xml_writer.write_event(Event::Text(BytesText::from_escaped(escape_text(
                &entry.value,
            ))))?;
            xml_writer.write_event(Event::End(BytesEnd::new("string")))?;
            xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
        }

        xml_writer.write_event(Event::End(BytesEnd::new("resources")))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;

        into_string(xml_writer.into_inner())
    }

    fn parse(&self, content: &str) -> Result<Records, Error> {
        let content = content.replace("\r\n", "\n").replace('\r', "\n");
        let mut xml_reader = Reader::from_str(&content);

        let mut records = Records::new();
        let mut last_comment: Option<String> = None;

        loop {
            match xml_reader.read_event()? {
                Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"resources" => {
                    records.language = attribute(e, b"xml:lang")?;
                }
                Event::Comment(ref e) => {
                    last_comment = Some(strip_comment_padding(&String::from_utf8_lossy(e)));
                }
                Event::Start(ref e) if e.name().as_ref() == b"string" => {
                    let key = attribute(e, b"name")?.ok_or_else(|| {
                        Error::invalid_input("<string> element without a name attribute")
                    })?;
                    let value = read_text_until_end(&mut xml_reader, b"string")?;
                    records.push(Entry {
                        key,
                        value,
                        comment: last_comment.take(),
                    });
                }
                Event::Empty(ref e) if e.name().as_ref() == b"string" => {
                    let key = attribute(e, b"name")?.ok_or_else(|| {
                        Error::invalid_input("<string> element without a name attribute")
                    })?;
                    records.push(Entry {
                        key,
                        value: String::new(),
                        comment: last_comment.take(),
                    });
                }
                Event::Start(_) | Event::Empty(_) => last_comment = None,
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(records)
    }
}

/// Rejects content XML cannot carry or would not read back unchanged.
pub(crate) fn check_entries(records: &Records) -> Result<(), Error> {
    let mut rejected = Vec::new();
    for entry in &records.entries {
        let bad_comment = entry
            .comment
            .as_ref()
            .is_some_and(|c| {
                c.contains("--") || c.ends_with('-') || c.contains('\r') || has_illegal_chars(c)
            });
        let bad_key = entry.key.chars().any(char::is_control);
        if bad_comment || bad_key || has_illegal_chars(&entry.value) {
            rejected.push(entry.key.clone());
        }
    }
    if rejected.is_empty() {
        Ok(())
    } else {
        Err(Error::Render {
            keys: rejected,
            reason: "XML cannot contain control characters in keys or values, \
                     or `--` and carriage returns in comments"
                .to_string(),
        })
    }
}

fn has_illegal_chars(text: &str) -> bool {
    text.chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
}

/// The encoding name written into the XML declaration.
pub(crate) fn declared_encoding(encoding: &TextEncoding) -> &'static str {
    match encoding {
        TextEncoding::Utf16Le | TextEncoding::Utf16Be => "UTF-16",
        other => other.as_encoding().name(),
    }
}

/// Escapes markup characters and line breaks for element content.
pub(crate) fn escape_text(text: &str) -> String {
    match escape(text) {
        Cow::Borrowed(s) if !s.contains(['\n', '\r']) => s.to_string(),
        escaped => escaped.replace('\n', "&#10;").replace('\r', "&#13;"),
    }
}

pub(crate) fn strip_comment_padding(comment: &str) -> String {
    let comment = comment.strip_prefix(' ').unwrap_or(comment);
    comment.strip_suffix(' ').unwrap_or(comment).to_string()
}

pub(crate) fn into_string(bytes: Vec<u8>) -> Result<String, Error> {
    String::from_utf8(bytes).map_err(|e| Error::invalid_input(e.to_string()))
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, Error> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == name {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Collects the text content of the current element up to its end tag.
pub(crate) fn read_text_until_end(
    xml_reader: &mut Reader<&[u8]>,
    element: &[u8],
) -> Result<String, Error> {
    let mut value = String::new();
    loop {
        match xml_reader.read_event()? {
            Event::Text(e) => {
                value.push_str(&e.unescape().map_err(quick_xml::Error::from)?);
            }
            Event::CData(e) => value.push_str(&String::from_utf8_lossy(&e)),
            Event::End(e) if e.name().as_ref() == element => return Ok(value),
            Event::Comment(_) => {}
            Event::Eof => {
                return Err(Error::invalid_input(format!(
                    "unexpected end of document inside <{}>",
                    String::from_utf8_lossy(element)
                )));
            }
            _ => {
                return Err(Error::invalid_input(format!(
                    "nested markup inside <{}> is not supported",
                    String::from_utf8_lossy(element)
                )));
            }
        }
    }
}
