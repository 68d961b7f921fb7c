//! Support for XML property lists.
//!
//! Writes a plist 1.0 document whose root `<dict>` maps each key to a `<string>`.
//! Comments are kept as XML comments in front of the `<key>`.
//! Entries already in the destination that are not re-supplied are kept; values
//! of other plist types (numbers, arrays, nested dictionaries) are not.

use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    error::Error,
    formats::{
        FormatType,
        markup::{
            check_entries, declared_encoding, escape_text, into_string, read_text_until_end,
            strip_comment_padding,
        },
    },
    options::CreateOptions,
    traits::{FormatCodec, MergePolicy, Snapshot},
    types::{Entry, Records},
};

const DOCTYPE: &str = r#"<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">"#;

/// Property-list codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec;

impl FormatCodec for Codec {
    fn format(&self) -> FormatType {
        FormatType::PropertyList
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

        let header = format!(
            "<?xml version=\"1.0\" encoding=\"{}\"?>\n{}\n",
            declared_encoding(&options.encoding),
            DOCTYPE
        );

        let mut plist = BytesStart::new("plist");
        plist.push_attribute(("version", "1.0"));

        let mut xml_writer = Writer::new(header.into_bytes());
        xml_writer.write_event(Event::Start(plist))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
        xml_writer.write_event(Event::Start(BytesStart::new("dict")))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;

        for entry in &records.entries {
            if let Some(comment) = &entry.comment {
                xml_writer.write_event(Event::Text(BytesText::new("\t")))?;
                xml_writer.write_event(Event::Comment(BytesText::from_escaped(format!(
                    " {} ",
                    comment
                ))))?;
                xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
            }
            write_element(&mut xml_writer, "key", &entry.key)?;
            write_element(&mut xml_writer, "string", &entry.value)?;
        }

        xml_writer.write_event(Event::End(BytesEnd::new("dict")))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
        xml_writer.write_event(Event::End(BytesEnd::new("plist")))?;
        xml_writer.write_event(Event::Text(BytesText::new("\n")))?;

        into_string(xml_writer.into_inner())
    }

    fn parse(&self, content: &str) -> Result<Records, Error> {
        let content = content.replace("\r\n", "\n").replace('\r', "\n");
        let mut xml_reader = Reader::from_str(&content);

        let mut records = Records::new();
        let mut in_dict = false;
        let mut last_comment: Option<String> = None;
        let mut pending_key: Option<String> = None;

        loop {
            let event = xml_reader.read_event()?;
            if !in_dict {
                match event {
                    Event::Start(ref e) if e.name().as_ref() == b"plist" => {}
                    Event::Start(ref e) if e.name().as_ref() == b"dict" => in_dict = true,
                    Event::Empty(ref e) if e.name().as_ref() == b"dict" => break,
                    Event::Start(_) | Event::Empty(_) => {
                        return Err(Error::invalid_input(
                            "property list root must be a <dict>",
                        ));
                    }
                    Event::Eof => break,
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Comment(ref e) => {
                    last_comment = Some(strip_comment_padding(&String::from_utf8_lossy(e)));
                }
                Event::Start(ref e) if e.name().as_ref() == b"key" => {
                    if pending_key.is_some() {
                        return Err(Error::invalid_input("<key> without a value"));
                    }
                    pending_key = Some(read_text_until_end(&mut xml_reader, b"key")?);
                }
                Event::Start(ref e) if e.name().as_ref() == b"string" => {
                    let key = pending_key.take().ok_or_else(value_without_key)?;
                    let value = read_text_until_end(&mut xml_reader, b"string")?;
                    records.push(Entry {
                        key,
                        value,
                        comment: last_comment.take(),
                    });
                }
                Event::Empty(ref e) if e.name().as_ref() == b"string" => {
                    let key = pending_key.take().ok_or_else(value_without_key)?;
                    records.push(Entry {
                        key,
                        value: String::new(),
                        comment: last_comment.take(),
                    });
                }
                Event::Start(ref e) => {
                    // Non-string value: skip it together with its key
                    pending_key.take().ok_or_else(value_without_key)?;
                    xml_reader.read_to_end(e.name())?;
                    last_comment = None;
                }
                Event::Empty(_) => {
                    pending_key.take().ok_or_else(value_without_key)?;
                    last_comment = None;
                }
                Event::End(ref e) if e.name().as_ref() == b"dict" => break,
                Event::Eof => {
                    return Err(Error::invalid_input("unexpected end of document inside <dict>"));
                }
                _ => {}
            }
        }

        if pending_key.is_some() {
            return Err(Error::invalid_input("<key> without a value"));
        }

        Ok(records)
    }
}

fn value_without_key() -> Error {
    Error::invalid_input("property list value without a <key>")
}

fn write_element(xml_writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), Error> {
    xml_writer.write_event(Event::Text(BytesText::new("\t")))?;
    xml_writer.write_event(Event::Start(BytesStart::new(name)))?;
    xml_writer.write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?;
    xml_writer.write_event(Event::End(BytesEnd::new(name)))?;
    xml_writer.write_event(Event::Text(BytesText::new("\n")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn sample() -> Records {
        vec![
            Entry::new("greeting", "Hello").with_comment("shown on launch"),
            Entry::new("farewell", "Bye"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_render_plist() {
        let rendered = Codec
            .render(&sample(), None, &CreateOptions::default())
            .unwrap();
        let expected = [
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            DOCTYPE,
            r#"<plist version="1.0">"#,
            "<dict>",
            "\t<!-- shown on launch -->",
            "\t<key>greeting</key>",
            "\t<string>Hello</string>",
            "\t<key>farewell</key>",
            "\t<string>Bye</string>",
            "</dict>",
            "</plist>",
            "",
        ]
        .join("\n");
        assert_eq!(rendered, expected);
        assert_eq!(Codec.parse(&rendered).unwrap(), sample());
    }

    #[test]
    fn test_parse_infoplist_skips_other_types() {
        let parsed = Codec
            .parse(indoc! {r#"
                <?xml version="1.0" encoding="UTF-8"?>
                <plist version="1.0">
                <dict>
                    <key>CFBundleDisplayName</key>
                    <string>Notes &amp; More</string>
                    <key>LSRequiresIPhoneOS</key>
                    <true/>
                    <key>UISupportedInterfaceOrientations</key>
                    <array>
                        <string>UIInterfaceOrientationPortrait</string>
                    </array>
                    <key>NSCameraUsageDescription</key>
                    <string/>
                </dict>
                </plist>
            "#})
            .unwrap();
        let keys: Vec<&str> = parsed.keys().collect();
        assert_eq!(keys, vec!["CFBundleDisplayName", "NSCameraUsageDescription"]);
        assert_eq!(parsed.entries[0].value, "Notes & More");
        assert_eq!(parsed.entries[1].value, "");
    }

    #[test]
    fn test_multiline_value_round_trip() {
        let records: Records = vec![Entry::new("multi", "one\ntwo\r\n<three>")]
            .into_iter()
            .collect();
        let rendered = Codec
            .render(&records, None, &CreateOptions::default())
            .unwrap();
        assert!(rendered.contains("<string>one&#10;two&#13;&#10;&lt;three&gt;</string>"));
        assert_eq!(Codec.parse(&rendered).unwrap(), records);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Codec.parse("<plist><array/></plist>").is_err());
        assert!(Codec.parse("<plist><dict><string>x</string></dict></plist>").is_err());
        assert!(Codec.parse("<plist><dict><key>a</key></dict></plist>").is_err());
        assert!(Codec.parse("<plist><dict><key>a</key>").is_err());
    }

    #[test]
    fn test_lone_carriage_returns() {
        let rendered = Codec
            .render(&sample(), None, &CreateOptions::default())
            .unwrap();
        assert_eq!(Codec.parse(&rendered.replace('\n', "\r")).unwrap(), sample());
    }

    #[test]
    fn test_render_rejects_carriage_return_in_comment() {
        let records: Records = vec![Entry::new("a", "x").with_comment("x\r\ny")]
            .into_iter()
            .collect();
        let err = Codec
            .render(&records, None, &CreateOptions::default())
            .unwrap_err();
        assert_eq!(err.keys(), ["a".to_string()]);
    }

    #[test]
    fn test_empty_dict() {
        assert!(Codec.parse("<plist version=\"1.0\"><dict/></plist>").unwrap().is_empty());
    }
}
