//! `xl/sharedStrings.xml` parsing and writing.
//!
//! The table header carries two independent numbers: `uniqueCount` is the
//! number of `<si>` entries, `count` is the total number of cells referencing
//! the table. Both are required and they are not the same quantity — the
//! writer receives the reference total from the save pass rather than
//! deriving it from the pool.

use std::borrow::Cow;

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use sheetpack_model::{Color, RichText, RichTextRunStyle, Underline};
use thiserror::Error;

use crate::xml_escape;

#[derive(Debug, Error)]
pub enum SharedStringsError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed sharedStrings.xml: {0}")]
    Malformed(&'static str),
}

/// Parse the shared-string table into entries in file order.
pub fn parse_shared_strings_xml(xml: &str) -> Result<Vec<RichText>, SharedStringsError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut items = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                items.push(parse_string_item(&mut reader, b"si")?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                items.push(RichText::new(""));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

/// Parse one `<si>`-shaped element (`<si>` in the table, `<is>` inline in a
/// worksheet cell) up to its matching end tag.
pub(crate) fn parse_string_item(
    reader: &mut Reader<&[u8]>,
    end_local: &[u8],
) -> Result<RichText, SharedStringsError> {
    let mut buf = Vec::new();
    let mut segments: Vec<(String, RichTextRunStyle)> = Vec::new();
    let mut phonetic_runs: Vec<(Option<u32>, usize, String)> = Vec::new();
    let mut phonetic_order: usize = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                let t = read_text(reader, QName(b"t"))?;
                segments.push((t, RichTextRunStyle::default()));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"t" => {
                segments.push((String::new(), RichTextRunStyle::default()));
            }
            Event::Start(e) if e.local_name().as_ref() == b"r" => {
                segments.push(parse_run(reader)?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"rPh" => {
                // Phonetic guide text ("ruby") runs. These `<t>` nodes are not
                // part of the displayed string; capture them separately.
                let sb = attr_value(&e, b"sb")?.and_then(|s| s.parse::<u32>().ok());
                let text = parse_phonetic_run(reader)?;
                phonetic_runs.push((sb, phonetic_order, text));
                phonetic_order = phonetic_order.saturating_add(1);
            }
            Event::Start(e) => {
                // Skip unknown subtrees (extensions, phonetic properties) so
                // their `<t>` elements never leak into the display string.
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == end_local => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <si>")),
            _ => {}
        }
        buf.clear();
    }

    let mut phonetic = if phonetic_runs.is_empty() {
        None
    } else {
        let has_sb_for_all = phonetic_runs.iter().all(|(sb, _, _)| sb.is_some());
        if has_sb_for_all {
            phonetic_runs.sort_by(|(a_sb, a_order, _), (b_sb, b_order, _)| {
                a_sb.cmp(b_sb).then(a_order.cmp(b_order))
            });
        }

        let mut out = String::new();
        for (_, _, t) in phonetic_runs {
            out.push_str(&t);
        }
        (!out.is_empty()).then_some(out)
    };

    if segments.iter().all(|(_, style)| style.is_empty()) {
        let mut rt = RichText::new(
            segments
                .into_iter()
                .map(|(text, _)| text)
                .collect::<String>(),
        );
        rt.phonetic = phonetic.take();
        Ok(rt)
    } else {
        let mut rt = RichText::from_segments(segments);
        rt.phonetic = phonetic.take();
        Ok(rt)
    }
}

fn parse_run(reader: &mut Reader<&[u8]>) -> Result<(String, RichTextRunStyle), SharedStringsError> {
    let mut buf = Vec::new();
    let mut style = RichTextRunStyle::default();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"rPr" => {
                style = parse_run_properties(reader)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text(reader, QName(b"t"))?);
            }
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"r" => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <r>")),
            _ => {}
        }
        buf.clear();
    }

    Ok((text, style))
}

fn parse_phonetic_run(reader: &mut Reader<&[u8]>) -> Result<String, SharedStringsError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text.push_str(&read_text(reader, QName(b"t"))?);
            }
            Event::End(e) if e.local_name().as_ref() == b"rPh" => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <rPh>")),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn parse_run_properties(
    reader: &mut Reader<&[u8]>,
) -> Result<RichTextRunStyle, SharedStringsError> {
    let mut buf = Vec::new();
    let mut style = RichTextRunStyle::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) => parse_run_property_tag(&e, &mut style)?,
            Event::Start(e) => {
                parse_run_property_tag(&e, &mut style)?;
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"rPr" => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <rPr>")),
            _ => {}
        }
        buf.clear();
    }

    Ok(style)
}

fn parse_run_property_tag(
    e: &quick_xml::events::BytesStart<'_>,
    style: &mut RichTextRunStyle,
) -> Result<(), SharedStringsError> {
    match e.local_name().as_ref() {
        b"b" => style.bold = Some(parse_bool_val(e)?),
        b"i" => style.italic = Some(parse_bool_val(e)?),
        b"u" => {
            let val = attr_value(e, b"val")?;
            if let Some(ul) = Underline::from_ooxml(val.as_deref()) {
                style.underline = Some(ul);
            }
        }
        b"color" => {
            if let Some(rgb) = attr_value(e, b"rgb")? {
                if rgb.len() == 8 {
                    if let Ok(argb) = u32::from_str_radix(&rgb, 16) {
                        style.color = Some(Color::new_argb(argb));
                    }
                }
            }
        }
        b"rFont" | b"name" => {
            if let Some(val) = attr_value(e, b"val")? {
                style.font = Some(val);
            }
        }
        b"sz" => {
            if let Some(val) = attr_value(e, b"val")? {
                if let Some(sz) = parse_size_100pt(&val) {
                    style.size_100pt = Some(sz);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_bool_val(e: &quick_xml::events::BytesStart<'_>) -> Result<bool, SharedStringsError> {
    let Some(val) = attr_value(e, b"val")? else {
        return Ok(true);
    };
    Ok(!(val == "0" || val.eq_ignore_ascii_case("false")))
}

pub(crate) fn read_text(
    reader: &mut Reader<&[u8]>,
    end: QName<'_>,
) -> Result<String, SharedStringsError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => {
                let t: Cow<'_, str> = e.unescape()?;
                text.push_str(&t);
            }
            Event::CData(e) => {
                text.push_str(std::str::from_utf8(e.as_ref())?);
            }
            Event::End(e) if e.name() == end => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <t>")),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

pub(crate) fn attr_value(
    e: &quick_xml::events::BytesStart<'_>,
    key: &[u8],
) -> Result<Option<String>, SharedStringsError> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_size_100pt(val: &str) -> Option<u16> {
    let val = val.trim();
    if val.is_empty() {
        return None;
    }

    if let Some((int_part, frac_part)) = val.split_once('.') {
        let int: u16 = int_part.parse().ok()?;
        let mut frac = frac_part.chars().take(2).collect::<String>();
        while frac.len() < 2 {
            frac.push('0');
        }
        let frac: u16 = frac.parse().ok()?;
        int.checked_mul(100)?.checked_add(frac)
    } else {
        let int: u16 = val.parse().ok()?;
        int.checked_mul(100)
    }
}

/// Render the shared-string table.
///
/// `total_refs` is the number of referencing cells across the workbook,
/// counted by the save pass while it walked the model.
pub fn write_shared_strings_xml(items: &[RichText], total_refs: u64) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main""#);
    xml.push_str(&format!(
        r#" count="{total_refs}" uniqueCount="{}">"#,
        items.len()
    ));
    for item in items {
        xml.push_str("<si>");
        write_string_item_body(&mut xml, item);
        xml.push_str("</si>");
    }
    xml.push_str("</sst>");
    xml.into_bytes()
}

/// Render the body of an `<si>`/`<is>` element (shared by the worksheet
/// writer for inline strings).
pub(crate) fn write_string_item_body(xml: &mut String, item: &RichText) {
    if item.is_plain() {
        write_t_element(xml, item.plain_text());
    } else {
        for run in &item.runs {
            xml.push_str("<r>");
            write_run_properties(xml, &run.style);
            write_t_element(xml, item.slice_run_text(run));
            xml.push_str("</r>");
        }
    }

    if let Some(phonetic) = &item.phonetic {
        xml.push_str(&format!(
            r#"<rPh sb="0" eb="{}">"#,
            item.char_len()
        ));
        write_t_element(xml, phonetic);
        xml.push_str("</rPh>");
    }
}

fn write_run_properties(xml: &mut String, style: &RichTextRunStyle) {
    if style.is_empty() {
        return;
    }
    xml.push_str("<rPr>");
    if let Some(bold) = style.bold {
        xml.push_str(if bold { "<b/>" } else { r#"<b val="0"/>"# });
    }
    if let Some(italic) = style.italic {
        xml.push_str(if italic { "<i/>" } else { r#"<i val="0"/>"# });
    }
    if let Some(underline) = style.underline {
        match underline.to_ooxml() {
            None => xml.push_str("<u/>"),
            Some(val) => xml.push_str(&format!(r#"<u val="{val}"/>"#)),
        }
    }
    if let Some(Color::Argb(argb)) = style.color {
        xml.push_str(&format!(r#"<color rgb="{argb:08X}"/>"#));
    }
    if let Some(size) = style.size_100pt {
        xml.push_str(&format!(r#"<sz val="{:.2}"/>"#, (size as f32) / 100.0));
    }
    if let Some(font) = &style.font {
        xml.push_str(&format!(r#"<rFont val="{}"/>"#, xml_escape::attr(font)));
    }
    xml.push_str("</rPr>");
}

fn write_t_element(xml: &mut String, text: &str) {
    xml.push_str("<t");
    if needs_space_preserve(text) {
        xml.push_str(r#" xml:space="preserve""#);
    }
    xml.push('>');
    xml.push_str(&xml_escape::text(text));
    xml.push_str("</t>");
}

/// A reader will trim the text on the next load unless we flag it; anything
/// whose trimmed form differs from the original needs the flag.
pub(crate) fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_rich_entries() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="2">
  <si><t>Plain</t></si>
  <si><r><rPr><b/></rPr><t>Bold</t></r><r><t> tail</t></r></si>
</sst>"#;

        let items = parse_shared_strings_xml(xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].plain_text(), "Plain");
        assert!(items[0].is_plain());
        assert_eq!(items[1].plain_text(), "Bold tail");
        assert_eq!(items[1].runs.len(), 2);
        assert_eq!(items[1].runs[0].style.bold, Some(true));
    }

    #[test]
    fn ignores_phonetic_ruby_text_in_si() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1">
  <si>
    <t>Base</t>
    <phoneticPr fontId="0" type="noConversion"/>
    <rPh sb="0" eb="4"><t>PHO</t></rPh>
  </si>
</sst>"#;

        let items = parse_shared_strings_xml(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Base");
        assert_eq!(items[0].phonetic.as_deref(), Some("PHO"));
    }

    #[test]
    fn writer_reports_both_counts() {
        let items = vec![RichText::new("Hello")];
        let xml = String::from_utf8(write_shared_strings_xml(&items, 2)).unwrap();
        assert!(xml.contains(r#"count="2""#));
        assert!(xml.contains(r#"uniqueCount="1""#));
    }

    #[test]
    fn writer_flags_significant_whitespace() {
        let items = vec![RichText::new("  padded  ")];
        let xml = String::from_utf8(write_shared_strings_xml(&items, 1)).unwrap();
        assert!(xml.contains(r#"<t xml:space="preserve">  padded  </t>"#));
    }

    #[test]
    fn rich_entry_roundtrip() {
        let rt = RichText::from_segments(vec![
            ("Hi ".to_string(), RichTextRunStyle::default()),
            (
                "there".to_string(),
                RichTextRunStyle {
                    bold: Some(true),
                    ..Default::default()
                },
            ),
        ]);
        let xml = String::from_utf8(write_shared_strings_xml(&[rt.clone()], 1)).unwrap();
        let items = parse_shared_strings_xml(&xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], rt);
    }
}
