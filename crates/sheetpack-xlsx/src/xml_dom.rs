//! A small read-only XML tree used where random access beats event streaming
//! (the styles part, whose sections cross-reference each other by index).
//!
//! Element and attribute names are stored by local name; SpreadsheetML parts
//! use a single default namespace, and some producers emit prefixed variants,
//! so matching on local names is the tolerant choice.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::relationships::local_name;

#[derive(Debug, Error)]
pub enum XmlDomError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("document has no root element")]
    NoRoot,
    #[error("unbalanced element nesting")]
    Unbalanced,
}

/// One parsed element: local name, attributes, child elements, text content.
#[derive(Clone, Debug, Default)]
pub(crate) struct XmlEl {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlEl>,
    pub text: String,
}

impl XmlEl {
    /// Parse a document and return its root element.
    pub fn parse(bytes: &[u8]) -> Result<XmlEl, XmlDomError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();

        let mut stack: Vec<XmlEl> = Vec::new();
        let mut root: Option<XmlEl> = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    stack.push(element_from_start(&e)?);
                }
                Event::Empty(e) => {
                    let el = element_from_start(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None if root.is_none() => root = Some(el),
                        None => return Err(XmlDomError::Unbalanced),
                    }
                }
                Event::End(_) => {
                    let el = stack.pop().ok_or(XmlDomError::Unbalanced)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None if root.is_none() => root = Some(el),
                        None => return Err(XmlDomError::Unbalanced),
                    }
                }
                Event::Text(e) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(std::str::from_utf8(e.as_ref())?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        root.ok_or(XmlDomError::NoRoot)
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlEl> {
        self.children.iter().find(|c| c.name == local)
    }

    /// All child elements with the given local name.
    pub fn children_by_name<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlEl> {
        self.children.iter().filter(move |c| c.name == local)
    }

    /// Attribute value by local name.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == local)
            .map(|(_, v)| v.as_str())
    }
}

fn element_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<XmlEl, XmlDomError> {
    let name = String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes().with_checks(false) {
        let attr = attr.map_err(XmlDomError::XmlAttr)?;
        let key = String::from_utf8_lossy(local_name(attr.key.as_ref())).into_owned();
        let value = attr.unescape_value().map_err(XmlDomError::Xml)?.into_owned();
        attrs.push((key, value));
    }
    Ok(XmlEl {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let xml = br#"<?xml version="1.0"?>
<root a="1">
  <child b="two"><leaf/></child>
  <child b="three">text</child>
</root>"#;

        let root = XmlEl::parse(xml).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.attr("a"), Some("1"));
        assert_eq!(root.children_by_name("child").count(), 2);
        assert!(root.child("child").unwrap().child("leaf").is_some());
        assert_eq!(
            root.children_by_name("child").nth(1).unwrap().text.trim(),
            "text"
        );
    }

    #[test]
    fn strips_namespace_prefixes() {
        let xml = br#"<x:root xmlns:x="urn:x" x:a="1"><x:kid/></x:root>"#;
        let root = XmlEl::parse(xml).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.attr("a"), Some("1"));
        assert!(root.child("kid").is_some());
    }
}
