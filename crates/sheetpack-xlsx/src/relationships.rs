//! OPC relationship (`.rels`) parsing and writing, plus relationship id
//! allocation.
//!
//! Relationship ids are the one registry that **must** stay stable across
//! save cycles: external tools key on `rIdN` values. New ids come from a
//! [`RelIdAllocator`] seeded with every id already present in the package, so
//! a fresh id never collides with one handed out in a previous session.

use std::collections::HashSet;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

pub const REL_TYPE_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub const REL_TYPE_CHARTSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet";
pub const REL_TYPE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
pub const REL_TYPE_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
pub const REL_TYPE_CALC_CHAIN: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";
pub const REL_TYPE_TABLE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/table";

#[derive(Debug, Error)]
pub enum RelsError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("relationship missing required attribute: {0}")]
    MissingAttribute(&'static str),
}

/// One `<Relationship>` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub target_mode: Option<String>,
}

impl Relationship {
    pub fn is_external(&self) -> bool {
        self.target_mode
            .as_deref()
            .is_some_and(|mode| mode.eq_ignore_ascii_case("External"))
    }
}

/// Parse a `.rels` part into its relationship entries.
pub fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, RelsError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e)
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = None;
                let mut rel_type = None;
                let mut target = None;
                let mut target_mode = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = attr.unescape_value()?.into_owned();
                    match local_name(attr.key.as_ref()) {
                        b"Id" => id = Some(value),
                        b"Type" => rel_type = Some(value),
                        b"Target" => target = Some(value),
                        b"TargetMode" => target_mode = Some(value),
                        _ => {}
                    }
                }
                out.push(Relationship {
                    id: id.ok_or(RelsError::MissingAttribute("Id"))?,
                    rel_type: rel_type.ok_or(RelsError::MissingAttribute("Type"))?,
                    target: target.ok_or(RelsError::MissingAttribute("Target"))?,
                    target_mode,
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// Serialize relationship entries back to a `.rels` payload.
pub fn write_relationships(rels: &[Relationship]) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for rel in rels {
        xml.push_str(r#"<Relationship Id=""#);
        xml.push_str(&crate::xml_escape::attr(&rel.id));
        xml.push_str(r#"" Type=""#);
        xml.push_str(&crate::xml_escape::attr(&rel.rel_type));
        xml.push_str(r#"" Target=""#);
        xml.push_str(&crate::xml_escape::attr(&rel.target));
        xml.push('"');
        if let Some(mode) = &rel.target_mode {
            xml.push_str(r#" TargetMode=""#);
            xml.push_str(&crate::xml_escape::attr(mode));
            xml.push('"');
        }
        xml.push_str("/>");
    }
    xml.push_str("</Relationships>");
    xml.into_bytes()
}

/// The `.rels` part name for a given part (`xl/workbook.xml` →
/// `xl/_rels/workbook.xml.rels`).
pub fn rels_for_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that declared it.
///
/// Targets are relative to the declaring part's directory; a leading `/`
/// makes them package-absolute. `..` segments are folded.
pub fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        return stripped.to_string();
    }

    let mut segments: Vec<&str> = match base_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Allocates unused `rIdN` relationship ids.
///
/// Seed it with every id the package already uses before asking for new ones;
/// ids are handed out from a monotonically increasing counter that skips any
/// seeded value.
#[derive(Clone, Debug, Default)]
pub struct RelIdAllocator {
    used: HashSet<String>,
    next: u32,
}

impl RelIdAllocator {
    pub fn new() -> Self {
        Self {
            used: HashSet::new(),
            next: 1,
        }
    }

    /// Mark an id as taken.
    pub fn claim(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }

    /// Mark a batch of ids as taken.
    pub fn seed<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.claim(id);
        }
    }

    /// Hand out the next unused `rIdN`.
    pub fn next_id(&mut self) -> String {
        loop {
            let candidate = format!("rId{}", self.next);
            self.next += 1;
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

pub(crate) fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().rposition(|&b| b == b':') {
        Some(idx) => &qname[idx + 1..],
        None => qname,
    }
}
