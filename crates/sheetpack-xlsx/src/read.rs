//! The Load pass: package → relationships → styles → shared strings →
//! worksheets → model.
//!
//! Structurally broken packages (missing workbook part, missing worksheet
//! part, dangling relationship) abort the load. Recognized-but-unmodeled
//! sheet kinds and pivot caches are recorded as stubs instead, so the rest
//! of the workbook stays usable.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use sheetpack_model::{
    Cell, CellFormula, CellRef, ColProperties, DateSystem, DefinedName, DefinedNameScope, Range,
    RowProperties, SharedStringPool, StyleTable, Workbook, Worksheet,
};
use thiserror::Error;

use crate::cells::{self, CellCodecError};
use crate::formulas::{self, PendingMember, SharedMaster};
use crate::package::{PackageError, SheetPackage};
use crate::relationships::{
    local_name, parse_relationships, rels_for_part, resolve_target, RelsError, Relationship,
    REL_TYPE_CHARTSHEET, REL_TYPE_SHARED_STRINGS, REL_TYPE_STYLES, REL_TYPE_WORKSHEET,
};
use crate::shared_strings::{
    attr_value, parse_shared_strings_xml, parse_string_item, read_text, SharedStringsError,
};
use crate::styles::{StylesError, StylesPart};
use crate::{CalcPr, DocMeta, SheetKind, SheetMeta, SpreadsheetDocument, UnsupportedPart};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error(transparent)]
    Rels(#[from] RelsError),
    #[error(transparent)]
    Styles(#[from] StylesError),
    #[error(transparent)]
    SharedStrings(#[from] SharedStringsError),
    #[error("cell {cell}: {source}")]
    Cell {
        cell: String,
        #[source]
        source: CellCodecError,
    },
    #[error("workbook sheet entry {0:?} has no matching relationship")]
    MissingWorkbookRelationship(String),
    #[error("invalid cell reference {0:?}")]
    InvalidCellRef(String),
    #[error("shared formula group {shared_index} referenced at {cell} has no master")]
    OrphanSharedFormula { shared_index: u32, cell: String },
    #[error("malformed worksheet xml: {0}")]
    Malformed(&'static str),
}

/// Load a package from a file on disk.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<SpreadsheetDocument, ReadError> {
    let bytes = std::fs::read(path)?;
    load_from_bytes(&bytes)
}

/// Load only the semantic model, discarding round-trip metadata.
pub fn read_workbook_from_bytes(bytes: &[u8]) -> Result<Workbook, ReadError> {
    Ok(load_from_bytes(bytes)?.workbook)
}

/// Load a package from bytes.
pub fn load_from_bytes(bytes: &[u8]) -> Result<SpreadsheetDocument, ReadError> {
    let package = SheetPackage::from_bytes(bytes)?;

    let workbook_xml = package.part_required("xl/workbook.xml")?;
    let workbook_parts = parse_workbook_xml(workbook_xml)?;

    let rels_bytes = package.part_required(&rels_for_part("xl/workbook.xml"))?;
    let rels = parse_relationships(rels_bytes)?;

    let mut workbook = Workbook::new();
    workbook.date_system = if workbook_parts.date1904 {
        DateSystem::Excel1904
    } else {
        DateSystem::Excel1900
    };

    let styles_target = relationship_target(&rels, REL_TYPE_STYLES)
        .unwrap_or_else(|| "xl/styles.xml".to_string());
    let styles_part = StylesPart::parse_or_default(package.part(&styles_target), &mut workbook.styles)?;

    let shared_strings_target = relationship_target(&rels, REL_TYPE_SHARED_STRINGS)
        .unwrap_or_else(|| "xl/sharedStrings.xml".to_string());
    let shared = match package.part(&shared_strings_target) {
        Some(bytes) => {
            SharedStringPool::from_items(parse_shared_strings_xml(std::str::from_utf8(bytes)?)?)
        }
        None => SharedStringPool::new(),
    };

    let mut meta = DocMeta {
        calc_pr: workbook_parts.calc_pr,
        ..DocMeta::default()
    };

    for entry in &workbook_parts.sheets {
        let rel = rels
            .iter()
            .find(|r| r.id == entry.relationship_id)
            .ok_or_else(|| {
                ReadError::MissingWorkbookRelationship(entry.relationship_id.clone())
            })?;
        let path = resolve_target("xl/workbook.xml", &rel.target);
        let worksheet_id = workbook.allocate_sheet_id();

        let kind = if rel.rel_type == REL_TYPE_WORKSHEET {
            let sheet_bytes = package.part_required(&path)?;
            let mut worksheet = Worksheet::new(worksheet_id, entry.name.clone());
            parse_worksheet_xml(
                sheet_bytes,
                &mut worksheet,
                &styles_part,
                &workbook.styles,
                &shared,
                workbook.date_system,
            )?;
            workbook.sheets.push(worksheet);
            SheetKind::Worksheet
        } else {
            // Keep the tab position and relationship identity; content stays
            // an opaque preserved part.
            workbook.sheets.push(Worksheet::new(worksheet_id, entry.name.clone()));
            SheetKind::Unsupported {
                reason: unsupported_sheet_reason(rel),
            }
        };

        meta.sheets.push(SheetMeta {
            worksheet_id,
            sheet_id: entry.sheet_id,
            relationship_id: entry.relationship_id.clone(),
            state: entry.state.clone(),
            path,
            kind,
        });
    }

    for raw in &workbook_parts.defined_names {
        let scope = match raw.local_sheet_index {
            Some(idx) => match meta.sheets.get(idx as usize) {
                Some(sheet_meta) => DefinedNameScope::Sheet(sheet_meta.worksheet_id),
                None => continue,
            },
            None => DefinedNameScope::Workbook,
        };
        workbook.defined_names.push(DefinedName {
            name: raw.name.clone(),
            formula: raw.formula.clone(),
            scope,
        });
    }

    collect_unsupported_pivot_caches(&package, &mut meta)?;

    Ok(SpreadsheetDocument::from_parts(workbook, package, meta))
}

fn relationship_target(rels: &[Relationship], rel_type: &str) -> Option<String> {
    rels.iter()
        .find(|r| r.rel_type == rel_type)
        .map(|r| resolve_target("xl/workbook.xml", &r.target))
}

fn unsupported_sheet_reason(rel: &Relationship) -> String {
    if rel.rel_type == REL_TYPE_CHARTSHEET {
        "chartsheet".to_string()
    } else {
        format!("sheet relationship type {} is not modeled", rel.rel_type)
    }
}

struct RawSheetEntry {
    name: String,
    sheet_id: u32,
    relationship_id: String,
    state: Option<String>,
}

struct RawDefinedName {
    name: String,
    formula: String,
    local_sheet_index: Option<u32>,
}

#[derive(Default)]
struct WorkbookParts {
    sheets: Vec<RawSheetEntry>,
    defined_names: Vec<RawDefinedName>,
    date1904: bool,
    calc_pr: CalcPr,
}

fn parse_workbook_xml(xml: &[u8]) -> Result<WorkbookParts, ReadError> {
    let text = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = WorkbookParts::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"workbookPr" => {
                if let Some(val) = attr_value(&e, b"date1904")? {
                    out.date1904 = val == "1" || val.eq_ignore_ascii_case("true");
                }
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"calcPr" => {
                out.calc_pr.calc_id = attr_value(&e, b"calcId")?;
                out.calc_pr.calc_mode = attr_value(&e, b"calcMode")?;
                out.calc_pr.full_calc_on_load = attr_value(&e, b"fullCalcOnLoad")?
                    .map(|v| v == "1" || v.eq_ignore_ascii_case("true"));
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut sheet_id = None;
                let mut rel_id = None;
                let mut state = None;
                for attr in e.attributes().with_checks(false) {
                    let attr = attr?;
                    let value = attr.unescape_value()?.into_owned();
                    match local_name(attr.key.as_ref()) {
                        b"name" => name = Some(value),
                        b"sheetId" => sheet_id = value.parse::<u32>().ok(),
                        b"id" => rel_id = Some(value),
                        b"state" => state = Some(value),
                        _ => {}
                    }
                }
                let (Some(name), Some(sheet_id), Some(relationship_id)) =
                    (name, sheet_id, rel_id)
                else {
                    return Err(ReadError::Malformed("sheet entry missing name/sheetId/r:id"));
                };
                out.sheets.push(RawSheetEntry {
                    name,
                    sheet_id,
                    relationship_id,
                    state,
                });
            }
            Event::Start(e) if e.local_name().as_ref() == b"definedName" => {
                let name = attr_value(&e, b"name")?;
                let local_sheet_index = attr_value(&e, b"localSheetId")?
                    .and_then(|v| v.parse::<u32>().ok());
                let formula = read_text(&mut reader, QName(b"definedName"))?;
                if let Some(name) = name {
                    out.defined_names.push(RawDefinedName {
                        name,
                        formula,
                        local_sheet_index,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

fn parse_worksheet_xml(
    xml: &[u8],
    worksheet: &mut Worksheet,
    styles_part: &StylesPart,
    style_table: &StyleTable,
    shared: &SharedStringPool,
    date_system: DateSystem,
) -> Result<(), ReadError> {
    let text = std::str::from_utf8(xml)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut masters: HashMap<u32, SharedMaster> = HashMap::new();
    let mut pending: Vec<PendingMember> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"col" => {
                parse_col(&e, worksheet, styles_part)?;
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                parse_row_props(&e, worksheet, styles_part)?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let e = e.into_owned();
                parse_cell(
                    &mut reader,
                    &e,
                    worksheet,
                    styles_part,
                    style_table,
                    shared,
                    date_system,
                    &mut masters,
                    &mut pending,
                )?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                // A self-closing cell can still carry a style reference.
                let cell_ref = required_cell_ref(&e)?;
                let style_id = cell_style_id(&e, styles_part)?;
                if style_id != 0 {
                    let mut cell = Cell::default();
                    cell.style_id = style_id;
                    worksheet.insert_cell(cell_ref, cell);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    formulas::resolve_shared_members(worksheet, &masters, &pending).map_err(|orphan| {
        ReadError::OrphanSharedFormula {
            shared_index: orphan.shared_index,
            cell: orphan.cell.to_a1(),
        }
    })?;

    Ok(())
}

fn parse_col(
    e: &quick_xml::events::BytesStart<'_>,
    worksheet: &mut Worksheet,
    styles_part: &StylesPart,
) -> Result<(), ReadError> {
    let min = attr_value(e, b"min")?.and_then(|v| v.parse::<u32>().ok());
    let max = attr_value(e, b"max")?.and_then(|v| v.parse::<u32>().ok());
    let (Some(min), Some(max)) = (min, max) else {
        return Ok(());
    };
    if min == 0 || max < min {
        return Ok(());
    }
    // A span ending at the sheet's last column is the "default column width"
    // convention, not per-column formatting; storing it per column would blow
    // the sparse map up to 16k entries.
    if max >= sheetpack_model::EXCEL_MAX_COLS {
        return Ok(());
    }

    let width = attr_value(e, b"width")?.and_then(|v| v.parse::<f64>().ok());
    let hidden = attr_value(e, b"hidden")?
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let style_id = match attr_value(e, b"style")?.and_then(|v| v.parse::<u32>().ok()) {
        Some(xf) => Some(styles_part.style_id_for_xf(xf)?),
        None => None,
    };

    let props = ColProperties {
        width,
        hidden,
        style_id,
    };
    if props == ColProperties::default() {
        return Ok(());
    }
    for col_1_based in min..=max.min(sheetpack_model::EXCEL_MAX_COLS) {
        worksheet.col_props.insert(col_1_based - 1, props.clone());
    }
    Ok(())
}

fn parse_row_props(
    e: &quick_xml::events::BytesStart<'_>,
    worksheet: &mut Worksheet,
    styles_part: &StylesPart,
) -> Result<(), ReadError> {
    let Some(row_1_based) = attr_value(e, b"r")?.and_then(|v| v.parse::<u32>().ok()) else {
        return Ok(());
    };
    if row_1_based == 0 || row_1_based > sheetpack_model::EXCEL_MAX_ROWS {
        return Ok(());
    }

    let height = attr_value(e, b"ht")?.and_then(|v| v.parse::<f64>().ok());
    let hidden = attr_value(e, b"hidden")?
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let custom_format = attr_value(e, b"customFormat")?
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let style_id = if custom_format {
        match attr_value(e, b"s")?.and_then(|v| v.parse::<u32>().ok()) {
            Some(xf) => Some(styles_part.style_id_for_xf(xf)?),
            None => None,
        }
    } else {
        None
    };

    let props = RowProperties {
        height,
        hidden,
        style_id,
    };
    if props != RowProperties::default() {
        worksheet.row_props.insert(row_1_based - 1, props);
    }
    Ok(())
}

fn required_cell_ref(e: &quick_xml::events::BytesStart<'_>) -> Result<CellRef, ReadError> {
    let raw = attr_value(e, b"r")?.ok_or(ReadError::Malformed("cell without r attribute"))?;
    CellRef::from_a1(&raw).map_err(|_| ReadError::InvalidCellRef(raw))
}

fn cell_style_id(
    e: &quick_xml::events::BytesStart<'_>,
    styles_part: &StylesPart,
) -> Result<u32, ReadError> {
    match attr_value(e, b"s")?.and_then(|v| v.parse::<u32>().ok()) {
        Some(xf) => Ok(styles_part.style_id_for_xf(xf)?),
        None => Ok(0),
    }
}

struct RawFormula {
    text: String,
    t: Option<String>,
    reference: Option<String>,
    shared_index: Option<u32>,
}

#[allow(clippy::too_many_arguments)]
fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: &quick_xml::events::BytesStart<'_>,
    worksheet: &mut Worksheet,
    styles_part: &StylesPart,
    style_table: &StyleTable,
    shared: &SharedStringPool,
    date_system: DateSystem,
    masters: &mut HashMap<u32, SharedMaster>,
    pending: &mut Vec<PendingMember>,
) -> Result<(), ReadError> {
    let cell_ref = required_cell_ref(start)?;
    let style_id = cell_style_id(start, styles_part)?;
    let type_attr = attr_value(start, b"t")?;

    let mut v_text: Option<String> = None;
    let mut inline: Option<sheetpack_model::RichText> = None;
    let mut raw_formula: Option<RawFormula> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"v" => {
                v_text = Some(read_text(reader, QName(b"v"))?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"v" => {
                v_text = Some(String::new());
            }
            Event::Start(e) if e.local_name().as_ref() == b"is" => {
                inline = Some(parse_string_item(reader, b"is")?);
            }
            Event::Start(e) if e.local_name().as_ref() == b"f" => {
                let t = attr_value(&e, b"t")?;
                let reference = attr_value(&e, b"ref")?;
                let shared_index =
                    attr_value(&e, b"si")?.and_then(|v| v.parse::<u32>().ok());
                let text = read_text(reader, QName(b"f"))?;
                raw_formula = Some(RawFormula {
                    text,
                    t,
                    reference,
                    shared_index,
                });
            }
            Event::Empty(e) if e.local_name().as_ref() == b"f" => {
                let t = attr_value(&e, b"t")?;
                let reference = attr_value(&e, b"ref")?;
                let shared_index =
                    attr_value(&e, b"si")?.and_then(|v| v.parse::<u32>().ok());
                raw_formula = Some(RawFormula {
                    text: String::new(),
                    t,
                    reference,
                    shared_index,
                });
            }
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"c" => break,
            Event::Eof => return Err(ReadError::Malformed("unexpected eof in <c>")),
            _ => {}
        }
        buf.clear();
    }

    let value_class = style_table
        .get(style_id)
        .map(|s| s.value_class())
        .unwrap_or(sheetpack_model::number_format::ValueClass::Number);

    let decoded = cells::decode_value(
        type_attr.as_deref(),
        v_text.as_deref(),
        inline,
        value_class,
        shared,
        date_system,
    )
    .map_err(|source| ReadError::Cell {
        cell: cell_ref.to_a1(),
        source,
    })?;

    let mut cell = Cell {
        value: decoded.value,
        formula: None,
        style_id,
        share_string: decoded.share_string,
    };

    if let Some(raw) = raw_formula {
        match raw.t.as_deref() {
            Some("array") => {
                let range = raw
                    .reference
                    .as_deref()
                    .and_then(|r| Range::from_a1(r).ok())
                    .unwrap_or_else(|| Range::new(cell_ref, cell_ref));
                cell.formula = Some(CellFormula::array(raw.text, range));
            }
            Some("shared") => {
                let Some(shared_index) = raw.shared_index else {
                    return Err(ReadError::Malformed("shared formula without si"));
                };
                let is_master = !raw.text.is_empty() && raw.reference.is_some();
                if is_master {
                    let range = raw
                        .reference
                        .as_deref()
                        .and_then(|r| Range::from_a1(r).ok())
                        .unwrap_or_else(|| Range::new(cell_ref, cell_ref));
                    masters.insert(
                        shared_index,
                        SharedMaster {
                            anchor: cell_ref,
                            range,
                            text: raw.text.clone(),
                        },
                    );
                    cell.formula = Some(CellFormula::new(raw.text));
                } else if !raw.text.is_empty() {
                    // Literal text without a range: behaves like a plain formula.
                    cell.formula = Some(CellFormula::new(raw.text));
                } else {
                    pending.push(PendingMember {
                        cell: cell_ref,
                        shared_index,
                    });
                }
            }
            // Data-table formulas are not modeled; the cached value is kept.
            Some("dataTable") => {}
            _ => {
                if !raw.text.is_empty() {
                    cell.formula = Some(CellFormula::new(raw.text));
                }
            }
        }
    }

    worksheet.insert_cell(cell_ref, cell);
    Ok(())
}

fn collect_unsupported_pivot_caches(
    package: &SheetPackage,
    meta: &mut DocMeta,
) -> Result<(), ReadError> {
    let cache_parts: Vec<String> = package
        .part_names()
        .filter(|name| {
            name.starts_with("xl/pivotCache/pivotCacheDefinition") && name.ends_with(".xml")
        })
        .map(|s| s.to_string())
        .collect();

    for path in cache_parts {
        let Some(bytes) = package.part(&path) else {
            continue;
        };
        if let Some(reason) = unsupported_cache_source(bytes)? {
            meta.unsupported_parts.push(UnsupportedPart { path, reason });
        }
    }
    Ok(())
}

/// Detect pivot caches whose source this codec does not model (anything that
/// is not a worksheet range: external workbooks, consolidations, scenarios).
fn unsupported_cache_source(xml: &[u8]) -> Result<Option<String>, ReadError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cache_source = false;
    let mut has_worksheet_source = false;
    let mut source_type: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"cacheSource" => {
                in_cache_source = true;
                source_type = attr_value(&e, b"type")?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"cacheSource" => {
                source_type = attr_value(&e, b"type")?;
                break;
            }
            Event::Start(e) | Event::Empty(e)
                if in_cache_source && e.local_name().as_ref() == b"worksheetSource" =>
            {
                has_worksheet_source = attr_value(&e, b"r")?.is_some()
                    || attr_value(&e, b"sheet")?.is_some()
                    || attr_value(&e, b"name")?.is_some();
            }
            Event::End(e) if e.local_name().as_ref() == b"cacheSource" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let is_worksheet = matches!(source_type.as_deref(), None | Some("worksheet"));
    if is_worksheet && has_worksheet_source {
        return Ok(None);
    }
    Ok(Some(format!(
        "pivot cache source type {:?} is not modeled",
        source_type.as_deref().unwrap_or("worksheet")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workbook_xml_parses_sheets_and_names() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr date1904="1"/>
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="Calc" sheetId="4" r:id="rId2" state="hidden"/>
  </sheets>
  <definedNames>
    <definedName name="target" localSheetId="1">Calc!$A$1</definedName>
    <definedName name="global">Data!$B$2</definedName>
  </definedNames>
  <calcPr calcId="125725" fullCalcOnLoad="1"/>
</workbook>"#;

        let parts = parse_workbook_xml(xml).unwrap();
        assert!(parts.date1904);
        assert_eq!(parts.sheets.len(), 2);
        assert_eq!(parts.sheets[0].name, "Data");
        assert_eq!(parts.sheets[1].sheet_id, 4);
        assert_eq!(parts.sheets[1].state.as_deref(), Some("hidden"));
        assert_eq!(parts.defined_names.len(), 2);
        assert_eq!(parts.defined_names[0].local_sheet_index, Some(1));
        assert_eq!(parts.defined_names[0].formula, "Calc!$A$1");
        assert_eq!(parts.calc_pr.calc_id.as_deref(), Some("125725"));
        assert_eq!(parts.calc_pr.full_calc_on_load, Some(true));
    }

    #[test]
    fn external_cache_source_is_unsupported() {
        let xml = br#"<pivotCacheDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <cacheSource type="external"/>
</pivotCacheDefinition>"#;
        let reason = unsupported_cache_source(xml).unwrap();
        assert!(reason.unwrap().contains("external"));
    }

    #[test]
    fn worksheet_cache_source_is_supported() {
        let xml = br#"<pivotCacheDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <cacheSource type="worksheet"><worksheetSource ref="A1:B4" sheet="Data"/></cacheSource>
</pivotCacheDefinition>"#;
        assert!(unsupported_cache_source(xml).unwrap().is_none());
    }
}
