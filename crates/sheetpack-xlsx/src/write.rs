//! The Save pass.
//!
//! The in-memory model is walked exactly once. The style, shared-string and
//! calculation-chain registries are rebuilt from scratch (never patched),
//! while part and relationship identity is preserved for everything that
//! still exists: surviving sheets keep their `r:id`, `sheetId` and part path;
//! untouched parts are carried through byte-identical; deleted sheets cascade
//! through their dependent parts, relationships, and content-type entries.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use sheetpack_model::{
    Cell, CellRef, DateSystem, DefinedNameScope, RichText, SharedStringPool, Worksheet,
};
use thiserror::Error;

use crate::calc_chain::{build_calc_chain, write_calc_chain_xml};
use crate::cells::{encode_value, WireBody};
use crate::formulas::{plan_formulas, FormulaPlan, FormulaRole};
use crate::package::{PackageError, SheetPackage};
use crate::relationships::{
    parse_relationships, rels_for_part, resolve_target, write_relationships, RelIdAllocator,
    Relationship, RelsError, REL_TYPE_CALC_CHAIN, REL_TYPE_SHARED_STRINGS, REL_TYPE_STYLES,
    REL_TYPE_TABLE, REL_TYPE_WORKSHEET,
};
use crate::shared_strings::{write_shared_strings_xml, write_string_item_body};
use crate::styles::{StylesError, StylesPart};
use crate::xml_dom::{XmlDomError, XmlEl};
use crate::xml_escape;
use crate::{SheetKind, SheetMeta, SpreadsheetDocument};

const CONTENT_TYPE_WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CONTENT_TYPE_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CONTENT_TYPE_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CONTENT_TYPE_SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
const CONTENT_TYPE_CALC_CHAIN: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("xml error: {0}")]
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
    XmlDom(#[from] XmlDomError),
    /// Internal invariant violations: these indicate a bug in the codec (or a
    /// model mutated into an inconsistent state), not bad input, and they
    /// abort the save.
    #[error("array formula range {range} member {cell} holds its own formula")]
    ArrayMemberConflict { range: String, cell: String },
    #[error("duplicate relationship id {0} in workbook rels")]
    DuplicateRelationshipId(String),
    #[error("sheet metadata references missing worksheet id {0}")]
    MissingWorksheet(u32),
}

/// Serialize the document to XLSX bytes.
///
/// The save either produces a complete package or fails; partially written
/// output is never returned.
pub fn write_to_vec(doc: &SpreadsheetDocument) -> Result<Vec<u8>, WriteError> {
    let mut package = doc.package.clone();
    let is_new = !package.contains("xl/workbook.xml");
    if is_new {
        seed_minimal_package(&mut package);
    }

    // Cascade deletions first so later steps see the final part set.
    for deleted in &doc.meta.deleted_sheets {
        cascade_delete_sheet(&mut package, deleted, &doc.workbook_name_of_deleted(deleted))?;
    }

    let sheet_metas = resolve_sheet_metas(doc, &package)?;

    // Styles: rebuilt from scratch on every save.
    let mut styles_scratch = doc.workbook.styles.clone();
    let mut styles_part = StylesPart::for_write(&mut styles_scratch)?;
    let used_style_ids = collect_used_style_ids(doc);
    let xf_map = styles_part.xf_indices_for_style_ids(used_style_ids, &styles_scratch)?;
    package.set_part("xl/styles.xml", styles_part.to_xml_bytes());

    // Shared strings: rebuilt from scratch; the pool fills while the sheets
    // render, counting one reference per interning cell.
    let mut pool = SharedStringPool::new();
    let mut total_refs: u64 = 0;

    for meta in &sheet_metas {
        if !meta.kind.is_supported() {
            continue;
        }
        let sheet = doc
            .workbook
            .sheet(meta.worksheet_id)
            .ok_or(WriteError::MissingWorksheet(meta.worksheet_id))?;

        let plan = plan_formulas(sheet);
        validate_array_members(sheet, &plan)?;

        let sheet_data = render_sheet_data(
            sheet,
            &plan,
            &xf_map,
            doc.workbook.date_system,
            &mut pool,
            &mut total_refs,
        );
        let cols = render_cols(sheet, &xf_map);
        let xml = match package.part(&meta.path) {
            Some(original) => patch_worksheet_xml(original, &cols, &sheet_data)?,
            None => generate_worksheet_xml(sheet, &cols, &sheet_data),
        };
        package.set_part(meta.path.clone(), xml);
    }

    if pool.unique_count() > 0 || package.contains("xl/sharedStrings.xml") {
        let items: Vec<RichText> = pool.iter().cloned().collect();
        package.set_part(
            "xl/sharedStrings.xml",
            write_shared_strings_xml(&items, total_refs),
        );
    }

    // Calculation chain: rebuilt unconditionally; stale entries are purged by
    // construction, and an empty chain means no part at all.
    let chain = build_calc_chain(&doc.workbook, &sheet_metas);
    match write_calc_chain_xml(&chain) {
        Some(bytes) => package.set_part("xl/calcChain.xml", bytes),
        None => {
            package.remove_part("xl/calcChain.xml");
        }
    }

    // Workbook part.
    let workbook_xml = match package.part("xl/workbook.xml") {
        Some(original) if !is_new => patch_workbook_xml(doc, &sheet_metas, original)?,
        _ => generate_workbook_xml(doc, &sheet_metas),
    };
    package.set_part("xl/workbook.xml", workbook_xml);

    rebuild_workbook_rels(&mut package, &sheet_metas)?;
    rebuild_content_types(&mut package, &sheet_metas)?;

    Ok(package.to_vec()?)
}

/// Serialize straight to a file.
pub fn write_to_path(doc: &SpreadsheetDocument, path: impl AsRef<Path>) -> Result<(), WriteError> {
    let bytes = write_to_vec(doc)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a bare workbook into a fresh package.
pub fn write_workbook_to_vec(
    workbook: &sheetpack_model::Workbook,
) -> Result<Vec<u8>, WriteError> {
    write_to_vec(&SpreadsheetDocument::new(workbook.clone()))
}

impl SpreadsheetDocument {
    /// Best-effort name lookup for a deleted sheet (used by the pivot-cache
    /// cascade, which matches caches by source sheet name).
    fn workbook_name_of_deleted(&self, meta: &SheetMeta) -> String {
        self.meta
            .deleted_sheet_names
            .get(&meta.worksheet_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn seed_minimal_package(package: &mut SheetPackage) {
    package.set_part(
        "_rels/.rels",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>
"#
        .to_vec(),
    );
    package.set_part(
        "[Content_Types].xml",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
</Types>
"#
        .to_vec(),
    );
}

/// Remove a deleted worksheet's part plus everything only it referenced:
/// its `.rels`, its table-definition parts, and pivot-cache-definition parts
/// sourced from the sheet. Orphaned references left behind would make the
/// package unreadable, so this errs on the side of removing.
fn cascade_delete_sheet(
    package: &mut SheetPackage,
    meta: &SheetMeta,
    sheet_name: &str,
) -> Result<(), WriteError> {
    let rels_name = rels_for_part(&meta.path);
    if let Some(rels_bytes) = package.part(&rels_name).map(|b| b.to_vec()) {
        for rel in parse_relationships(&rels_bytes)? {
            if rel.is_external() {
                continue;
            }
            if rel.rel_type == REL_TYPE_TABLE {
                let target = resolve_target(&meta.path, &rel.target);
                package.remove_part(&target);
            }
        }
    }
    package.remove_part(&meta.path);
    package.remove_part(&rels_name);

    if !sheet_name.is_empty() {
        remove_pivot_caches_sourced_from(package, sheet_name)?;
    }
    Ok(())
}

fn remove_pivot_caches_sourced_from(
    package: &mut SheetPackage,
    sheet_name: &str,
) -> Result<(), WriteError> {
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
        if !pivot_cache_sources_sheet(bytes, sheet_name)? {
            continue;
        }

        // Remove the definition, its rels, and every internal target of its
        // rels (the records part).
        let rels_name = rels_for_part(&path);
        if let Some(rels_bytes) = package.part(&rels_name).map(|b| b.to_vec()) {
            for rel in parse_relationships(&rels_bytes)? {
                if !rel.is_external() {
                    let target = resolve_target(&path, &rel.target);
                    package.remove_part(&target);
                }
            }
        }
        package.remove_part(&rels_name);
        package.remove_part(&path);
    }
    Ok(())
}

fn pivot_cache_sources_sheet(xml: &[u8], sheet_name: &str) -> Result<bool, WriteError> {
    let root = XmlEl::parse(xml)?;
    let Some(cache_source) = root.child("cacheSource") else {
        return Ok(false);
    };
    let found = cache_source
        .children_by_name("worksheetSource")
        .any(|ws| ws.attr("sheet") == Some(sheet_name));
    Ok(found)
}

/// Metadata for every sheet in the workbook, in tab order: preserved entries
/// for surviving sheets, fresh identities for sheets added since load.
fn resolve_sheet_metas(
    doc: &SpreadsheetDocument,
    package: &SheetPackage,
) -> Result<Vec<SheetMeta>, WriteError> {
    let mut alloc = RelIdAllocator::new();
    if let Some(rels_bytes) = package.part(&rels_for_part("xl/workbook.xml")) {
        for rel in parse_relationships(rels_bytes)? {
            alloc.claim(&rel.id);
        }
    }
    for meta in &doc.meta.sheets {
        alloc.claim(&meta.relationship_id);
    }

    let mut max_sheet_id: u32 = doc.meta.sheets.iter().map(|m| m.sheet_id).max().unwrap_or(0);
    let used_paths: HashSet<String> = doc.meta.sheets.iter().map(|m| m.path.clone()).collect();
    let mut next_path_index = 1u32;
    let mut next_path = || loop {
        let candidate = format!("xl/worksheets/sheet{next_path_index}.xml");
        next_path_index += 1;
        if !used_paths.contains(&candidate) && !package.contains(&candidate) {
            return candidate;
        }
    };

    let mut out = Vec::with_capacity(doc.workbook.sheets.len());
    for sheet in &doc.workbook.sheets {
        match doc.meta.sheets.iter().find(|m| m.worksheet_id == sheet.id) {
            Some(existing) => out.push(existing.clone()),
            None => {
                max_sheet_id += 1;
                out.push(SheetMeta {
                    worksheet_id: sheet.id,
                    sheet_id: max_sheet_id,
                    relationship_id: alloc.next_id(),
                    state: None,
                    path: next_path(),
                    kind: SheetKind::Worksheet,
                });
            }
        }
    }
    Ok(out)
}

fn collect_used_style_ids(doc: &SpreadsheetDocument) -> Vec<u32> {
    let mut ids = Vec::new();
    for sheet in &doc.workbook.sheets {
        for (_, cell) in sheet.iter_cells() {
            if cell.style_id != 0 {
                ids.push(cell.style_id);
            }
        }
        for props in sheet.row_props.values() {
            if let Some(id) = props.style_id {
                ids.push(id);
            }
        }
        for props in sheet.col_props.values() {
            if let Some(id) = props.style_id {
                ids.push(id);
            }
        }
    }
    ids
}

fn validate_array_members(sheet: &Worksheet, plan: &FormulaPlan) -> Result<(), WriteError> {
    for (cell, _) in sheet.iter_formula_cells() {
        if matches!(plan.role(cell), Some(FormulaRole::ArrayMember)) {
            // A member cell inside someone else's array range must not carry
            // its own formula; the file would have two owners for one cell.
            let range = sheet
                .iter_formula_cells()
                .find_map(|(_, f)| match f.kind {
                    sheetpack_model::FormulaKind::Array { range } if range.contains(cell) => {
                        Some(range)
                    }
                    _ => None,
                })
                .map(|r| r.to_string())
                .unwrap_or_default();
            return Err(WriteError::ArrayMemberConflict {
                range,
                cell: cell.to_a1(),
            });
        }
    }
    Ok(())
}

fn render_sheet_data(
    sheet: &Worksheet,
    plan: &FormulaPlan,
    xf_map: &HashMap<u32, u32>,
    date_system: DateSystem,
    pool: &mut SharedStringPool,
    total_refs: &mut u64,
) -> String {
    let mut out = String::new();
    out.push_str("<sheetData>");

    // Rows come from both populated cells and bare row properties. Cells are
    // grouped up front so rendering stays linear in the cell count.
    let mut cells_by_row: std::collections::BTreeMap<u32, Vec<(CellRef, &Cell)>> =
        std::collections::BTreeMap::new();
    for (cell_ref, cell) in sheet.iter_cells() {
        cells_by_row.entry(cell_ref.row).or_default().push((cell_ref, cell));
    }

    let mut rows: Vec<u32> = cells_by_row.keys().copied().collect();
    rows.extend(sheet.row_props.keys().copied());
    rows.sort_unstable();
    rows.dedup();

    for row in rows {
        let row_1_based = row + 1;
        out.push_str(&format!(r#"<row r="{row_1_based}""#));
        if let Some(props) = sheet.row_props.get(&row) {
            if let Some(height) = props.height {
                out.push_str(&format!(r#" ht="{height}" customHeight="1""#));
            }
            if props.hidden {
                out.push_str(r#" hidden="1""#);
            }
            if let Some(style_id) = props.style_id {
                if let Some(xf) = xf_map.get(&style_id) {
                    out.push_str(&format!(r#" s="{xf}" customFormat="1""#));
                }
            }
        }
        out.push('>');

        for (cell_ref, cell) in cells_by_row.get(&row).into_iter().flatten() {
            render_cell(
                &mut out, *cell_ref, cell, plan, xf_map, date_system, pool, total_refs,
            );
        }

        out.push_str("</row>");
    }

    out.push_str("</sheetData>");
    out
}

#[allow(clippy::too_many_arguments)]
fn render_cell(
    out: &mut String,
    cell_ref: CellRef,
    cell: &Cell,
    plan: &FormulaPlan,
    xf_map: &HashMap<u32, u32>,
    date_system: DateSystem,
    pool: &mut SharedStringPool,
    total_refs: &mut u64,
) {
    out.push_str(r#"<c r=""#);
    out.push_str(&cell_ref.to_a1());
    out.push('"');

    if cell.style_id != 0 {
        if let Some(xf) = xf_map.get(&cell.style_id) {
            out.push_str(&format!(r#" s="{xf}""#));
        }
    }

    let role = plan.role(cell_ref);
    let has_formula = cell.formula.is_some()
        || matches!(
            role,
            Some(FormulaRole::SharedMember { .. } | FormulaRole::ArrayMember)
        );

    let encoded = encode_value(
        &cell.value,
        cell.share_string,
        has_formula,
        date_system,
        |rich| {
            *total_refs += 1;
            pool.intern(rich.clone())
        },
    );

    if let Some(t) = encoded.type_attr {
        out.push_str(&format!(r#" t="{t}""#));
    }
    out.push('>');

    match role {
        Some(FormulaRole::SharedAnchor {
            shared_index,
            range,
        }) => {
            let text = cell.formula.as_ref().map(|f| f.text.as_str()).unwrap_or("");
            out.push_str(&format!(
                r#"<f t="shared" ref="{range}" si="{shared_index}">{}</f>"#,
                xml_escape::text(text)
            ));
        }
        Some(FormulaRole::SharedMember { shared_index }) => {
            out.push_str(&format!(r#"<f t="shared" si="{shared_index}"/>"#));
        }
        Some(FormulaRole::ArrayAnchor { range }) => {
            let text = cell.formula.as_ref().map(|f| f.text.as_str()).unwrap_or("");
            out.push_str(&format!(
                r#"<f t="array" ref="{range}">{}</f>"#,
                xml_escape::text(text)
            ));
        }
        Some(FormulaRole::ArrayMember) => {}
        Some(FormulaRole::Normal) => {
            if let Some(formula) = &cell.formula {
                if !formula.text.is_empty() {
                    out.push_str(&format!("<f>{}</f>", xml_escape::text(&formula.text)));
                }
            }
        }
        None => {}
    }

    match encoded.body {
        WireBody::None => {}
        WireBody::Value(v) => {
            out.push_str("<v>");
            out.push_str(&xml_escape::text(&v));
            out.push_str("</v>");
        }
        WireBody::InlineString(rich) => {
            out.push_str("<is>");
            write_string_item_body(out, &rich);
            out.push_str("</is>");
        }
    }

    out.push_str("</c>");
}

/// Render the `<cols>` section, coalescing adjacent columns with identical
/// properties into ranged `<col>` records. Empty when no column carries
/// properties.
fn render_cols(sheet: &Worksheet, xf_map: &HashMap<u32, u32>) -> String {
    if sheet.col_props.is_empty() {
        return String::new();
    }

    let mut xml = String::from("<cols>");
    let mut run: Option<(u32, u32, &sheetpack_model::ColProperties)> = None;

    let mut flush = |xml: &mut String, (min, max, props): (u32, u32, &sheetpack_model::ColProperties)| {
        xml.push_str(&format!(r#"<col min="{}" max="{}""#, min + 1, max + 1));
        if let Some(width) = props.width {
            xml.push_str(&format!(r#" width="{width}" customWidth="1""#));
        }
        if props.hidden {
            xml.push_str(r#" hidden="1""#);
        }
        if let Some(style_id) = props.style_id {
            if let Some(xf) = xf_map.get(&style_id) {
                xml.push_str(&format!(r#" style="{xf}""#));
            }
        }
        xml.push_str("/>");
    };

    for (&col, props) in &sheet.col_props {
        match run {
            Some((min, max, run_props)) if max + 1 == col && run_props == props => {
                run = Some((min, col, run_props));
            }
            Some(prev) => {
                flush(&mut xml, prev);
                run = Some((col, col, props));
            }
            None => run = Some((col, col, props)),
        }
    }
    if let Some(last) = run {
        flush(&mut xml, last);
    }

    xml.push_str("</cols>");
    xml
}

/// Rewrite the `<cols>` and `<sheetData>` sections of an existing worksheet
/// part, leaving every other section (views, merges, conditional formatting,
/// page setup…) untouched. A missing `<cols>` section is inserted before
/// `sheetData` when the sheet now carries column properties.
fn patch_worksheet_xml(
    original: &[u8],
    cols_xml: &str,
    sheet_data_xml: &str,
) -> Result<Vec<u8>, WriteError> {
    let mut reader = Reader::from_reader(original);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut writer = Writer::new(Vec::with_capacity(original.len() + sheet_data_xml.len()));

    let mut skipping_sheet_data = false;
    let mut skipping_cols = false;
    let mut wrote_cols = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"cols" => {
                skipping_cols = true;
                writer.get_mut().extend_from_slice(cols_xml.as_bytes());
                wrote_cols = true;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"cols" => {
                writer.get_mut().extend_from_slice(cols_xml.as_bytes());
                wrote_cols = true;
                drop(e);
            }
            Event::End(e) if e.local_name().as_ref() == b"cols" => {
                skipping_cols = false;
                drop(e);
            }

            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                skipping_sheet_data = true;
                if !wrote_cols && !cols_xml.is_empty() {
                    writer.get_mut().extend_from_slice(cols_xml.as_bytes());
                    wrote_cols = true;
                }
                writer.get_mut().extend_from_slice(sheet_data_xml.as_bytes());
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                if !wrote_cols && !cols_xml.is_empty() {
                    writer.get_mut().extend_from_slice(cols_xml.as_bytes());
                    wrote_cols = true;
                }
                writer.get_mut().extend_from_slice(sheet_data_xml.as_bytes());
                drop(e);
            }
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => {
                skipping_sheet_data = false;
                drop(e);
            }
            Event::Eof => break,
            ev if skipping_sheet_data || skipping_cols => drop(ev),
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn generate_worksheet_xml(sheet: &Worksheet, cols_xml: &str, sheet_data_xml: &str) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );

    if let Some(range) = sheet.used_range() {
        xml.push_str(&format!(r#"<dimension ref="{range}"/>"#));
    }

    xml.push_str(cols_xml);
    xml.push_str(sheet_data_xml);
    xml.push_str("</worksheet>");
    xml.into_bytes()
}

fn sheet_entries_xml(doc: &SpreadsheetDocument, sheet_metas: &[SheetMeta]) -> String {
    let mut xml = String::new();
    for meta in sheet_metas {
        let name = doc
            .workbook
            .sheet(meta.worksheet_id)
            .map(|s| s.name.as_str())
            .unwrap_or("Sheet");
        xml.push_str("<sheet");
        xml.push_str(&format!(r#" name="{}""#, xml_escape::attr(name)));
        xml.push_str(&format!(r#" sheetId="{}""#, meta.sheet_id));
        xml.push_str(&format!(
            r#" r:id="{}""#,
            xml_escape::attr(&meta.relationship_id)
        ));
        if let Some(state) = &meta.state {
            xml.push_str(&format!(r#" state="{}""#, xml_escape::attr(state)));
        }
        xml.push_str("/>");
    }
    xml
}

fn defined_names_xml(doc: &SpreadsheetDocument, sheet_metas: &[SheetMeta]) -> Option<String> {
    if doc.workbook.defined_names.is_empty() {
        return None;
    }

    let mut xml = String::from("<definedNames>");
    let mut wrote_any = false;
    for name in &doc.workbook.defined_names {
        let local_sheet_id = match name.scope {
            DefinedNameScope::Workbook => None,
            DefinedNameScope::Sheet(ws_id) => {
                match sheet_metas.iter().position(|m| m.worksheet_id == ws_id) {
                    Some(idx) => Some(idx),
                    // Scope sheet no longer exists; the name goes with it.
                    None => continue,
                }
            }
        };
        xml.push_str(&format!(
            r#"<definedName name="{}""#,
            xml_escape::attr(&name.name)
        ));
        if let Some(idx) = local_sheet_id {
            xml.push_str(&format!(r#" localSheetId="{idx}""#));
        }
        xml.push('>');
        xml.push_str(&xml_escape::text(&name.formula));
        xml.push_str("</definedName>");
        wrote_any = true;
    }
    xml.push_str("</definedNames>");
    wrote_any.then_some(xml)
}

fn calc_pr_xml(doc: &SpreadsheetDocument) -> Option<String> {
    let calc_pr = &doc.meta.calc_pr;
    if calc_pr.calc_id.is_none() && calc_pr.calc_mode.is_none() && calc_pr.full_calc_on_load.is_none()
    {
        return None;
    }
    let mut xml = String::from("<calcPr");
    if let Some(calc_id) = &calc_pr.calc_id {
        xml.push_str(&format!(r#" calcId="{}""#, xml_escape::attr(calc_id)));
    }
    if let Some(calc_mode) = &calc_pr.calc_mode {
        xml.push_str(&format!(r#" calcMode="{}""#, xml_escape::attr(calc_mode)));
    }
    if let Some(full) = calc_pr.full_calc_on_load {
        xml.push_str(&format!(
            r#" fullCalcOnLoad="{}""#,
            if full { "1" } else { "0" }
        ));
    }
    xml.push_str("/>");
    Some(xml)
}

fn generate_workbook_xml(doc: &SpreadsheetDocument, sheet_metas: &[SheetMeta]) -> Vec<u8> {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    xml.push_str("<workbookPr");
    if doc.workbook.date_system == DateSystem::Excel1904 {
        xml.push_str(r#" date1904="1""#);
    }
    xml.push_str("/>");
    xml.push_str("<sheets>");
    xml.push_str(&sheet_entries_xml(doc, sheet_metas));
    xml.push_str("</sheets>");
    if let Some(defined_names) = defined_names_xml(doc, sheet_metas) {
        xml.push_str(&defined_names);
    }
    if let Some(calc_pr) = calc_pr_xml(doc) {
        xml.push_str(&calc_pr);
    }
    xml.push_str("</workbook>");
    xml.into_bytes()
}

/// Patch an existing `xl/workbook.xml`: the `<sheets>`, `<definedNames>`,
/// `<workbookPr>` and `<calcPr>` sections are regenerated from the model,
/// everything else is copied through.
fn patch_workbook_xml(
    doc: &SpreadsheetDocument,
    sheet_metas: &[SheetMeta],
    original: &[u8],
) -> Result<Vec<u8>, WriteError> {
    let defined_names = defined_names_xml(doc, sheet_metas);
    let had_defined_names = {
        let text = std::str::from_utf8(original)?;
        text.contains("definedNames")
    };

    let mut reader = Reader::from_reader(original);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut writer = Writer::new(Vec::with_capacity(original.len()));

    let mut skipping_sheets = false;
    let mut skipping_defined_names = false;
    let mut skipping_workbook_pr = false;
    let mut skipping_calc_pr = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"workbookPr" => {
                skipping_workbook_pr = true;
                write_workbook_pr(doc, &mut writer, &e)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"workbookPr" => {
                write_workbook_pr(doc, &mut writer, &e)?;
            }
            Event::End(e) if e.local_name().as_ref() == b"workbookPr" => {
                if skipping_workbook_pr {
                    skipping_workbook_pr = false;
                } else {
                    writer.write_event(Event::End(e.into_owned()))?;
                }
            }

            Event::Start(e) if e.local_name().as_ref() == b"calcPr" => {
                skipping_calc_pr = true;
                if let Some(calc_pr) = calc_pr_xml(doc) {
                    writer.get_mut().extend_from_slice(calc_pr.as_bytes());
                }
                drop(e);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"calcPr" => {
                if let Some(calc_pr) = calc_pr_xml(doc) {
                    writer.get_mut().extend_from_slice(calc_pr.as_bytes());
                }
                drop(e);
            }
            Event::End(e) if e.local_name().as_ref() == b"calcPr" => {
                if skipping_calc_pr {
                    skipping_calc_pr = false;
                } else {
                    writer.write_event(Event::End(e.into_owned()))?;
                }
            }

            Event::Start(e) if e.local_name().as_ref() == b"sheets" => {
                skipping_sheets = true;
                writer.get_mut().extend_from_slice(b"<sheets>");
                writer
                    .get_mut()
                    .extend_from_slice(sheet_entries_xml(doc, sheet_metas).as_bytes());
                drop(e);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheets" => {
                writer.get_mut().extend_from_slice(b"<sheets>");
                writer
                    .get_mut()
                    .extend_from_slice(sheet_entries_xml(doc, sheet_metas).as_bytes());
                writer.get_mut().extend_from_slice(b"</sheets>");
                if !had_defined_names {
                    if let Some(names) = &defined_names {
                        writer.get_mut().extend_from_slice(names.as_bytes());
                    }
                }
                drop(e);
            }
            Event::End(e) if e.local_name().as_ref() == b"sheets" => {
                skipping_sheets = false;
                writer.get_mut().extend_from_slice(b"</sheets>");
                if !had_defined_names {
                    if let Some(names) = &defined_names {
                        writer.get_mut().extend_from_slice(names.as_bytes());
                    }
                }
                drop(e);
            }

            Event::Start(e) if e.local_name().as_ref() == b"definedNames" => {
                skipping_defined_names = true;
                if let Some(names) = &defined_names {
                    writer.get_mut().extend_from_slice(names.as_bytes());
                }
                drop(e);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"definedNames" => {
                if let Some(names) = &defined_names {
                    writer.get_mut().extend_from_slice(names.as_bytes());
                }
                drop(e);
            }
            Event::End(e) if e.local_name().as_ref() == b"definedNames" => {
                skipping_defined_names = false;
                drop(e);
            }

            Event::Eof => break,
            ev if skipping_sheets || skipping_defined_names || skipping_workbook_pr
                || skipping_calc_pr =>
            {
                drop(ev)
            }
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn write_workbook_pr(
    doc: &SpreadsheetDocument,
    writer: &mut Writer<Vec<u8>>,
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<(), WriteError> {
    let had_date1904 = e
        .attributes()
        .flatten()
        .any(|a| a.key.as_ref() == b"date1904");

    writer.get_mut().extend_from_slice(b"<workbookPr");
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"date1904" {
            continue;
        }
        writer.get_mut().push(b' ');
        writer.get_mut().extend_from_slice(attr.key.as_ref());
        writer.get_mut().extend_from_slice(b"=\"");
        writer
            .get_mut()
            .extend_from_slice(xml_escape::attr(&attr.unescape_value()?.into_owned()).as_bytes());
        writer.get_mut().push(b'"');
    }

    if doc.workbook.date_system == DateSystem::Excel1904 {
        writer.get_mut().extend_from_slice(b" date1904=\"1\"");
    } else if had_date1904 {
        writer.get_mut().extend_from_slice(b" date1904=\"0\"");
    }
    writer.get_mut().extend_from_slice(b"/>");
    Ok(())
}

/// Rebuild `xl/_rels/workbook.xml.rels`: keep every relationship whose target
/// still exists (or is external), then make sure the core parts are linked.
fn rebuild_workbook_rels(
    package: &mut SheetPackage,
    sheet_metas: &[SheetMeta],
) -> Result<(), WriteError> {
    let rels_name = rels_for_part("xl/workbook.xml");
    let mut rels = match package.part(&rels_name) {
        Some(bytes) => parse_relationships(bytes)?,
        None => Vec::new(),
    };

    rels.retain(|rel| {
        rel.is_external() || {
            let target = resolve_target("xl/workbook.xml", &rel.target);
            package.contains(&target)
        }
    });

    let mut alloc = RelIdAllocator::new();
    for rel in &rels {
        alloc.claim(&rel.id);
    }
    for meta in sheet_metas {
        alloc.claim(&meta.relationship_id);
    }

    for meta in sheet_metas {
        if rels.iter().any(|r| r.id == meta.relationship_id) {
            continue;
        }
        if !meta.kind.is_supported() {
            // Stub sheets keep whatever relationship they arrived with; if it
            // is gone the part went with it, and there is nothing to re-link.
            continue;
        }
        rels.push(Relationship {
            id: meta.relationship_id.clone(),
            rel_type: REL_TYPE_WORKSHEET.to_string(),
            target: meta
                .path
                .strip_prefix("xl/")
                .unwrap_or(&meta.path)
                .to_string(),
            target_mode: None,
        });
    }

    let mut ensure = |rel_type: &str, target: &str, part: &str, rels: &mut Vec<Relationship>| {
        if package.contains(part) && !rels.iter().any(|r| r.rel_type == rel_type) {
            rels.push(Relationship {
                id: alloc.next_id(),
                rel_type: rel_type.to_string(),
                target: target.to_string(),
                target_mode: None,
            });
        }
    };
    ensure(REL_TYPE_STYLES, "styles.xml", "xl/styles.xml", &mut rels);
    ensure(
        REL_TYPE_SHARED_STRINGS,
        "sharedStrings.xml",
        "xl/sharedStrings.xml",
        &mut rels,
    );
    ensure(
        REL_TYPE_CALC_CHAIN,
        "calcChain.xml",
        "xl/calcChain.xml",
        &mut rels,
    );

    let mut seen = HashSet::new();
    for rel in &rels {
        if !seen.insert(rel.id.clone()) {
            return Err(WriteError::DuplicateRelationshipId(rel.id.clone()));
        }
    }

    package.set_part(rels_name, write_relationships(&rels));
    Ok(())
}

/// Rebuild `[Content_Types].xml`: defaults are kept (and the two required
/// ones ensured), overrides for vanished parts are dropped, and overrides for
/// every part this codec owns are ensured.
fn rebuild_content_types(
    package: &mut SheetPackage,
    sheet_metas: &[SheetMeta],
) -> Result<(), WriteError> {
    let mut defaults: Vec<(String, String)> = Vec::new();
    let mut overrides: Vec<(String, String)> = Vec::new();

    if let Some(bytes) = package.part("[Content_Types].xml") {
        let root = XmlEl::parse(bytes)?;
        for default in root.children_by_name("Default") {
            if let (Some(ext), Some(ct)) = (default.attr("Extension"), default.attr("ContentType"))
            {
                defaults.push((ext.to_string(), ct.to_string()));
            }
        }
        for over in root.children_by_name("Override") {
            if let (Some(part), Some(ct)) = (over.attr("PartName"), over.attr("ContentType")) {
                let part_path = part.trim_start_matches('/');
                if package.contains(part_path) {
                    overrides.push((part.to_string(), ct.to_string()));
                }
            }
        }
    }

    let mut ensure_default = |ext: &str, ct: &str, defaults: &mut Vec<(String, String)>| {
        if !defaults.iter().any(|(e, _)| e.eq_ignore_ascii_case(ext)) {
            defaults.push((ext.to_string(), ct.to_string()));
        }
    };
    ensure_default(
        "rels",
        "application/vnd.openxmlformats-package.relationships+xml",
        &mut defaults,
    );
    ensure_default("xml", "application/xml", &mut defaults);

    let mut ensure_override = |part: &str, ct: &str, overrides: &mut Vec<(String, String)>| {
        let part_name = format!("/{part}");
        if package.contains(part) && !overrides.iter().any(|(p, _)| p == &part_name) {
            overrides.push((part_name, ct.to_string()));
        }
    };
    ensure_override("xl/workbook.xml", CONTENT_TYPE_WORKBOOK, &mut overrides);
    ensure_override("xl/styles.xml", CONTENT_TYPE_STYLES, &mut overrides);
    ensure_override(
        "xl/sharedStrings.xml",
        CONTENT_TYPE_SHARED_STRINGS,
        &mut overrides,
    );
    ensure_override("xl/calcChain.xml", CONTENT_TYPE_CALC_CHAIN, &mut overrides);
    for meta in sheet_metas {
        if meta.kind.is_supported() {
            ensure_override(&meta.path, CONTENT_TYPE_WORKSHEET, &mut overrides);
        }
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    for (ext, ct) in &defaults {
        xml.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            xml_escape::attr(ext),
            xml_escape::attr(ct)
        ));
    }
    for (part, ct) in &overrides {
        xml.push_str(&format!(
            r#"<Override PartName="{}" ContentType="{}"/>"#,
            xml_escape::attr(part),
            xml_escape::attr(ct)
        ));
    }
    xml.push_str("</Types>");

    package.set_part("[Content_Types].xml", xml.into_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetpack_model::{CellValue, Workbook};

    #[test]
    fn new_workbook_produces_a_complete_package() {
        let mut wb = Workbook::new();
        let ws = wb.add_sheet("Sheet1");
        wb.sheet_mut(ws)
            .unwrap()
            .set_value(CellRef::from_a1("A1").unwrap(), CellValue::Number(1.0));

        let bytes = write_workbook_to_vec(&wb).unwrap();
        let pkg = SheetPackage::from_bytes(&bytes).unwrap();
        for required in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/worksheets/sheet1.xml",
        ] {
            assert!(pkg.contains(required), "missing {required}");
        }
    }

    #[test]
    fn empty_needs_space_helper_matches_writer() {
        use crate::shared_strings::needs_space_preserve;
        assert!(needs_space_preserve(" x"));
        assert!(!needs_space_preserve("x"));
    }
}
