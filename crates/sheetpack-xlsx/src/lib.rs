//! XLSX compatibility layer for `sheetpack-model` workbooks.
//!
//! The crate exposes two API levels:
//!
//! - [`load_from_bytes`] / [`write_to_vec`] (and the `_path` variants) work
//!   on a [`SpreadsheetDocument`]: a [`Workbook`] paired with the preserved
//!   OPC parts plus enough metadata to rewrite the core SpreadsheetML files
//!   without breaking relationship IDs across save cycles.
//! - [`read_workbook_from_bytes`] / [`write_workbook_to_vec`] are the
//!   semantic shortcuts for callers who only want the model and accept a
//!   fresh package on save.
//!
//! On load the pipeline runs parts → relationships → styles → shared strings
//! → worksheets; on save it reverses, rebuilding the style, shared-string and
//! calculation-chain registries from scratch while leaving untouched parts
//! byte-identical.

pub mod calc_chain;
mod cells;
mod formulas;
mod package;
mod read;
mod relationships;
pub mod shared_strings;
pub mod styles;
mod write;
mod xml_dom;
mod xml_escape;

use serde::{Deserialize, Serialize};
use sheetpack_model::{DeleteSheetError, Workbook, Worksheet, WorksheetId};

pub use calc_chain::{build_calc_chain, write_calc_chain_xml, CalcChainEntry};
pub use cells::CellCodecError;
pub use package::{PackageError, SheetPackage};
pub use read::{load_from_bytes, load_from_path, read_workbook_from_bytes, ReadError};
pub use relationships::{
    parse_relationships, rels_for_part, resolve_target, write_relationships, RelIdAllocator,
    Relationship, RelsError,
};
pub use shared_strings::{
    parse_shared_strings_xml, write_shared_strings_xml, SharedStringsError,
};
pub use styles::{StylesError, StylesPart};
pub use write::{write_to_path, write_to_vec, write_workbook_to_vec, WriteError};
pub use xml_dom::XmlDomError;

/// What kind of part backs a workbook sheet entry.
///
/// Recognized-but-unmodeled sheet kinds (chartsheets, macro sheets) are kept
/// as stubs: their tab position and relationship id survive the round trip
/// even though their content is opaque to the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetKind {
    Worksheet,
    Unsupported { reason: String },
}

impl SheetKind {
    pub fn is_supported(&self) -> bool {
        matches!(self, SheetKind::Worksheet)
    }
}

/// Identity of one sheet entry in `xl/workbook.xml`.
///
/// Everything here must survive a save cycle unchanged unless the sheet
/// itself was deleted: external consumers key on the relationship id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetMeta {
    pub worksheet_id: WorksheetId,
    /// The `sheetId` attribute (stable, unrelated to tab order).
    pub sheet_id: u32,
    /// The `r:id` linking the entry to its worksheet part.
    pub relationship_id: String,
    /// Visibility state (`hidden` / `veryHidden`), when present.
    pub state: Option<String>,
    /// OPC part path, e.g. `xl/worksheets/sheet1.xml`.
    pub path: String,
    pub kind: SheetKind,
}

/// `<calcPr>` attributes preserved from `xl/workbook.xml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcPr {
    pub calc_id: Option<String>,
    pub calc_mode: Option<String>,
    pub full_calc_on_load: Option<bool>,
}

/// A part recognized on load but not modeled (e.g. an externally-sourced
/// pivot cache). Recorded as a stub so the rest of the workbook stays usable
/// and the part's identity survives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedPart {
    pub path: String,
    pub reason: String,
}

/// Round-trip metadata captured while loading a package.
#[derive(Clone, Debug, Default)]
pub struct DocMeta {
    pub sheets: Vec<SheetMeta>,
    pub calc_pr: CalcPr,
    /// Sheets deleted from the model since load; their parts and references
    /// are cascaded out of the package at save time.
    pub deleted_sheets: Vec<SheetMeta>,
    /// Names of deleted sheets, kept for the pivot-cache cascade (caches name
    /// their source sheet rather than referencing it by id).
    pub deleted_sheet_names: std::collections::HashMap<WorksheetId, String>,
    pub unsupported_parts: Vec<UnsupportedPart>,
}

/// A workbook paired with the original OPC package parts needed for
/// high-fidelity round trips.
#[derive(Clone, Debug)]
pub struct SpreadsheetDocument {
    pub workbook: Workbook,
    pub(crate) package: SheetPackage,
    pub(crate) meta: DocMeta,
}

impl SpreadsheetDocument {
    /// Wrap a freshly built workbook (no backing package).
    pub fn new(workbook: Workbook) -> Self {
        let sheets = workbook
            .sheets
            .iter()
            .enumerate()
            .map(|(idx, sheet)| SheetMeta {
                worksheet_id: sheet.id,
                sheet_id: (idx + 1) as u32,
                relationship_id: format!("rId{}", idx + 1),
                state: None,
                path: format!("xl/worksheets/sheet{}.xml", idx + 1),
                kind: SheetKind::Worksheet,
            })
            .collect();

        Self {
            workbook,
            package: SheetPackage::empty(),
            meta: DocMeta {
                sheets,
                ..DocMeta::default()
            },
        }
    }

    pub(crate) fn from_parts(workbook: Workbook, package: SheetPackage, meta: DocMeta) -> Self {
        Self {
            workbook,
            package,
            meta,
        }
    }

    /// Round-trip metadata captured at load time.
    pub fn meta(&self) -> &DocMeta {
        &self.meta
    }

    /// Preserved package parts.
    pub fn package(&self) -> &SheetPackage {
        &self.package
    }

    /// Add a worksheet to the document. Its package identity (relationship
    /// id, part path) is allocated at the next save from the package-wide
    /// unused-id sequence.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> WorksheetId {
        self.workbook.add_sheet(name)
    }

    /// Delete a worksheet.
    ///
    /// The model-side cascade (defined names) runs immediately; the package
    /// cascade (worksheet part, table parts, pivot caches sourced from the
    /// sheet, calculation-chain entries, relationships, content types) runs
    /// at the next save.
    pub fn delete_sheet(&mut self, id: WorksheetId) -> Result<Worksheet, DeleteSheetError> {
        let removed = self.workbook.delete_sheet(id)?;
        if let Some(pos) = self.meta.sheets.iter().position(|m| m.worksheet_id == id) {
            let meta = self.meta.sheets.remove(pos);
            self.meta.deleted_sheets.push(meta);
        }
        self.meta
            .deleted_sheet_names
            .insert(id, removed.name.clone());
        Ok(removed)
    }
}
