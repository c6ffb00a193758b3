//! `xl/calcChain.xml` rebuild.
//!
//! The calculation chain lists every formula-bearing cell in the workbook in
//! declaration order (it is dependency-agnostic). It is rebuilt from scratch
//! on every save rather than patched: a stale entry — a cell that no longer
//! exists or no longer holds a formula — makes some readers reject the whole
//! package, so purging by construction is the safe option.
//!
//! Array-formula anchors are flagged (`a="1"`) and followed by one secondary
//! "in child chain" marker entry (`s="1"`) so readers know the spanned cells
//! carry no per-cell formulas.

use sheetpack_model::{CellRef, FormulaKind, Workbook};

use crate::SheetMeta;

/// One `<c>` entry in the calculation chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalcChainEntry {
    /// The owning sheet's `sheetId` (not its tab position).
    pub sheet_id: u32,
    pub cell: CellRef,
    /// Array-formula anchor flag (`a="1"`).
    pub array: bool,
    /// "In child chain" marker flag (`s="1"`).
    pub child: bool,
}

/// Build the full chain for a workbook, grouped by sheet in tab order.
///
/// Only cells that currently hold a formula produce entries, so entries for
/// removed formulas are purged simply by not being generated.
pub fn build_calc_chain(workbook: &Workbook, sheets: &[SheetMeta]) -> Vec<CalcChainEntry> {
    let mut entries = Vec::new();

    for meta in sheets {
        let Some(worksheet) = workbook.sheet(meta.worksheet_id) else {
            continue;
        };
        for (cell, formula) in worksheet.iter_formula_cells() {
            match formula.kind {
                FormulaKind::Array { .. } => {
                    entries.push(CalcChainEntry {
                        sheet_id: meta.sheet_id,
                        cell,
                        array: true,
                        child: false,
                    });
                    entries.push(CalcChainEntry {
                        sheet_id: meta.sheet_id,
                        cell,
                        array: false,
                        child: true,
                    });
                }
                FormulaKind::Normal => {
                    entries.push(CalcChainEntry {
                        sheet_id: meta.sheet_id,
                        cell,
                        array: false,
                        child: false,
                    });
                }
            }
        }
    }

    entries
}

/// Render the chain part. Returns `None` when there are no entries — the
/// part must be deleted from the package rather than written empty.
pub fn write_calc_chain_xml(entries: &[CalcChainEntry]) -> Option<Vec<u8>> {
    if entries.is_empty() {
        return None;
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );
    for entry in entries {
        xml.push_str(&format!(
            r#"<c r="{}" i="{}""#,
            entry.cell.to_a1(),
            entry.sheet_id
        ));
        if entry.array {
            xml.push_str(r#" a="1""#);
        }
        if entry.child {
            xml.push_str(r#" s="1""#);
        }
        xml.push_str("/>");
    }
    xml.push_str("</calcChain>");
    Some(xml.into_bytes())
}
