use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Cell, CellFormula, CellKey, CellRef, CellValue, FormulaKind, Range};

/// Identifier for a worksheet within a workbook.
pub type WorksheetId = u32;

/// Per-row layout metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowProperties {
    /// Row height in points, when explicitly set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Row-level style, when the whole row carries formatting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<u32>,
}

/// Per-column layout metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColProperties {
    /// Column width in characters, when explicitly set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_id: Option<u32>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A single worksheet: a sparse cell map plus row/column metadata.
///
/// Cells are keyed by [`CellKey`] in a `BTreeMap`, so iteration is always in
/// row-major (wire) order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Worksheet {
    pub id: WorksheetId,
    pub name: String,
    #[serde(default)]
    cells: BTreeMap<CellKey, Cell>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub row_props: BTreeMap<u32, RowProperties>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub col_props: BTreeMap<u32, ColProperties>,
}

impl Worksheet {
    pub fn new(id: WorksheetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cells: BTreeMap::new(),
            row_props: BTreeMap::new(),
            col_props: BTreeMap::new(),
        }
    }

    /// Look up a cell.
    pub fn cell(&self, cell_ref: CellRef) -> Option<&Cell> {
        self.cells.get(&CellKey::from_ref(cell_ref))
    }

    /// Insert a fully-formed cell record (used by the codec on load).
    ///
    /// Truly empty cells are dropped instead of stored.
    pub fn insert_cell(&mut self, cell_ref: CellRef, cell: Cell) {
        if cell.is_truly_empty() {
            self.cells.remove(&CellKey::from_ref(cell_ref));
        } else {
            self.cells.insert(CellKey::from_ref(cell_ref), cell);
        }
    }

    /// Set a cell's value, creating the cell on first write.
    pub fn set_value(&mut self, cell_ref: CellRef, value: CellValue) {
        let key = CellKey::from_ref(cell_ref);
        let cell = self.cells.entry(key).or_default();
        cell.value = value;
        if cell.is_truly_empty() {
            self.cells.remove(&key);
        }
    }

    /// Set or clear a cell's formula. `None` removes the formula but keeps
    /// any cached value.
    pub fn set_formula(&mut self, cell_ref: CellRef, formula: Option<String>) {
        let key = CellKey::from_ref(cell_ref);
        match formula {
            Some(text) => {
                let cell = self.cells.entry(key).or_default();
                cell.formula = Some(CellFormula::new(text));
            }
            None => {
                if let Some(cell) = self.cells.get_mut(&key) {
                    cell.formula = None;
                    if cell.is_truly_empty() {
                        self.cells.remove(&key);
                    }
                }
            }
        }
    }

    /// Declare an array formula anchored at `range.start` and spanning
    /// `range`. Member cells receive no formula of their own.
    pub fn set_array_formula(&mut self, range: Range, text: impl Into<String>) {
        let key = CellKey::from_ref(range.start);
        let cell = self.cells.entry(key).or_default();
        cell.formula = Some(CellFormula::array(text, range));
    }

    /// The formula text at a cell, if any.
    pub fn formula(&self, cell_ref: CellRef) -> Option<&str> {
        self.cell(cell_ref)
            .and_then(|c| c.formula.as_ref())
            .map(|f| f.text.as_str())
    }

    /// Assign a style to a cell, creating the cell on first write.
    pub fn set_style_id(&mut self, cell_ref: CellRef, style_id: u32) {
        let key = CellKey::from_ref(cell_ref);
        let cell = self.cells.entry(key).or_default();
        cell.style_id = style_id;
        if cell.is_truly_empty() {
            self.cells.remove(&key);
        }
    }

    /// Opt a text cell out of (or back into) the shared-string pool.
    pub fn set_share_string(&mut self, cell_ref: CellRef, share: bool) {
        if let Some(cell) = self.cells.get_mut(&CellKey::from_ref(cell_ref)) {
            cell.share_string = share;
        }
    }

    /// Remove a cell entirely.
    pub fn clear_cell(&mut self, cell_ref: CellRef) {
        self.cells.remove(&CellKey::from_ref(cell_ref));
    }

    /// Remove every cell in a row, along with its row properties.
    pub fn clear_row(&mut self, row: u32) {
        let start = CellKey::new(row, 0);
        let end = CellKey::new(row, crate::EXCEL_MAX_COLS - 1);
        let keys: Vec<CellKey> = self.cells.range(start..=end).map(|(k, _)| *k).collect();
        for key in keys {
            self.cells.remove(&key);
        }
        self.row_props.remove(&row);
    }

    /// Iterate populated cells in row-major order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells.iter().map(|(key, cell)| (key.to_ref(), cell))
    }

    /// Number of populated cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The bounding rectangle of all populated cells, if any.
    pub fn used_range(&self) -> Option<Range> {
        let mut iter = self.cells.keys();
        let first = *iter.next()?;
        let mut min_row = first.row();
        let mut max_row = first.row();
        let mut min_col = first.col();
        let mut max_col = first.col();
        for key in iter {
            min_row = min_row.min(key.row());
            max_row = max_row.max(key.row());
            min_col = min_col.min(key.col());
            max_col = max_col.max(key.col());
        }
        Some(Range::new(
            CellRef::new(min_row, min_col),
            CellRef::new(max_row, max_col),
        ))
    }

    /// Returns true when any cell holds a formula.
    pub fn has_formulas(&self) -> bool {
        self.cells.values().any(|c| c.formula.is_some())
    }

    /// Iterate formula-bearing cells in row-major order.
    pub fn iter_formula_cells(&self) -> impl Iterator<Item = (CellRef, &CellFormula)> {
        self.cells.iter().filter_map(|(key, cell)| {
            cell.formula.as_ref().map(|formula| (key.to_ref(), formula))
        })
    }

    /// Cells covered by array-formula ranges, excluding the anchors.
    pub fn array_member_cells(&self) -> Vec<CellRef> {
        let mut out = Vec::new();
        for (anchor, formula) in self.iter_formula_cells() {
            if let FormulaKind::Array { range } = formula.kind {
                for member in range.iter() {
                    if member != anchor {
                        out.push(member);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_creates_and_clear_removes() {
        let mut ws = Worksheet::new(1, "Sheet1");
        let a1 = CellRef::new(0, 0);
        ws.set_value(a1, CellValue::Number(1.0));
        assert_eq!(ws.cell_count(), 1);
        ws.set_value(a1, CellValue::Empty);
        assert_eq!(ws.cell_count(), 0);
    }

    #[test]
    fn iteration_is_row_major() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.set_value(CellRef::new(1, 0), CellValue::Number(3.0));
        ws.set_value(CellRef::new(0, 1), CellValue::Number(2.0));
        ws.set_value(CellRef::new(0, 0), CellValue::Number(1.0));

        let order: Vec<String> = ws.iter_cells().map(|(r, _)| r.to_a1()).collect();
        assert_eq!(order, ["A1", "B1", "A2"]);
    }

    #[test]
    fn used_range_covers_extremes() {
        let mut ws = Worksheet::new(1, "Sheet1");
        ws.set_value(CellRef::new(2, 3), CellValue::Number(1.0));
        ws.set_value(CellRef::new(5, 1), CellValue::Number(2.0));
        let range = ws.used_range().unwrap();
        assert_eq!(range.to_string(), "B3:D6");
    }

    #[test]
    fn array_members_exclude_anchor() {
        let mut ws = Worksheet::new(1, "Sheet1");
        let range = Range::from_a1("A1:A3").unwrap();
        ws.set_array_formula(range, "ROW(A1:A3)");
        let members: Vec<String> = ws.array_member_cells().iter().map(|c| c.to_a1()).collect();
        assert_eq!(members, ["A2", "A3"]);
    }
}
