use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{CellRef, CellValue, Range};

/// Excel-compatible maximum rows per worksheet (1,048,576).
pub const EXCEL_MAX_ROWS: u32 = 1_048_576;

/// Excel-compatible maximum columns per worksheet (16,384).
pub const EXCEL_MAX_COLS: u32 = 16_384;

const COL_BITS: u32 = 14; // 2^14 = 16,384 columns.
const COL_MASK: u64 = (1u64 << COL_BITS) - 1;

/// Compact key used for sparse cell storage.
///
/// The key is a packed `(row, col)` pair into a `u64`:
///
/// ```text
/// key = (row << 14) | col
/// ```
///
/// Ordering on the packed value is row-major, which makes iteration over the
/// worksheet's `BTreeMap` come out in wire order for free.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(transparent)]
pub struct CellKey(u64);

impl CellKey {
    /// Encode a `(row, col)` coordinate into a compact [`CellKey`].
    #[inline]
    pub fn new(row: u32, col: u32) -> Self {
        assert!(row < EXCEL_MAX_ROWS, "row out of Excel bounds: {row}");
        assert!(col < EXCEL_MAX_COLS, "col out of Excel bounds: {col}");
        Self(((row as u64) << COL_BITS) | (col as u64))
    }

    /// Decode the row component (0-indexed).
    #[inline]
    pub const fn row(self) -> u32 {
        (self.0 >> COL_BITS) as u32
    }

    /// Decode the column component (0-indexed).
    #[inline]
    pub const fn col(self) -> u32 {
        (self.0 & COL_MASK) as u32
    }

    /// Raw packed value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Convert to a [`CellRef`].
    #[inline]
    pub const fn to_ref(self) -> CellRef {
        CellRef::new(self.row(), self.col())
    }

    /// Create a key from a [`CellRef`].
    #[inline]
    pub fn from_ref(cell: CellRef) -> Self {
        Self::new(cell.row, cell.col)
    }
}

impl<'de> Deserialize<'de> for CellKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u64::deserialize(deserializer)?;
        let row = raw >> COL_BITS;
        let col = raw & COL_MASK;

        if row >= EXCEL_MAX_ROWS as u64 {
            return Err(D::Error::custom(format!(
                "CellKey row out of Excel bounds: {row}"
            )));
        }
        if col >= EXCEL_MAX_COLS as u64 {
            return Err(D::Error::custom(format!(
                "CellKey col out of Excel bounds: {col}"
            )));
        }

        Ok(CellKey(raw))
    }
}

impl From<CellKey> for u64 {
    fn from(value: CellKey) -> Self {
        value.0
    }
}

impl From<CellRef> for CellKey {
    fn from(value: CellRef) -> Self {
        Self::from_ref(value)
    }
}

/// How a formula participates in group structures on the wire.
///
/// Shared-formula grouping is recomputed from scratch on save, so the model
/// does not track shared membership; only array anchors carry extra state
/// (the spilled range), because that range is caller-visible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormulaKind {
    #[default]
    Normal,
    /// Anchor of an array formula spanning `range`. Member cells of the range
    /// carry no formula of their own, only cached values.
    Array { range: Range },
}

/// A cell formula: display text (no leading `=`) plus its wire role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFormula {
    pub text: String,
    #[serde(default, flatten)]
    pub kind: FormulaKind,
}

impl CellFormula {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: FormulaKind::Normal,
        }
    }

    pub fn array(text: impl Into<String>, range: Range) -> Self {
        Self {
            text: text.into(),
            kind: FormulaKind::Array { range },
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, FormulaKind::Array { .. })
    }
}

/// A single cell record.
///
/// Cells are stored sparsely: when a cell is "truly empty" (no value, no
/// formula, default style), it is removed from the worksheet map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// The cell's literal value, or a formula's cached result.
    #[serde(default)]
    pub value: CellValue,

    /// Formula, if the cell contains one. For formula cells `value` holds the
    /// cached last-computed result ([`CellValue::Empty`] when none exists).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<CellFormula>,

    /// Index into the workbook style table.
    #[serde(default)]
    pub style_id: u32,

    /// Whether a text value goes through the shared-string pool (`true`,
    /// the default) or is stored inline in the worksheet part.
    #[serde(default = "default_share_string")]
    pub share_string: bool,
}

fn default_share_string() -> bool {
    true
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            value: CellValue::Empty,
            formula: None,
            style_id: 0,
            share_string: true,
        }
    }
}

impl Cell {
    /// Create a new cell with the given value.
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    /// Returns true if this cell has no observable content or formatting.
    ///
    /// Such cells should not be stored in the sparse map.
    pub fn is_truly_empty(&self) -> bool {
        self.value == CellValue::Empty && self.formula.is_none() && self.style_id == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_key_roundtrip() {
        let key = CellKey::new(0, 0);
        assert_eq!(key.row(), 0);
        assert_eq!(key.col(), 0);
        assert_eq!(key.to_ref(), CellRef::new(0, 0));

        let key2 = CellKey::new(EXCEL_MAX_ROWS - 1, EXCEL_MAX_COLS - 1);
        assert_eq!(key2.row(), EXCEL_MAX_ROWS - 1);
        assert_eq!(key2.col(), EXCEL_MAX_COLS - 1);
    }

    #[test]
    fn cell_key_orders_row_major() {
        let a1 = CellKey::new(0, 0);
        let b1 = CellKey::new(0, 1);
        let a2 = CellKey::new(1, 0);
        assert!(a1 < b1);
        assert!(b1 < a2);
    }

    #[test]
    fn cell_key_deserialize_validates_bounds() {
        let too_large = (EXCEL_MAX_ROWS as u64) << COL_BITS;
        let json = too_large.to_string();
        let err = serde_json::from_str::<CellKey>(&json).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("out of Excel bounds"));
    }

    #[test]
    fn truly_empty_ignores_share_string_flag() {
        let mut cell = Cell::default();
        cell.share_string = false;
        assert!(cell.is_truly_empty());
    }
}
