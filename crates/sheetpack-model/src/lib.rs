//! `sheetpack-model` defines the core in-memory spreadsheet data structures.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the `.xlsx` codec layer (`sheetpack-xlsx`)
//! - tooling that inspects or mutates workbooks without touching the wire format
//!
//! A [`Workbook`] owns its worksheets plus the registries shared across them:
//! the deduplicating [`StyleTable`], and the [`DateSystem`] used to interpret
//! serial date values. Shared-string interning lives in [`SharedStringPool`];
//! the codec rebuilds it from scratch on every save.

mod address;
mod cell;
mod date_serial;
mod error_value;
pub mod formula_shift;
pub mod number_format;
mod rich_text;
mod shared_string_pool;
mod style;
mod value;
mod workbook;
mod worksheet;

pub use address::{A1ParseError, CellRef, Range, RangeIter, RangeParseError};
pub use cell::{Cell, CellFormula, CellKey, FormulaKind, EXCEL_MAX_COLS, EXCEL_MAX_ROWS};
pub use date_serial::{
    datetime_from_serial, days_from_duration, duration_from_days, duration_from_serial,
    serial_from_datetime, serial_from_duration, DateSystem, EXCEL_1904_EPOCH_SHIFT_DAYS,
};
pub use error_value::ErrorValue;
pub use rich_text::{RichText, RichTextRun, RichTextRunStyle, Underline};
pub use shared_string_pool::SharedStringPool;
pub use style::{
    Alignment, Border, BorderEdge, BorderStyle, Color, Fill, FillPattern, Font,
    HorizontalAlignment, NumberFormat, Protection, Style, StyleTable, UnknownStyleId,
    VerticalAlignment,
};
pub use value::CellValue;
pub use workbook::{DefinedName, DefinedNameScope, DeleteSheetError, RenameSheetError, Workbook};
pub use worksheet::{ColProperties, RowProperties, Worksheet, WorksheetId};
