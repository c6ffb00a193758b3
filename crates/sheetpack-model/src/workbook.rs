use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{DateSystem, Style, StyleTable, Worksheet, WorksheetId};

/// Scope of a defined name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinedNameScope {
    Workbook,
    Sheet(WorksheetId),
}

/// A defined name (named range / constant / formula).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedName {
    pub name: String,
    /// The refers-to text, e.g. `Sheet1!$A$1:$B$4`.
    pub formula: String,
    pub scope: DefinedNameScope,
}

/// Errors raised when renaming a worksheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenameSheetError {
    SheetNotFound,
    EmptyName,
    DuplicateName,
}

impl fmt::Display for RenameSheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenameSheetError::SheetNotFound => f.write_str("sheet not found"),
            RenameSheetError::EmptyName => f.write_str("sheet name cannot be empty"),
            RenameSheetError::DuplicateName => f.write_str("sheet name already exists"),
        }
    }
}

impl std::error::Error for RenameSheetError {}

/// Errors raised when deleting a worksheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteSheetError {
    SheetNotFound,
}

impl fmt::Display for DeleteSheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteSheetError::SheetNotFound => f.write_str("sheet not found"),
        }
    }
}

impl std::error::Error for DeleteSheetError {}

/// A workbook containing worksheets and shared style resources.
///
/// Each workbook owns its registries: the style table is seeded from the
/// explicit [`Style::default`] constant at construction rather than any
/// global singleton, so two workbooks never share mutable state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workbook {
    /// Worksheets, in tab order.
    #[serde(default)]
    pub sheets: Vec<Worksheet>,

    /// Workbook style table (deduplicated).
    #[serde(default)]
    pub styles: StyleTable,

    /// Excel workbook date system (1900 vs 1904) used to interpret serial dates.
    #[serde(default)]
    pub date_system: DateSystem,

    /// Defined names (named ranges / constants / formulas).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defined_names: Vec<DefinedName>,

    /// Next worksheet id to allocate (runtime-only).
    #[serde(skip, default = "first_sheet_id")]
    next_sheet_id: WorksheetId,
}

fn first_sheet_id() -> WorksheetId {
    1
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Create a new empty workbook.
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            styles: StyleTable::new(),
            date_system: DateSystem::default(),
            defined_names: Vec::new(),
            next_sheet_id: first_sheet_id(),
        }
    }

    /// Add a worksheet, returning its id.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> WorksheetId {
        let id = self.allocate_sheet_id();
        self.sheets.push(Worksheet::new(id, name));
        id
    }

    /// Reserve a worksheet id without creating the sheet (used by the codec
    /// when hydrating sheets in file order).
    pub fn allocate_sheet_id(&mut self) -> WorksheetId {
        let id = self.next_sheet_id;
        self.next_sheet_id = self.next_sheet_id.wrapping_add(1);
        id
    }

    /// Look up a worksheet by id.
    pub fn sheet(&self, id: WorksheetId) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.id == id)
    }

    /// Look up a worksheet by id, mutably.
    pub fn sheet_mut(&mut self, id: WorksheetId) -> Option<&mut Worksheet> {
        self.sheets.iter_mut().find(|s| s.id == id)
    }

    /// Look up a worksheet by name (exact match).
    pub fn sheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Insert (or reuse) a style in the workbook style table.
    pub fn intern_style(&mut self, style: Style) -> u32 {
        self.styles.intern(style)
    }

    /// Rename a worksheet.
    pub fn rename_sheet(
        &mut self,
        id: WorksheetId,
        new_name: &str,
    ) -> Result<(), RenameSheetError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(RenameSheetError::EmptyName);
        }
        if self
            .sheets
            .iter()
            .any(|s| s.id != id && s.name.eq_ignore_ascii_case(new_name))
        {
            return Err(RenameSheetError::DuplicateName);
        }
        let sheet = self
            .sheet_mut(id)
            .ok_or(RenameSheetError::SheetNotFound)?;
        sheet.name = new_name.to_string();
        Ok(())
    }

    /// Delete a worksheet, returning it.
    ///
    /// Defined names scoped to the sheet, and workbook-scoped names whose
    /// refers-to text references it, are dropped with it. The package layer
    /// continues the cascade (worksheet part, table parts, pivot caches,
    /// calculation-chain entries).
    pub fn delete_sheet(&mut self, id: WorksheetId) -> Result<Worksheet, DeleteSheetError> {
        let index = self
            .sheets
            .iter()
            .position(|s| s.id == id)
            .ok_or(DeleteSheetError::SheetNotFound)?;
        let sheet = self.sheets.remove(index);

        let sheet_ref = format!("{}!", sheet.name);
        let quoted_ref = format!("'{}'!", sheet.name.replace('\'', "''"));
        self.defined_names.retain(|dn| {
            dn.scope != DefinedNameScope::Sheet(id)
                && !dn.formula.contains(&sheet_ref)
                && !dn.formula.contains(&quoted_ref)
        });

        Ok(sheet)
    }
}
