use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::number_format::{self, ValueClass};

/// A cell color reference.
///
/// `Theme` tints are stored in 1/1000 units (e.g. `-250` = `-0.25`) so the
/// type stays `Eq + Hash` for interning.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Argb(u32),
    Theme { theme: u16, tint: Option<i16> },
    Indexed(u16),
    Auto,
}

impl Color {
    pub const fn new_argb(argb: u32) -> Self {
        Color::Argb(argb)
    }
}

/// Font formatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Font size in 1/100 points (e.g. 1100 = 11pt).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_100pt: Option<u16>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strike: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// Fill pattern type (subset; unrecognized patterns are carried verbatim).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillPattern {
    #[default]
    None,
    Gray125,
    Solid,
    Other(String),
}

/// Fill (background) formatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Fill {
    #[serde(default)]
    pub pattern: FillPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fg_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<Color>,
}

/// Border line style.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
}

/// One edge of a cell border.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BorderEdge {
    #[serde(default)]
    pub style: BorderStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

/// Border formatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Border {
    #[serde(default)]
    pub left: BorderEdge,
    #[serde(default)]
    pub right: BorderEdge,
    #[serde(default)]
    pub top: BorderEdge,
    #[serde(default)]
    pub bottom: BorderEdge,
    #[serde(default)]
    pub diagonal: BorderEdge,
    #[serde(default, skip_serializing_if = "is_false")]
    pub diagonal_up: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub diagonal_down: bool,
}

/// Horizontal alignment options.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlignment {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

/// Vertical alignment options.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
}

/// Alignment formatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Alignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal: Option<HorizontalAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<VerticalAlignment>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrap_text: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<u16>,
}

/// Cell protection flags. Excel's default is locked + visible.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}

/// A number format reference.
///
/// SpreadsheetML splits formats at id 164: ids below are implicit built-ins
/// with no `<numFmt>` entry, ids at or above require a registered format-code
/// string. Keeping the two cases distinct in the model preserves that split
/// losslessly across load/save, even for built-in ids whose code we do not
/// expand.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    Builtin(u16),
    Custom(String),
}

impl NumberFormat {
    /// The format code, when one is known (custom code, or a built-in id
    /// present in the expansion table).
    pub fn code(&self) -> Option<&str> {
        match self {
            NumberFormat::Builtin(id) => number_format::builtin_code(*id),
            NumberFormat::Custom(code) => Some(code),
        }
    }

    /// Classify the value type this format implies for typeless cells.
    pub fn classify(&self) -> ValueClass {
        match self {
            NumberFormat::Builtin(id) => number_format::classify_builtin(*id),
            NumberFormat::Custom(code) => number_format::classify_format(code),
        }
    }
}

/// Complete cell style.
///
/// This is the structurally-comparable aggregate that the [`StyleTable`]
/// interns: two cells with field-for-field equal styles always share one id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<Border>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<Protection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<NumberFormat>,
}

impl Style {
    /// Value class implied by this style's number format (Number when none).
    pub fn value_class(&self) -> ValueClass {
        self.number_format
            .as_ref()
            .map(NumberFormat::classify)
            .unwrap_or(ValueClass::Number)
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Raised when a style id does not resolve to a registered style.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown style_id {0}")]
pub struct UnknownStyleId(pub u32);

/// Deduplicated table of styles.
///
/// Cells store a `style_id` referencing this table. Style `0` is always the
/// default (empty) style and is present even when no cell references it.
/// Lookup is hash-based: interning tens of thousands of styled cells must not
/// degenerate into linear scans.
#[derive(Clone, Debug, Serialize)]
pub struct StyleTable {
    pub styles: Vec<Style>,
    #[serde(skip)]
    index: HashMap<Style, u32>,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleTable {
    pub fn new() -> Self {
        let mut table = Self {
            styles: vec![Style::default()],
            index: HashMap::new(),
        };
        table.rebuild_index();
        table
    }

    /// Insert (or reuse) a style, returning its ID. Idempotent: structurally
    /// equal styles always resolve to the same id.
    pub fn intern(&mut self, style: Style) -> u32 {
        if let Some(id) = self.index.get(&style) {
            return *id;
        }
        let id = self.styles.len() as u32;
        self.styles.push(style.clone());
        self.index.insert(style, id);
        id
    }

    /// Get a style by id.
    pub fn get(&self, style_id: u32) -> Option<&Style> {
        self.styles.get(style_id as usize)
    }

    /// Resolve a style id, failing on dangling references.
    pub fn resolve(&self, style_id: u32) -> Result<&Style, UnknownStyleId> {
        self.get(style_id).ok_or(UnknownStyleId(style_id))
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, style) in self.styles.iter().cloned().enumerate() {
            self.index.insert(style, i as u32);
        }
    }
}

impl<'de> Deserialize<'de> for StyleTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            #[serde(default)]
            styles: Vec<Style>,
        }

        let mut helper = Helper::deserialize(deserializer)?;
        if helper.styles.is_empty() {
            helper.styles.push(Style::default());
        }

        let mut table = StyleTable {
            styles: helper.styles,
            index: HashMap::new(),
        };
        table.rebuild_index();
        Ok(table)
    }
}
