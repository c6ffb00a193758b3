//! `xl/styles.xml` parsing and writing.
//!
//! XLSX stores cell formats as integer indices: each worksheet `c/@s` points
//! at an `<xf>` record in `cellXfs`, which in turn references the font, fill,
//! border, and number-format pools by index. The model stores styles in a
//! deduplicated [`StyleTable`] instead; this part maintains the mapping
//! between the two.
//!
//! Deduplication is two-level and hash-based throughout: each atomic
//! component pool carries its own `HashMap` index, and the composite `xf`
//! records are mapped per `style_id`. Linear "does this exist" scans would
//! not survive documents with tens of thousands of styled cells.
//!
//! Number formats keep the id-164 split exactly: built-in ids are emitted
//! bare, custom codes get `<numFmt>` entries with ids allocated at or above
//! [`sheetpack_model::number_format::CUSTOM_FORMAT_ID_START`].

use std::collections::{BTreeMap, HashMap};

use sheetpack_model::number_format::{self, CUSTOM_FORMAT_ID_START};
use sheetpack_model::{
    Alignment, Border, BorderEdge, BorderStyle, Color, Fill, FillPattern, Font,
    HorizontalAlignment, NumberFormat, Protection, Style, StyleTable, VerticalAlignment,
};
use thiserror::Error;

use crate::xml_dom::{XmlDomError, XmlEl};
use crate::xml_escape;

/// Default `styles.xml` payload used when a package omits the styles part.
///
/// This mirrors what Excel generates for a blank workbook.
const DEFAULT_STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="1">
    <font>
      <sz val="11"/>
      <color theme="1"/>
      <name val="Calibri"/>
      <family val="2"/>
      <scheme val="minor"/>
    </font>
  </fonts>
  <fills count="2">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
  </fills>
  <borders count="1">
    <border><left/><right/><top/><bottom/><diagonal/></border>
  </borders>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>
  <cellXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
</styleSheet>
"#;

#[derive(Debug, Error)]
pub enum StylesError {
    #[error("styles.xml root is not <styleSheet>")]
    InvalidRoot,
    #[error("unknown style_id {0}")]
    UnknownStyleId(u32),
    #[error("cell references xf index {0}, but cellXfs has {1} records")]
    UnknownXfIndex(u32, usize),
    #[error(transparent)]
    Xml(#[from] XmlDomError),
}

/// One composite `<xf>` record, kept for re-serialization.
#[derive(Clone, Debug)]
struct XfRecord {
    num_fmt_id: u16,
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    alignment: Option<Alignment>,
    protection: Option<Protection>,
}

/// The parsed styles part: component pools plus the `cellXfs` table, mapped
/// bidirectionally to model `style_id`s.
#[derive(Clone, Debug)]
pub struct StylesPart {
    fonts: Vec<Font>,
    font_index: HashMap<Font, u32>,
    fills: Vec<Fill>,
    fill_index: HashMap<Fill, u32>,
    borders: Vec<Border>,
    border_index: HashMap<Border, u32>,

    num_fmt_by_id: BTreeMap<u16, String>,
    num_fmt_id_by_code: HashMap<String, u16>,
    next_custom_num_fmt_id: u16,

    xfs: Vec<XfRecord>,
    xf_style_ids: Vec<u32>,
    style_to_xf: HashMap<u32, u32>,
}

impl StylesPart {
    /// Parse a `styles.xml` payload, interning every `cellXfs` record into
    /// `style_table`.
    pub fn parse(bytes: &[u8], style_table: &mut StyleTable) -> Result<Self, StylesError> {
        let root = XmlEl::parse(bytes)?;
        if root.name != "styleSheet" {
            return Err(StylesError::InvalidRoot);
        }

        let num_fmt_by_id = parse_num_fmts(&root);
        let mut num_fmt_id_by_code = HashMap::new();
        let mut max_custom = CUSTOM_FORMAT_ID_START - 1;
        for (id, code) in &num_fmt_by_id {
            num_fmt_id_by_code.entry(code.clone()).or_insert(*id);
            max_custom = max_custom.max(*id);
        }
        let next_custom_num_fmt_id = max_custom
            .saturating_add(1)
            .max(CUSTOM_FORMAT_ID_START);

        let fonts = parse_fonts(&root);
        let mut font_index = HashMap::new();
        for (idx, font) in fonts.iter().cloned().enumerate() {
            font_index.entry(font).or_insert(idx as u32);
        }

        let fills = parse_fills(&root);
        let mut fill_index = HashMap::new();
        for (idx, fill) in fills.iter().cloned().enumerate() {
            fill_index.entry(fill).or_insert(idx as u32);
        }

        let borders = parse_borders(&root);
        let mut border_index = HashMap::new();
        for (idx, border) in borders.iter().cloned().enumerate() {
            border_index.entry(border).or_insert(idx as u32);
        }

        let mut xfs = Vec::new();
        let mut xf_style_ids = Vec::new();
        let mut style_to_xf = HashMap::new();

        if let Some(cell_xfs) = root.child("cellXfs") {
            for (xf_idx, xf_el) in cell_xfs.children_by_name("xf").enumerate() {
                let (record, style) = parse_xf(xf_el, &fonts, &fills, &borders, &num_fmt_by_id);
                let style_id = style_table.intern(style);
                xfs.push(record);
                xf_style_ids.push(style_id);
                style_to_xf.entry(style_id).or_insert(xf_idx as u32);
            }
        } else {
            // Minimal fallback: at least one default xf.
            let style_id = style_table.intern(Style::default());
            xfs.push(XfRecord {
                num_fmt_id: 0,
                font_id: 0,
                fill_id: 0,
                border_id: 0,
                alignment: None,
                protection: None,
            });
            xf_style_ids.push(style_id);
            style_to_xf.insert(style_id, 0);
        }

        Ok(Self {
            fonts,
            font_index,
            fills,
            fill_index,
            borders,
            border_index,
            num_fmt_by_id,
            num_fmt_id_by_code,
            next_custom_num_fmt_id,
            xfs,
            xf_style_ids,
            style_to_xf,
        })
    }

    /// Parse the given payload, or Excel's blank-workbook defaults when the
    /// package has no styles part.
    pub fn parse_or_default(
        bytes: Option<&[u8]>,
        style_table: &mut StyleTable,
    ) -> Result<Self, StylesError> {
        match bytes {
            Some(bytes) => Self::parse(bytes, style_table),
            None => Self::parse(DEFAULT_STYLES_XML.as_bytes(), style_table),
        }
    }

    /// A fresh part seeded with the default pools, for rebuilding the styles
    /// table from scratch on save.
    pub fn for_write(style_table: &mut StyleTable) -> Result<Self, StylesError> {
        Self::parse(DEFAULT_STYLES_XML.as_bytes(), style_table)
    }

    /// Resolve a worksheet `c/@s` index to a model style id.
    ///
    /// An out-of-range index is a referential-integrity violation in the
    /// package, never silently mapped to the default style.
    pub fn style_id_for_xf(&self, xf_index: u32) -> Result<u32, StylesError> {
        self.xf_style_ids
            .get(xf_index as usize)
            .copied()
            .ok_or(StylesError::UnknownXfIndex(
                xf_index,
                self.xf_style_ids.len(),
            ))
    }

    /// Return the number of `<xf>` records in `cellXfs`.
    pub fn cell_xfs_count(&self) -> usize {
        self.xf_style_ids.len()
    }

    /// Ensure `style_id` has an `xf` record, appending one (and any new
    /// component pool entries) when needed.
    pub fn xf_index_for_style(
        &mut self,
        style_id: u32,
        style_table: &StyleTable,
    ) -> Result<u32, StylesError> {
        if let Some(existing) = self.style_to_xf.get(&style_id) {
            return Ok(*existing);
        }

        let style = style_table
            .get(style_id)
            .ok_or(StylesError::UnknownStyleId(style_id))?
            .clone();

        let num_fmt_id = self.intern_number_format(style.number_format.as_ref());
        let font_id = self.intern_font(style.font.as_ref());
        let fill_id = self.intern_fill(style.fill.as_ref());
        let border_id = self.intern_border(style.border.as_ref());

        let xf_idx = self.xfs.len() as u32;
        self.xfs.push(XfRecord {
            num_fmt_id,
            font_id,
            fill_id,
            border_id,
            alignment: style.alignment.clone(),
            protection: style.protection,
        });
        self.xf_style_ids.push(style_id);
        self.style_to_xf.insert(style_id, xf_idx);
        Ok(xf_idx)
    }

    /// Ensure every `style_id` in `style_ids` has a corresponding `xf` index.
    ///
    /// `style_ids` are processed in sorted order so new `xf` records are
    /// appended deterministically.
    pub fn xf_indices_for_style_ids(
        &mut self,
        style_ids: impl IntoIterator<Item = u32>,
        style_table: &StyleTable,
    ) -> Result<HashMap<u32, u32>, StylesError> {
        let mut ids: Vec<u32> = style_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut out = HashMap::with_capacity(ids.len());
        for style_id in ids {
            let xf_index = self.xf_index_for_style(style_id, style_table)?;
            out.insert(style_id, xf_index);
        }
        Ok(out)
    }

    /// Resolve a `numFmtId` to an explicit custom format code, when the
    /// workbook registers one. Built-in ids are not returned here.
    pub fn num_fmt_code_for_id(&self, num_fmt_id: u16) -> Option<&str> {
        self.num_fmt_by_id.get(&num_fmt_id).map(|s| s.as_str())
    }

    fn intern_font(&mut self, font: Option<&Font>) -> u32 {
        let Some(font) = font.cloned() else {
            return 0;
        };
        if let Some(existing) = self.font_index.get(&font) {
            return *existing;
        }
        let idx = self.fonts.len() as u32;
        self.fonts.push(font.clone());
        self.font_index.insert(font, idx);
        idx
    }

    fn intern_fill(&mut self, fill: Option<&Fill>) -> u32 {
        let Some(fill) = fill.cloned() else {
            return 0;
        };
        if let Some(existing) = self.fill_index.get(&fill) {
            return *existing;
        }
        let idx = self.fills.len() as u32;
        self.fills.push(fill.clone());
        self.fill_index.insert(fill, idx);
        idx
    }

    fn intern_border(&mut self, border: Option<&Border>) -> u32 {
        let Some(border) = border.cloned() else {
            return 0;
        };
        if let Some(existing) = self.border_index.get(&border) {
            return *existing;
        }
        let idx = self.borders.len() as u32;
        self.borders.push(border.clone());
        self.border_index.insert(border, idx);
        idx
    }

    fn intern_number_format(&mut self, fmt: Option<&NumberFormat>) -> u16 {
        match fmt {
            None => 0,
            Some(NumberFormat::Builtin(id)) => *id,
            Some(NumberFormat::Custom(code)) => {
                if let Some(id) = number_format::builtin_id(code) {
                    return id;
                }
                if let Some(id) = self.num_fmt_id_by_code.get(code) {
                    return *id;
                }
                let id = self.next_custom_num_fmt_id;
                self.next_custom_num_fmt_id = self.next_custom_num_fmt_id.saturating_add(1);
                self.num_fmt_by_id.insert(id, code.clone());
                self.num_fmt_id_by_code.insert(code.clone(), id);
                id
            }
        }
    }

    /// Render the full `styles.xml` payload.
    pub fn to_xml_bytes(&self) -> Vec<u8> {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(
            r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !self.num_fmt_by_id.is_empty() {
            xml.push_str(&format!(r#"<numFmts count="{}">"#, self.num_fmt_by_id.len()));
            for (id, code) in &self.num_fmt_by_id {
                xml.push_str(&format!(
                    r#"<numFmt numFmtId="{id}" formatCode="{}"/>"#,
                    xml_escape::attr(code)
                ));
            }
            xml.push_str("</numFmts>");
        }

        xml.push_str(&format!(r#"<fonts count="{}">"#, self.fonts.len()));
        for (idx, font) in self.fonts.iter().enumerate() {
            if idx == 0 {
                // Index 0 is the workbook default; re-emit Excel's stock font
                // rather than an empty element.
                xml.push_str(
                    r#"<font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font>"#,
                );
            } else {
                write_font(&mut xml, font);
            }
        }
        xml.push_str("</fonts>");

        xml.push_str(&format!(r#"<fills count="{}">"#, self.fills.len()));
        for fill in &self.fills {
            write_fill(&mut xml, fill);
        }
        xml.push_str("</fills>");

        xml.push_str(&format!(r#"<borders count="{}">"#, self.borders.len()));
        for border in &self.borders {
            write_border(&mut xml, border);
        }
        xml.push_str("</borders>");

        xml.push_str(
            r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
        );

        xml.push_str(&format!(r#"<cellXfs count="{}">"#, self.xfs.len()));
        for xf in &self.xfs {
            write_xf(&mut xml, xf);
        }
        xml.push_str("</cellXfs>");

        xml.push_str(
            r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
        );
        xml.push_str("</styleSheet>");
        xml.into_bytes()
    }
}

fn parse_num_fmts(root: &XmlEl) -> BTreeMap<u16, String> {
    let mut out = BTreeMap::new();
    let Some(num_fmts) = root.child("numFmts") else {
        return out;
    };
    for num_fmt in num_fmts.children_by_name("numFmt") {
        let id = num_fmt.attr("numFmtId").and_then(|v| v.parse::<u16>().ok());
        let code = num_fmt.attr("formatCode").map(|s| s.to_string());
        if let (Some(id), Some(code)) = (id, code) {
            out.insert(id, code);
        }
    }
    out
}

fn parse_fonts(root: &XmlEl) -> Vec<Font> {
    let Some(fonts) = root.child("fonts") else {
        return vec![Font::default()];
    };

    let mut parsed: Vec<Font> = fonts.children_by_name("font").map(parse_font).collect();
    if parsed.is_empty() {
        parsed.push(Font::default());
        return parsed;
    }

    // Normalize each font entry against index 0 so internal styles only store
    // the deltas from the workbook default.
    let base = parsed[0].clone();
    for font in &mut parsed {
        normalize_font(font, &base);
    }

    parsed
}

fn parse_font(el: &XmlEl) -> Font {
    let name = el
        .child("name")
        .and_then(|n| n.attr("val"))
        .map(|s| s.to_string());
    let size_100pt = el
        .child("sz")
        .and_then(|sz| sz.attr("val"))
        .and_then(|v| v.parse::<f32>().ok())
        .map(|v| (v * 100.0).round() as u16);

    let bold = el.child("b").is_some();
    let italic = el.child("i").is_some();
    let underline = el
        .child("u")
        .is_some_and(|u| u.attr("val").map(|v| v != "none").unwrap_or(true));
    let strike = el.child("strike").is_some();
    let color = el.child("color").and_then(parse_color);

    Font {
        name,
        size_100pt,
        bold,
        italic,
        underline,
        strike,
        color,
    }
}

fn normalize_font(font: &mut Font, base: &Font) {
    if font.name == base.name {
        font.name = None;
    }
    if font.size_100pt == base.size_100pt {
        font.size_100pt = None;
    }
    if font.color == base.color {
        font.color = None;
    }
}

fn parse_fills(root: &XmlEl) -> Vec<Fill> {
    let Some(fills) = root.child("fills") else {
        return vec![
            Fill::default(),
            Fill {
                pattern: FillPattern::Gray125,
                ..Fill::default()
            },
        ];
    };

    let mut out: Vec<Fill> = fills.children_by_name("fill").map(parse_fill).collect();
    if out.is_empty() {
        out.push(Fill::default());
    }
    out
}

fn parse_fill(el: &XmlEl) -> Fill {
    let Some(pattern_fill) = el.child("patternFill") else {
        return Fill::default();
    };

    let pattern = match pattern_fill.attr("patternType").unwrap_or("none") {
        "none" => FillPattern::None,
        "gray125" => FillPattern::Gray125,
        "solid" => FillPattern::Solid,
        other => FillPattern::Other(other.to_string()),
    };

    let fg_color = pattern_fill.child("fgColor").and_then(parse_color);
    let bg_color = pattern_fill.child("bgColor").and_then(parse_color);

    Fill {
        pattern,
        fg_color,
        bg_color,
    }
}

fn parse_borders(root: &XmlEl) -> Vec<Border> {
    let Some(borders) = root.child("borders") else {
        return vec![Border::default()];
    };

    let mut out: Vec<Border> = borders.children_by_name("border").map(parse_border).collect();
    if out.is_empty() {
        out.push(Border::default());
    }
    out
}

fn parse_border(el: &XmlEl) -> Border {
    let diagonal_up = el
        .attr("diagonalUp")
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let diagonal_down = el
        .attr("diagonalDown")
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

    Border {
        left: parse_border_edge(el.child("left")),
        right: parse_border_edge(el.child("right")),
        top: parse_border_edge(el.child("top")),
        bottom: parse_border_edge(el.child("bottom")),
        diagonal: parse_border_edge(el.child("diagonal")),
        diagonal_up,
        diagonal_down,
    }
}

fn parse_border_edge(edge: Option<&XmlEl>) -> BorderEdge {
    let Some(edge) = edge else {
        return BorderEdge::default();
    };

    let style = match edge.attr("style").unwrap_or("none") {
        "thin" => BorderStyle::Thin,
        "medium" => BorderStyle::Medium,
        "thick" => BorderStyle::Thick,
        "dashed" => BorderStyle::Dashed,
        "dotted" => BorderStyle::Dotted,
        "double" => BorderStyle::Double,
        _ => BorderStyle::None,
    };
    let color = edge.child("color").and_then(parse_color);

    BorderEdge { style, color }
}

fn parse_xf(
    xf: &XmlEl,
    fonts: &[Font],
    fills: &[Fill],
    borders: &[Border],
    num_fmts: &BTreeMap<u16, String>,
) -> (XfRecord, Style) {
    let font_id = xf
        .attr("fontId")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    let fill_id = xf
        .attr("fillId")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    let border_id = xf
        .attr("borderId")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0);
    let num_fmt_id = xf
        .attr("numFmtId")
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(0);

    let font = if font_id == 0 {
        None
    } else {
        fonts
            .get(font_id as usize)
            .cloned()
            .filter(|f| f != &Font::default())
    };
    let fill = fills
        .get(fill_id as usize)
        .cloned()
        .filter(|f| !is_default_fill(f, fill_id));
    let border = borders
        .get(border_id as usize)
        .cloned()
        .filter(|b| !is_default_border(b, border_id));

    let alignment = xf.child("alignment").and_then(parse_alignment);
    let protection = xf.child("protection").and_then(parse_protection);

    let number_format = if num_fmt_id == 0 {
        None
    } else if let Some(code) = num_fmts.get(&num_fmt_id) {
        Some(NumberFormat::Custom(code.clone()))
    } else {
        // Built-in id with no registered code; keep the id itself so the
        // round trip never invents a `<numFmt>` entry for it.
        Some(NumberFormat::Builtin(num_fmt_id))
    };

    let record = XfRecord {
        num_fmt_id,
        font_id,
        fill_id,
        border_id,
        alignment: alignment.clone(),
        protection,
    };
    let style = Style {
        font,
        fill,
        border,
        alignment,
        protection,
        number_format,
    };
    (record, style)
}

fn is_default_fill(fill: &Fill, fill_id: u32) -> bool {
    fill_id == 0 && matches!(fill.pattern, FillPattern::None)
}

fn is_default_border(border: &Border, border_id: u32) -> bool {
    border_id == 0 && border == &Border::default()
}

fn parse_alignment(el: &XmlEl) -> Option<Alignment> {
    let horizontal = el.attr("horizontal").and_then(parse_horizontal_alignment);
    let vertical = el.attr("vertical").and_then(parse_vertical_alignment);
    let wrap_text = el
        .attr("wrapText")
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    let rotation = el.attr("textRotation").and_then(|v| v.parse::<i16>().ok());
    let indent = el.attr("indent").and_then(|v| v.parse::<u16>().ok());

    let alignment = Alignment {
        horizontal,
        vertical,
        wrap_text,
        rotation,
        indent,
    };

    if alignment == Alignment::default() {
        None
    } else {
        Some(alignment)
    }
}

fn parse_protection(el: &XmlEl) -> Option<Protection> {
    let locked = el.attr("locked").map(|v| v != "0").unwrap_or(true);
    let hidden = el.attr("hidden").is_some_and(|v| v != "0");

    let protection = Protection { locked, hidden };
    if protection == Protection::default() {
        None
    } else {
        Some(protection)
    }
}

fn parse_horizontal_alignment(value: &str) -> Option<HorizontalAlignment> {
    match value {
        "general" => Some(HorizontalAlignment::General),
        "left" => Some(HorizontalAlignment::Left),
        "center" => Some(HorizontalAlignment::Center),
        "right" => Some(HorizontalAlignment::Right),
        "fill" => Some(HorizontalAlignment::Fill),
        "justify" => Some(HorizontalAlignment::Justify),
        _ => None,
    }
}

fn parse_vertical_alignment(value: &str) -> Option<VerticalAlignment> {
    match value {
        "top" => Some(VerticalAlignment::Top),
        "center" => Some(VerticalAlignment::Center),
        "bottom" => Some(VerticalAlignment::Bottom),
        _ => None,
    }
}

fn parse_color(el: &XmlEl) -> Option<Color> {
    if el
        .attr("auto")
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    {
        return Some(Color::Auto);
    }

    if let Some(rgb) = el.attr("rgb") {
        return parse_argb(rgb).map(Color::Argb);
    }

    if let Some(theme) = el.attr("theme").and_then(|v| v.parse::<u16>().ok()) {
        let tint = el
            .attr("tint")
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| (v.clamp(-1.0, 1.0) * 1000.0).round() as i16);
        return Some(Color::Theme { theme, tint });
    }

    if let Some(indexed) = el.attr("indexed").and_then(|v| v.parse::<u16>().ok()) {
        return Some(Color::Indexed(indexed));
    }

    None
}

fn parse_argb(value: &str) -> Option<u32> {
    let hex = value.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() == 8 {
        u32::from_str_radix(hex, 16).ok()
    } else if hex.len() == 6 {
        u32::from_str_radix(hex, 16)
            .ok()
            .map(|rgb| 0xFF00_0000 | rgb)
    } else {
        None
    }
}

fn write_font(xml: &mut String, font: &Font) {
    xml.push_str("<font>");
    if font.bold {
        xml.push_str("<b/>");
    }
    if font.italic {
        xml.push_str("<i/>");
    }
    if font.underline {
        xml.push_str("<u/>");
    }
    if font.strike {
        xml.push_str("<strike/>");
    }
    if let Some(size) = font.size_100pt {
        xml.push_str(&format!(r#"<sz val="{:.2}"/>"#, (size as f32) / 100.0));
    }
    if let Some(color) = font.color {
        write_color(xml, "color", color);
    }
    if let Some(name) = &font.name {
        xml.push_str(&format!(r#"<name val="{}"/>"#, xml_escape::attr(name)));
    }
    xml.push_str("</font>");
}

fn write_fill(xml: &mut String, fill: &Fill) {
    xml.push_str("<fill><patternFill patternType=\"");
    let pattern = match &fill.pattern {
        FillPattern::None => "none",
        FillPattern::Gray125 => "gray125",
        FillPattern::Solid => "solid",
        FillPattern::Other(value) => value.as_str(),
    };
    xml.push_str(&xml_escape::attr(pattern));
    xml.push('"');
    if fill.fg_color.is_none() && fill.bg_color.is_none() {
        xml.push_str("/></fill>");
        return;
    }
    xml.push('>');
    if let Some(color) = fill.fg_color {
        write_color(xml, "fgColor", color);
    }
    if let Some(color) = fill.bg_color {
        write_color(xml, "bgColor", color);
    }
    xml.push_str("</patternFill></fill>");
}

fn write_border(xml: &mut String, border: &Border) {
    xml.push_str("<border");
    if border.diagonal_up {
        xml.push_str(r#" diagonalUp="1""#);
    }
    if border.diagonal_down {
        xml.push_str(r#" diagonalDown="1""#);
    }
    xml.push('>');
    write_border_edge(xml, "left", &border.left);
    write_border_edge(xml, "right", &border.right);
    write_border_edge(xml, "top", &border.top);
    write_border_edge(xml, "bottom", &border.bottom);
    write_border_edge(xml, "diagonal", &border.diagonal);
    xml.push_str("</border>");
}

fn write_border_edge(xml: &mut String, name: &str, edge: &BorderEdge) {
    let style = match edge.style {
        BorderStyle::None => None,
        BorderStyle::Thin => Some("thin"),
        BorderStyle::Medium => Some("medium"),
        BorderStyle::Thick => Some("thick"),
        BorderStyle::Dashed => Some("dashed"),
        BorderStyle::Dotted => Some("dotted"),
        BorderStyle::Double => Some("double"),
    };

    xml.push('<');
    xml.push_str(name);
    if let Some(style) = style {
        xml.push_str(&format!(r#" style="{style}""#));
    }
    match edge.color {
        Some(color) => {
            xml.push('>');
            write_color(xml, "color", color);
            xml.push_str("</");
            xml.push_str(name);
            xml.push('>');
        }
        None => xml.push_str("/>"),
    }
}

fn write_color(xml: &mut String, name: &str, color: Color) {
    xml.push('<');
    xml.push_str(name);
    match color {
        Color::Argb(argb) => xml.push_str(&format!(r#" rgb="{argb:08X}""#)),
        Color::Theme { theme, tint } => {
            xml.push_str(&format!(r#" theme="{theme}""#));
            if let Some(tint) = tint {
                xml.push_str(&format!(r#" tint="{:.3}""#, (tint as f64) / 1000.0));
            }
        }
        Color::Indexed(index) => xml.push_str(&format!(r#" indexed="{index}""#)),
        Color::Auto => xml.push_str(r#" auto="1""#),
    }
    xml.push_str("/>");
}

fn write_xf(xml: &mut String, xf: &XfRecord) {
    xml.push_str(&format!(
        r#"<xf numFmtId="{}" fontId="{}" fillId="{}" borderId="{}" xfId="0""#,
        xf.num_fmt_id, xf.font_id, xf.fill_id, xf.border_id
    ));
    if xf.num_fmt_id != 0 {
        xml.push_str(r#" applyNumberFormat="1""#);
    }
    if xf.font_id != 0 {
        xml.push_str(r#" applyFont="1""#);
    }
    if xf.fill_id != 0 {
        xml.push_str(r#" applyFill="1""#);
    }
    if xf.border_id != 0 {
        xml.push_str(r#" applyBorder="1""#);
    }

    let has_children = xf.alignment.is_some() || xf.protection.is_some();
    if xf.alignment.is_some() {
        xml.push_str(r#" applyAlignment="1""#);
    }
    if xf.protection.is_some() {
        xml.push_str(r#" applyProtection="1""#);
    }
    if !has_children {
        xml.push_str("/>");
        return;
    }
    xml.push('>');

    if let Some(alignment) = &xf.alignment {
        xml.push_str("<alignment");
        if let Some(horizontal) = alignment.horizontal {
            let value = match horizontal {
                HorizontalAlignment::General => "general",
                HorizontalAlignment::Left => "left",
                HorizontalAlignment::Center => "center",
                HorizontalAlignment::Right => "right",
                HorizontalAlignment::Fill => "fill",
                HorizontalAlignment::Justify => "justify",
            };
            xml.push_str(&format!(r#" horizontal="{value}""#));
        }
        if let Some(vertical) = alignment.vertical {
            let value = match vertical {
                VerticalAlignment::Top => "top",
                VerticalAlignment::Center => "center",
                VerticalAlignment::Bottom => "bottom",
            };
            xml.push_str(&format!(r#" vertical="{value}""#));
        }
        if alignment.wrap_text {
            xml.push_str(r#" wrapText="1""#);
        }
        if let Some(rotation) = alignment.rotation {
            xml.push_str(&format!(r#" textRotation="{rotation}""#));
        }
        if let Some(indent) = alignment.indent {
            xml.push_str(&format!(r#" indent="{indent}""#));
        }
        xml.push_str("/>");
    }

    if let Some(protection) = &xf.protection {
        xml.push_str("<protection");
        if !protection.locked {
            xml.push_str(r#" locked="0""#);
        }
        if protection.hidden {
            xml.push_str(r#" hidden="1""#);
        }
        xml.push_str("/>");
    }

    xml.push_str("</xf>");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_part_has_one_xf_mapped_to_default_style() {
        let mut table = StyleTable::new();
        let part = StylesPart::parse_or_default(None, &mut table).unwrap();
        assert_eq!(part.cell_xfs_count(), 1);
        assert_eq!(part.style_id_for_xf(0).unwrap(), 0);
        assert!(part.style_id_for_xf(1).is_err());
    }

    #[test]
    fn interned_styles_get_stable_xf_indices() {
        let mut table = StyleTable::new();
        let mut part = StylesPart::for_write(&mut table).unwrap();

        let bold = table.intern(Style {
            font: Some(Font {
                bold: true,
                ..Default::default()
            }),
            ..Default::default()
        });

        let first = part.xf_index_for_style(bold, &table).unwrap();
        let second = part.xf_index_for_style(bold, &table).unwrap();
        assert_eq!(first, second);
        assert_eq!(part.style_id_for_xf(first).unwrap(), bold);
    }

    #[test]
    fn unknown_style_id_is_an_error() {
        let mut table = StyleTable::new();
        let mut part = StylesPart::for_write(&mut table).unwrap();
        assert!(matches!(
            part.xf_index_for_style(99, &table),
            Err(StylesError::UnknownStyleId(99))
        ));
    }

    #[test]
    fn custom_number_formats_start_at_164() {
        let mut table = StyleTable::new();
        let mut part = StylesPart::for_write(&mut table).unwrap();

        let styled = table.intern(Style {
            number_format: Some(NumberFormat::Custom("0.000%".to_string())),
            ..Default::default()
        });
        part.xf_index_for_style(styled, &table).unwrap();

        assert_eq!(part.num_fmt_code_for_id(164), Some("0.000%"));
        let xml = String::from_utf8(part.to_xml_bytes()).unwrap();
        assert!(xml.contains(r#"<numFmt numFmtId="164" formatCode="0.000%"/>"#));
    }

    #[test]
    fn builtin_codes_reuse_builtin_ids() {
        let mut table = StyleTable::new();
        let mut part = StylesPart::for_write(&mut table).unwrap();

        let styled = table.intern(Style {
            number_format: Some(NumberFormat::Custom("0.00".to_string())),
            ..Default::default()
        });
        part.xf_index_for_style(styled, &table).unwrap();

        let xml = String::from_utf8(part.to_xml_bytes()).unwrap();
        // Built-in id 2, no custom entry.
        assert!(xml.contains(r#"numFmtId="2""#));
        assert!(!xml.contains("<numFmts"));
    }

    #[test]
    fn custom_ids_continue_past_existing_entries() {
        let styles_xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="170" formatCode="0.0&quot;x&quot;"/></numFmts>
  <fonts count="1"><font/></fonts>
  <fills count="1"><fill><patternFill patternType="none"/></fill></fills>
  <borders count="1"><border/></borders>
  <cellXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="170" fontId="0" fillId="0" borderId="0"/>
  </cellXfs>
</styleSheet>"#;

        let mut table = StyleTable::new();
        let mut part = StylesPart::parse(styles_xml.as_bytes(), &mut table).unwrap();

        let styled = table.intern(Style {
            number_format: Some(NumberFormat::Custom("#.##0,0".to_string())),
            ..Default::default()
        });
        part.xf_index_for_style(styled, &table).unwrap();
        assert_eq!(part.num_fmt_code_for_id(171), Some("#.##0,0"));
    }

    #[test]
    fn roundtrip_preserves_styled_xf() {
        let mut table = StyleTable::new();
        let mut part = StylesPart::for_write(&mut table).unwrap();

        let style = Style {
            font: Some(Font {
                bold: true,
                color: Some(Color::Argb(0xFFFF0000)),
                ..Default::default()
            }),
            fill: Some(Fill {
                pattern: FillPattern::Solid,
                fg_color: Some(Color::Argb(0xFF00FF00)),
                bg_color: None,
            }),
            alignment: Some(Alignment {
                horizontal: Some(HorizontalAlignment::Center),
                wrap_text: true,
                ..Default::default()
            }),
            number_format: Some(NumberFormat::Custom("0.000".to_string())),
            ..Default::default()
        };
        let style_id = table.intern(style.clone());
        let xf = part.xf_index_for_style(style_id, &table).unwrap();

        let xml = part.to_xml_bytes();
        let mut table2 = StyleTable::new();
        let part2 = StylesPart::parse(&xml, &mut table2).unwrap();
        let style_id2 = part2.style_id_for_xf(xf).unwrap();
        assert_eq!(table2.get(style_id2), Some(&style));
    }
}
