//! Offset-based rewriting of A1 references in formula text.
//!
//! Shared formulas are declared once at an anchor cell and re-applied to every
//! member of the group by shifting each **relative** reference by the member's
//! offset from the anchor. Absolute components (`$`) are left untouched, and
//! references shifted off the sheet collapse to `#REF!`.
//!
//! The rewriter is token-level, not a full parser: it skips `"…"` string
//! literals and `'…'` quoted sheet names, and refuses to treat identifiers
//! such as function names (`LOG10(`) as cell references.

use crate::address::{col_to_name, name_to_col};
use crate::{CellRef, EXCEL_MAX_COLS, EXCEL_MAX_ROWS};

/// A matched A1 reference, decomposed into its shiftable parts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct RefParts {
    row: u32,
    col: u32,
    row_abs: bool,
    col_abs: bool,
}

/// Rewrite `formula` as if it moved from `from` to `to`.
///
/// This is the re-anchoring primitive for shared formula groups: a member at
/// `to` of a group anchored at `from` evaluates `adjust(anchor_text, from, to)`.
pub fn adjust(formula: &str, from: CellRef, to: CellRef) -> String {
    shift_formula(
        formula,
        to.row as i64 - from.row as i64,
        to.col as i64 - from.col as i64,
    )
}

/// Shift every relative A1 reference in `formula` by the given deltas.
pub fn shift_formula(formula: &str, delta_row: i64, delta_col: i64) -> String {
    if delta_row == 0 && delta_col == 0 {
        return formula.to_string();
    }

    rewrite_references(formula, |parts| {
        let mut row = parts.row;
        let mut col = parts.col;

        if !parts.row_abs {
            let shifted = row as i64 + delta_row;
            if shifted < 0 || shifted >= EXCEL_MAX_ROWS as i64 {
                return "#REF!".to_string();
            }
            row = shifted as u32;
        }
        if !parts.col_abs {
            let shifted = col as i64 + delta_col;
            if shifted < 0 || shifted >= EXCEL_MAX_COLS as i64 {
                return "#REF!".to_string();
            }
            col = shifted as u32;
        }

        let mut out = String::new();
        if parts.col_abs {
            out.push('$');
        }
        out.push_str(&col_to_name(col));
        if parts.row_abs {
            out.push('$');
        }
        out.push_str(&(row + 1).to_string());
        out
    })
}

/// Render `formula` in an offset-relative (R1C1-style) canonical form, as
/// seen from `origin`.
///
/// Relative references become `R[dr]C[dc]`, absolute components keep their
/// literal coordinate (`R5C3`). Two cells hold the *same* shared formula
/// exactly when their normalized forms are equal — this is the grouping key
/// used at save time, never written to the file.
pub fn normalize_relative(formula: &str, origin: CellRef) -> String {
    rewrite_references(formula, |parts| {
        let mut out = String::from("R");
        if parts.row_abs {
            out.push_str(&(parts.row + 1).to_string());
        } else {
            out.push('[');
            out.push_str(&(parts.row as i64 - origin.row as i64).to_string());
            out.push(']');
        }
        out.push('C');
        if parts.col_abs {
            out.push_str(&(parts.col + 1).to_string());
        } else {
            out.push('[');
            out.push_str(&(parts.col as i64 - origin.col as i64).to_string());
            out.push(']');
        }
        out
    })
}

/// Walk `formula`, replacing each A1 reference via `replace` and copying
/// everything else (string literals, quoted sheet names, identifiers)
/// verbatim.
fn rewrite_references(formula: &str, mut replace: impl FnMut(RefParts) -> String) -> String {
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len() + 8);
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = copy_quoted(formula, i, b'"', &mut out),
            b'\'' => i = copy_quoted(formula, i, b'\'', &mut out),
            b'$' | b'A'..=b'Z' | b'a'..=b'z' => {
                if let Some((consumed, parts)) = match_reference(&formula[i..]) {
                    out.push_str(&replace(parts));
                    i += consumed;
                } else {
                    // Not a cell reference: copy the identifier run verbatim so
                    // the scanner never re-enters mid-token.
                    let start = i;
                    if bytes[i] == b'$' {
                        i += 1;
                    }
                    while i < bytes.len()
                        && (bytes[i].is_ascii_alphanumeric()
                            || bytes[i] == b'_'
                            || bytes[i] == b'.')
                    {
                        i += 1;
                    }
                    if i == start {
                        // A lone `$` not followed by an identifier.
                        i += 1;
                    }
                    out.push_str(&formula[start..i]);
                }
            }
            _ => {
                let ch = formula[i..]
                    .chars()
                    .next()
                    .expect("index is a char boundary");
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    out
}

/// Copy a quoted segment (including delimiters), honoring doubled-quote
/// escapes. Returns the index just past the closing delimiter.
fn copy_quoted(formula: &str, start: usize, quote: u8, out: &mut String) -> usize {
    let bytes = formula.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                i += 1;
                break;
            }
        } else {
            i += 1;
        }
    }
    out.push_str(&formula[start..i]);
    i
}

/// Try to match an A1 reference at the start of `s`, returning the consumed
/// byte count and the decomposed reference.
fn match_reference(s: &str) -> Option<(usize, RefParts)> {
    let bytes = s.as_bytes();
    let mut i = 0usize;

    let col_abs = bytes.first() == Some(&b'$');
    if col_abs {
        i += 1;
    }

    let col_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() && i - col_start < 3 {
        i += 1;
    }
    if i == col_start {
        return None;
    }
    let col_end = i;

    let row_abs = bytes.get(i) == Some(&b'$');
    if row_abs {
        i += 1;
    }

    let row_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() && i - row_start < 7 {
        i += 1;
    }
    if i == row_start {
        return None;
    }
    let row_end = i;

    // Reject when the token continues (identifier tail) or names a function.
    if let Some(&next) = bytes.get(row_end) {
        if next.is_ascii_alphanumeric() || next == b'_' || next == b'.' || next == b'(' {
            return None;
        }
    }

    let col = name_to_col(&s[col_start..col_end]).ok()?;
    if col >= EXCEL_MAX_COLS {
        return None;
    }
    let row_1_based: u32 = s[row_start..row_end].parse().ok()?;
    if row_1_based == 0 || row_1_based > EXCEL_MAX_ROWS {
        return None;
    }

    Some((
        row_end,
        RefParts {
            row: row_1_based - 1,
            col,
            row_abs,
            col_abs,
        },
    ))
}
