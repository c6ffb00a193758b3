//! Number-format classification and the built-in format table.
//!
//! SpreadsheetML cells frequently omit the `t=` type attribute; the only way
//! to tell a date from a plain number is the number format bound to the cell.
//! [`classify_format`] implements that inference over the format-code text and
//! [`classify_builtin`] over the reserved built-in id ranges.

/// First id available for custom number formats. Ids below this are
/// built-ins and must never receive a `<numFmt>` entry.
pub const CUSTOM_FORMAT_ID_START: u16 = 164;

/// The value type implied by a number format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueClass {
    Number,
    DateTime,
    /// Elapsed-time formats (`[h]:mm:ss` and friends).
    Duration,
    Text,
}

/// Format code for a built-in number format id, when the id is in the
/// standard table (ECMA-376 §18.8.30).
pub fn builtin_code(id: u16) -> Option<&'static str> {
    let code = match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// Inverse of [`builtin_code`]: built-in id for an exactly matching code.
pub fn builtin_id(code: &str) -> Option<u16> {
    // The table is small; a forward scan keeps the two directions trivially
    // in sync (asserted by the completeness test below).
    for id in 0..CUSTOM_FORMAT_ID_START {
        if builtin_code(id) == Some(code) {
            return Some(id);
        }
    }
    None
}

/// Classify a built-in format id without expanding its code.
///
/// Ids 14–22 are the built-in date/time formats, 45–47 the elapsed-time
/// formats, and 49 is the text format (`@`).
pub fn classify_builtin(id: u16) -> ValueClass {
    match id {
        14..=22 => ValueClass::DateTime,
        45..=47 => ValueClass::Duration,
        49 => ValueClass::Text,
        _ => ValueClass::Number,
    }
}

/// Classify a format code by scanning its tokens.
///
/// The scan walks the code character by character:
/// - `"…"` quoted literal segments are skipped entirely;
/// - `[…]` sections consisting solely of `h`/`m`/`s` letters are elapsed-time
///   tokens and classify the format as [`ValueClass::Duration`]; any other
///   bracket section (colors like `[Red]`, locale tags like `[$-409]`,
///   conditions) is skipped;
/// - a numeric placeholder (`0`, `#`, `?`) classifies as Number;
/// - a date/time letter (`y`, `m`, `d`, `h`, `s`) classifies as DateTime;
/// - whichever token appears first wins; a code with neither is Text
///   (e.g. `@`).
pub fn classify_format(code: &str) -> ValueClass {
    let chars: Vec<char> = code.chars().map(|c| c.to_ascii_lowercase()).collect();
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '"' => {
                // Skip the quoted literal; an unterminated quote consumes the rest.
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    i += 1;
                }
                i += 1;
            }
            '\\' => {
                // Escaped literal character.
                i += 2;
            }
            '[' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != ']' {
                    end += 1;
                }
                let section = &chars[start..end];
                if !section.is_empty()
                    && section.iter().all(|&c| matches!(c, 'h' | 'm' | 's'))
                {
                    return ValueClass::Duration;
                }
                i = end + 1;
            }
            '0' | '#' | '?' => return ValueClass::Number,
            'y' | 'm' | 'd' | 'h' | 's' => return ValueClass::DateTime,
            _ => i += 1,
        }
    }

    ValueClass::Text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_maps_both_ways() {
        for id in 0..CUSTOM_FORMAT_ID_START {
            if let Some(code) = builtin_code(id) {
                assert_eq!(builtin_id(code), Some(id), "code {code:?} should map back");
            }
        }
    }

    #[test]
    fn date_formats_classify_as_datetime() {
        assert_eq!(classify_format("yyyy-mm-dd"), ValueClass::DateTime);
        assert_eq!(classify_format("d-mmm-yy"), ValueClass::DateTime);
        assert_eq!(classify_format("h:mm AM/PM"), ValueClass::DateTime);
    }

    #[test]
    fn numeric_formats_classify_as_number() {
        assert_eq!(classify_format("0.00"), ValueClass::Number);
        assert_eq!(classify_format("#,##0"), ValueClass::Number);
        assert_eq!(classify_format("0%"), ValueClass::Number);
    }

    #[test]
    fn text_format_classifies_as_text() {
        assert_eq!(classify_format("@"), ValueClass::Text);
    }

    #[test]
    fn elapsed_time_formats_classify_as_duration() {
        assert_eq!(classify_format("[h]:mm:ss"), ValueClass::Duration);
        assert_eq!(classify_format("[hh]:mm"), ValueClass::Duration);
    }

    #[test]
    fn quoted_literals_are_skipped() {
        // The "d" inside the quoted segment must not trigger a date match.
        assert_eq!(classify_format("\"day total\" 0.00"), ValueClass::Number);
    }

    #[test]
    fn color_and_locale_brackets_are_skipped() {
        // `[Red]` contains a `d`; a naive scan would misread this as a date.
        assert_eq!(classify_format("[Red]0.00"), ValueClass::Number);
        assert_eq!(classify_format("[$-409]yyyy-mm-dd"), ValueClass::DateTime);
    }

    #[test]
    fn first_token_wins() {
        assert_eq!(classify_format("0 \"years\""), ValueClass::Number);
        assert_eq!(classify_format("yyyy \\y 0"), ValueClass::DateTime);
    }

    #[test]
    fn builtin_ranges_classify() {
        assert_eq!(classify_builtin(14), ValueClass::DateTime);
        assert_eq!(classify_builtin(22), ValueClass::DateTime);
        assert_eq!(classify_builtin(46), ValueClass::Duration);
        assert_eq!(classify_builtin(49), ValueClass::Text);
        assert_eq!(classify_builtin(2), ValueClass::Number);
        assert_eq!(classify_builtin(0), ValueClass::Number);
    }
}
