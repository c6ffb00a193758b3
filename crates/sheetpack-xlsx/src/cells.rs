//! Per-cell value encoding/decoding.
//!
//! A worksheet `<c>` record pairs an optional `t=` type attribute with a
//! `<v>` payload (or an `<is>` inline string). When `t` is absent the payload
//! is numeric text, and the cell's bound number format decides whether that
//! number is a plain number, a date-time, or an elapsed duration — legacy
//! documents rely on this inference, so it is not optional.
//!
//! All numeric text is locale-invariant. Malformed numeric payloads are
//! errors, never coerced to zero.

use chrono::NaiveDateTime;
use sheetpack_model::number_format::ValueClass;
use sheetpack_model::{
    datetime_from_serial, serial_from_datetime, serial_from_duration, duration_from_serial,
    CellValue, DateSystem, ErrorValue, RichText, SharedStringPool,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CellCodecError {
    #[error("malformed numeric value {0:?}")]
    MalformedNumber(String),
    #[error("malformed boolean value {0:?}")]
    MalformedBoolean(String),
    #[error("unknown error literal {0:?}")]
    UnknownErrorLiteral(String),
    #[error("shared string index {0} not present in the table")]
    UnknownSharedString(u32),
    #[error("malformed shared string index {0:?}")]
    MalformedSharedStringIndex(String),
    #[error("serial value {0} is not representable as a date-time")]
    SerialOutOfRange(f64),
    #[error("malformed ISO date-time {0:?}")]
    MalformedDateTime(String),
}

/// Decoded cell payload: the value plus the sharing choice it implies.
#[derive(Debug)]
pub(crate) struct DecodedValue {
    pub value: CellValue,
    pub share_string: bool,
}

impl DecodedValue {
    fn plain(value: CellValue) -> Self {
        Self {
            value,
            share_string: true,
        }
    }

    fn inline(value: CellValue) -> Self {
        Self {
            value,
            share_string: false,
        }
    }
}

/// Decode a `<c>` payload.
///
/// `t` is the cell's type attribute, `v` the `<v>` text, `inline` the parsed
/// `<is>` content, and `class` the value class of the cell's bound number
/// format (used only when `t` is absent).
pub(crate) fn decode_value(
    t: Option<&str>,
    v: Option<&str>,
    inline: Option<RichText>,
    class: ValueClass,
    shared: &SharedStringPool,
    date_system: DateSystem,
) -> Result<DecodedValue, CellCodecError> {
    match t {
        Some("s") => {
            let raw = v.unwrap_or_default();
            let index: u32 = raw
                .trim()
                .parse()
                .map_err(|_| CellCodecError::MalformedSharedStringIndex(raw.to_string()))?;
            let entry = shared
                .get(index)
                .ok_or(CellCodecError::UnknownSharedString(index))?;
            Ok(DecodedValue::plain(rich_or_plain(entry.clone())))
        }
        Some("inlineStr") => {
            let entry = inline.unwrap_or_default();
            Ok(DecodedValue::inline(rich_or_plain(entry)))
        }
        Some("str") => Ok(DecodedValue::inline(CellValue::Text(
            v.unwrap_or_default().to_string(),
        ))),
        Some("b") => {
            let raw = v.unwrap_or_default();
            let parsed = match raw.trim() {
                "1" | "true" | "TRUE" => true,
                "0" | "false" | "FALSE" => false,
                _ => return Err(CellCodecError::MalformedBoolean(raw.to_string())),
            };
            Ok(DecodedValue::plain(CellValue::Boolean(parsed)))
        }
        Some("e") => {
            let raw = v.unwrap_or_default();
            let parsed = ErrorValue::from_wire(raw.trim())
                .ok_or_else(|| CellCodecError::UnknownErrorLiteral(raw.to_string()))?;
            Ok(DecodedValue::plain(CellValue::Error(parsed)))
        }
        Some("d") => {
            let raw = v.unwrap_or_default();
            let parsed = parse_iso_datetime(raw.trim())
                .ok_or_else(|| CellCodecError::MalformedDateTime(raw.to_string()))?;
            Ok(DecodedValue::plain(CellValue::DateTime(parsed)))
        }
        // `t="n"` and no attribute both mean "numeric text, interpret via the
        // number format".
        Some("n") | None => {
            let Some(raw) = v else {
                return Ok(DecodedValue::plain(CellValue::Empty));
            };
            decode_numeric(raw, class, date_system)
        }
        // Unrecognized type: carry the payload as inline text so nothing is
        // silently dropped; the caller records the original `t` for fidelity.
        Some(_) => Ok(DecodedValue::inline(CellValue::Text(
            v.unwrap_or_default().to_string(),
        ))),
    }
}

fn decode_numeric(
    raw: &str,
    class: ValueClass,
    date_system: DateSystem,
) -> Result<DecodedValue, CellCodecError> {
    if matches!(class, ValueClass::Text) {
        // A text-formatted cell keeps its payload verbatim.
        return Ok(DecodedValue::plain(CellValue::Text(raw.to_string())));
    }

    let number = parse_wire_number(raw)?;
    let value = match class {
        ValueClass::Number => CellValue::Number(number),
        ValueClass::DateTime => CellValue::DateTime(
            datetime_from_serial(number, date_system)
                .ok_or(CellCodecError::SerialOutOfRange(number))?,
        ),
        ValueClass::Duration => CellValue::Duration(duration_from_serial(number)),
        ValueClass::Text => unreachable!("handled above"),
    };
    Ok(DecodedValue::plain(value))
}

/// Parse locale-invariant numeric text.
pub(crate) fn parse_wire_number(raw: &str) -> Result<f64, CellCodecError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CellCodecError::MalformedNumber(raw.to_string()));
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| CellCodecError::MalformedNumber(raw.to_string()))
}

/// Render a number in locale-invariant form (shortest round-trip decimal).
pub(crate) fn format_wire_number(n: f64) -> String {
    n.to_string()
}

/// Wire form of one encoded value: optional `t=` plus body.
pub(crate) enum WireBody {
    None,
    Value(String),
    InlineString(RichText),
}

pub(crate) struct EncodedValue {
    pub type_attr: Option<&'static str>,
    pub body: WireBody,
}

/// Encode a cell value.
///
/// `has_formula` switches text handling: a formula's cached string result is
/// written as `t="str"` and never enters the shared-string pool. Otherwise
/// `share_string` picks between the pool (`t="s"`) and an inline string.
pub(crate) fn encode_value(
    value: &CellValue,
    share_string: bool,
    has_formula: bool,
    date_system: DateSystem,
    mut intern: impl FnMut(&RichText) -> u32,
) -> EncodedValue {
    match value {
        CellValue::Empty => EncodedValue {
            type_attr: None,
            body: WireBody::None,
        },
        CellValue::Number(n) => EncodedValue {
            type_attr: None,
            body: WireBody::Value(format_wire_number(*n)),
        },
        CellValue::Boolean(b) => EncodedValue {
            type_attr: Some("b"),
            body: WireBody::Value(if *b { "1" } else { "0" }.to_string()),
        },
        CellValue::DateTime(dt) => EncodedValue {
            type_attr: None,
            body: WireBody::Value(format_wire_number(serial_from_datetime(*dt, date_system))),
        },
        CellValue::Duration(d) => EncodedValue {
            type_attr: None,
            body: WireBody::Value(format_wire_number(serial_from_duration(*d))),
        },
        CellValue::Error(err) => EncodedValue {
            type_attr: Some("e"),
            body: WireBody::Value(err.as_str().to_string()),
        },
        CellValue::Text(text) => {
            encode_text(RichText::new(text.clone()), share_string, has_formula, &mut intern)
        }
        CellValue::RichText(rich) => {
            encode_text(rich.clone(), share_string, has_formula, &mut intern)
        }
    }
}

fn encode_text(
    rich: RichText,
    share_string: bool,
    has_formula: bool,
    intern: &mut impl FnMut(&RichText) -> u32,
) -> EncodedValue {
    if has_formula {
        return EncodedValue {
            type_attr: Some("str"),
            body: WireBody::Value(rich.plain_text().to_string()),
        };
    }
    if share_string {
        let index = intern(&rich);
        EncodedValue {
            type_attr: Some("s"),
            body: WireBody::Value(index.to_string()),
        }
    } else {
        EncodedValue {
            type_attr: Some("inlineStr"),
            body: WireBody::InlineString(rich),
        }
    }
}

fn rich_or_plain(entry: RichText) -> CellValue {
    if entry.is_plain() && entry.phonetic.is_none() {
        CellValue::Text(entry.text)
    } else {
        CellValue::RichText(entry)
    }
}

fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn pool_with(texts: &[&str]) -> SharedStringPool {
        let mut pool = SharedStringPool::new();
        for t in texts {
            pool.intern_plain(*t);
        }
        pool
    }

    #[test]
    fn shared_string_decodes_to_text() {
        let pool = pool_with(&["Hello"]);
        let decoded = decode_value(
            Some("s"),
            Some("0"),
            None,
            ValueClass::Number,
            &pool,
            DateSystem::Excel1900,
        )
        .unwrap();
        assert_eq!(decoded.value, CellValue::Text("Hello".to_string()));
        assert!(decoded.share_string);
    }

    #[test]
    fn out_of_range_shared_string_index_is_an_error() {
        let pool = pool_with(&["only"]);
        let err = decode_value(
            Some("s"),
            Some("5"),
            None,
            ValueClass::Number,
            &pool,
            DateSystem::Excel1900,
        )
        .unwrap_err();
        assert!(matches!(err, CellCodecError::UnknownSharedString(5)));
    }

    #[test]
    fn typeless_cell_uses_format_class() {
        let pool = SharedStringPool::new();

        let number = decode_value(
            None,
            Some("42.5"),
            None,
            ValueClass::Number,
            &pool,
            DateSystem::Excel1900,
        )
        .unwrap();
        assert_eq!(number.value, CellValue::Number(42.5));

        let date = decode_value(
            None,
            Some("43831"),
            None,
            ValueClass::DateTime,
            &pool,
            DateSystem::Excel1900,
        )
        .unwrap();
        assert_eq!(
            date.value,
            CellValue::DateTime(
                NaiveDate::from_ymd_opt(2020, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );

        let duration = decode_value(
            None,
            Some("1.5"),
            None,
            ValueClass::Duration,
            &pool,
            DateSystem::Excel1900,
        )
        .unwrap();
        assert_eq!(
            duration.value,
            CellValue::Duration(chrono::Duration::hours(36))
        );
    }

    #[test]
    fn malformed_number_is_an_error_not_zero() {
        let pool = SharedStringPool::new();
        let err = decode_value(
            None,
            Some("12,5"),
            None,
            ValueClass::Number,
            &pool,
            DateSystem::Excel1900,
        )
        .unwrap_err();
        assert!(matches!(err, CellCodecError::MalformedNumber(_)));
    }

    #[test]
    fn booleans_roundtrip_as_1_and_0() {
        let pool = SharedStringPool::new();
        let decoded = decode_value(
            Some("b"),
            Some("1"),
            None,
            ValueClass::Number,
            &pool,
            DateSystem::Excel1900,
        )
        .unwrap();
        assert_eq!(decoded.value, CellValue::Boolean(true));

        let encoded = encode_value(
            &CellValue::Boolean(false),
            true,
            false,
            DateSystem::Excel1900,
            |_| 0,
        );
        assert_eq!(encoded.type_attr, Some("b"));
        assert!(matches!(encoded.body, WireBody::Value(ref v) if v == "0"));
    }

    #[test]
    fn formula_cached_text_is_str_not_shared() {
        let mut calls = 0u32;
        let encoded = encode_value(
            &CellValue::Text("result".to_string()),
            true,
            true,
            DateSystem::Excel1900,
            |_| {
                calls += 1;
                0
            },
        );
        assert_eq!(encoded.type_attr, Some("str"));
        assert_eq!(calls, 0, "cached formula text must not enter the pool");
    }

    #[test]
    fn datetime_encoding_respects_the_date_system() {
        let moment = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let v1900 = encode_value(
            &CellValue::DateTime(moment),
            true,
            false,
            DateSystem::Excel1900,
            |_| 0,
        );
        let v1904 = encode_value(
            &CellValue::DateTime(moment),
            true,
            false,
            DateSystem::Excel1904,
            |_| 0,
        );
        let serial_of = |e: &EncodedValue| match &e.body {
            WireBody::Value(v) => v.parse::<f64>().unwrap(),
            _ => panic!("expected value body"),
        };
        assert_eq!(serial_of(&v1900) - serial_of(&v1904), 1462.0);
    }

    #[test]
    fn error_literals_roundtrip() {
        let pool = SharedStringPool::new();
        for variant in ErrorValue::ALL {
            let encoded = encode_value(
                &CellValue::Error(variant),
                true,
                false,
                DateSystem::Excel1900,
                |_| 0,
            );
            let WireBody::Value(text) = &encoded.body else {
                panic!("expected value body");
            };
            let decoded = decode_value(
                Some("e"),
                Some(text),
                None,
                ValueClass::Number,
                &pool,
                DateSystem::Excel1900,
            )
            .unwrap();
            assert_eq!(decoded.value, CellValue::Error(variant));
        }
    }
}
