use chrono::{Duration as TimeDelta, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub use crate::rich_text::RichText;
use crate::ErrorValue;

/// Tagged representation of a cell value.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable
/// serialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Empty / unset cell value.
    #[default]
    Empty,
    /// IEEE-754 double precision number.
    Number(f64),
    /// Boolean.
    Boolean(bool),
    /// A calendar date-time, stored independently of the workbook's serial
    /// date system; the codec converts to serial form on the wire.
    DateTime(NaiveDateTime),
    /// An elapsed time span (what elapsed-time formats like `[h]:mm:ss`
    /// display), stored on the wire as a fractional day count.
    #[serde(with = "serde_duration_days")]
    Duration(TimeDelta),
    /// Plain string (not rich text).
    Text(String),
    /// Rich text value (styled runs, optional phonetic annotation).
    RichText(RichText),
    /// Excel error value.
    Error(ErrorValue),
}

impl CellValue {
    /// Returns true if the value is [`CellValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The plain-text content for text-like values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::RichText(rt) => Some(rt.plain_text()),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl From<ErrorValue> for CellValue {
    fn from(value: ErrorValue) -> Self {
        CellValue::Error(value)
    }
}

impl From<RichText> for CellValue {
    fn from(value: RichText) -> Self {
        CellValue::RichText(value)
    }
}

/// Serialize durations as fractional days, matching their wire form.
mod serde_duration_days {
    use chrono::Duration as TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(crate::days_from_duration(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let days = f64::deserialize(deserializer)?;
        Ok(crate::duration_from_days(days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_serializes_as_days() {
        let v = CellValue::Duration(TimeDelta::hours(36));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"type":"duration","value":1.5}"#);
        let back: CellValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
