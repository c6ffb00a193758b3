use core::fmt;

use serde::{Deserialize, Serialize};

/// An Excel error literal as stored in cell values (`t="e"`).
///
/// The enum is closed: every wire literal maps to exactly one variant and
/// back, with no runtime "unimplemented" fallback. `from_wire` returning
/// `None` means the text is not an error literal at all.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorValue {
    /// `#NULL!` — intersection of ranges that do not intersect.
    Null,
    /// `#DIV/0!` — division by zero.
    Div0,
    /// `#VALUE!` — wrong operand type.
    Value,
    /// `#REF!` — invalid cell reference.
    Ref,
    /// `#NAME?` — unrecognized name.
    Name,
    /// `#NUM!` — invalid numeric value.
    Num,
    /// `#N/A` — value not available.
    NA,
    /// `#GETTING_DATA` — asynchronous data retrieval in progress.
    GettingData,
}

impl ErrorValue {
    /// All variants, in wire-table order. Used by the completeness test.
    pub const ALL: [ErrorValue; 8] = [
        ErrorValue::Null,
        ErrorValue::Div0,
        ErrorValue::Value,
        ErrorValue::Ref,
        ErrorValue::Name,
        ErrorValue::Num,
        ErrorValue::NA,
        ErrorValue::GettingData,
    ];

    /// The wire literal for this error.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorValue::Null => "#NULL!",
            ErrorValue::Div0 => "#DIV/0!",
            ErrorValue::Value => "#VALUE!",
            ErrorValue::Ref => "#REF!",
            ErrorValue::Name => "#NAME?",
            ErrorValue::Num => "#NUM!",
            ErrorValue::NA => "#N/A",
            ErrorValue::GettingData => "#GETTING_DATA",
        }
    }

    /// Parse a wire literal.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "#NULL!" => Some(ErrorValue::Null),
            "#DIV/0!" => Some(ErrorValue::Div0),
            "#VALUE!" => Some(ErrorValue::Value),
            "#REF!" => Some(ErrorValue::Ref),
            "#NAME?" => Some(ErrorValue::Name),
            "#NUM!" => Some(ErrorValue::Num),
            "#N/A" => Some(ErrorValue::NA),
            "#GETTING_DATA" => Some(ErrorValue::GettingData),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_maps_both_ways() {
        for variant in ErrorValue::ALL {
            assert_eq!(ErrorValue::from_wire(variant.as_str()), Some(variant));
        }
    }

    #[test]
    fn unknown_literal_is_not_an_error_value() {
        assert_eq!(ErrorValue::from_wire("#BOGUS!"), None);
        assert_eq!(ErrorValue::from_wire(""), None);
    }
}
