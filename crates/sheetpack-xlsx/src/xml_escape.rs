//! Minimal XML escaping for hand-rendered SpreadsheetML fragments.

/// Escape text content.
pub(crate) fn text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value.
pub(crate) fn attr(s: &str) -> String {
    text(s).replace('"', "&quot;").replace('\'', "&apos;")
}
