//! Column value encoding
//!
//! Turns a single [`ColumnValue`] into a JSON scalar token. Encoding is total:
//! every value produces a valid token, there is no error path.

use crate::types::ColumnValue;
use std::borrow::Cow;
use std::fmt::Write as _;

/// Encode a value as a standalone JSON token
pub fn encode_value(value: &ColumnValue) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Append the JSON token for `value` to `out`.
///
/// Strings are trimmed of leading and trailing whitespace before quoting.
/// This is lossy for data where edge whitespace matters and is kept for
/// compatibility with existing exports.
pub fn write_value(out: &mut String, value: &ColumnValue) {
    match value {
        ColumnValue::Null => out.push_str("null"),
        ColumnValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        ColumnValue::Int(i) => {
            let _ = write!(out, "{i}");
        }
        ColumnValue::UInt(u) => {
            let _ = write!(out, "{u}");
        }
        ColumnValue::Float(f) if f.is_finite() => {
            let _ = write!(out, "{f}");
        }
        // NaN and infinities have no JSON literal
        ColumnValue::Float(f) => write_quoted(out, &f.to_string()),
        ColumnValue::Text(s) | ColumnValue::Other(s) => write_quoted(out, s.trim()),
    }
}

/// Append `value` as an object key: its raw text in quotes, untrimmed.
pub fn write_key(out: &mut String, value: &ColumnValue) {
    write_quoted(out, &key_text(value));
}

/// Raw text of a value as used in key position
pub fn key_text(value: &ColumnValue) -> Cow<'_, str> {
    match value {
        ColumnValue::Null => Cow::Borrowed("null"),
        ColumnValue::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        ColumnValue::Int(i) => Cow::Owned(i.to_string()),
        ColumnValue::UInt(u) => Cow::Owned(u.to_string()),
        ColumnValue::Float(f) => Cow::Owned(f.to_string()),
        ColumnValue::Text(s) | ColumnValue::Other(s) => Cow::Borrowed(s),
    }
}

/// Append `s` wrapped in double quotes, escaped
pub fn write_quoted(out: &mut String, s: &str) {
    out.reserve(s.len() + 2);
    out.push('"');
    escape_into(out, s);
    out.push('"');
}

/// Escape `s` for use inside a JSON string, in a single pass.
///
/// Produces the same text as the legacy substitution chain (backslash, quote,
/// newline, carriage return, tab); other control characters become `\u00XX`.
pub fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
}
