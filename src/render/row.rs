//! Row rendering
//!
//! Renders one row's fields as JSON object members at a given nesting level.

use super::value::{write_key, write_quoted, write_value};
use crate::types::Row;
use std::fmt;

/// Default number of spaces per nesting level
pub const DEFAULT_INDENT: usize = 2;

/// A keyed-mode row did not carry its primary-key column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKey {
    /// The primary-key column that was absent
    pub column: String,
}

impl fmt::Display for MissingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row has no primary-key column '{}'", self.column)
    }
}

/// Renders rows with a fixed indent step
#[derive(Debug, Clone, Copy)]
pub struct RowRenderer {
    indent: usize,
}

impl Default for RowRenderer {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
        }
    }
}

impl RowRenderer {
    /// Create a renderer with `indent` spaces per level
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }

    /// Write the row's fields, one per line at `level`, skipping `skip`.
    ///
    /// No separator follows the last field. Returns the number of fields
    /// written.
    pub fn write_fields(
        &self,
        out: &mut String,
        row: &Row,
        level: usize,
        skip: Option<&str>,
    ) -> usize {
        let pad = self.indent * level;
        let mut written = 0;
        for (name, value) in row.fields() {
            if skip == Some(name) {
                continue;
            }
            if written > 0 {
                out.push_str(",\n");
            }
            out.extend(std::iter::repeat(' ').take(pad));
            write_quoted(out, name);
            out.push_str(": ");
            write_value(out, value);
            written += 1;
        }
        written
    }

    /// Render a flat record body: all columns at level 1.
    ///
    /// The caller supplies the surrounding braces.
    pub fn render_flat(&self, out: &mut String, row: &Row) {
        if self.write_fields(out, row, 1, None) > 0 {
            out.push('\n');
        }
    }

    /// Render a keyed record: `"<key>": {` followed by the remaining columns
    /// one level deeper. The closing brace is left to the caller.
    pub fn render_keyed(
        &self,
        out: &mut String,
        row: &Row,
        key_column: &str,
    ) -> Result<(), MissingKey> {
        let key = row.get(key_column).ok_or_else(|| MissingKey {
            column: key_column.to_string(),
        })?;

        out.extend(std::iter::repeat(' ').take(self.indent));
        write_key(out, key);
        out.push_str(": {\n");
        if self.write_fields(out, row, 2, Some(key_column)) > 0 {
            out.push('\n');
        }
        out.extend(std::iter::repeat(' ').take(self.indent));
        Ok(())
    }
}
