//! Document framing
//!
//! Opening, separator and closing tokens for each [`OutputMode`]. A record is
//! always emitted together with the separator that precedes it, so no token
//! ever depends on knowing whether more rows follow.
//!
//! ```text
//! array, 2 rows      keyed, 2 rows        array, 0 rows   keyed, 0 rows
//! [{                 {                    []              {
//!   "a": 1             "1": {                             }
//! },{                    "a": 1
//!   "a": 2             },
//! }]                   "2": {
//!                        "a": 2
//!                      }
//!                    }
//! ```

use super::row::{MissingKey, RowRenderer};
use crate::types::{OutputMode, Row};

/// Produces the byte fragments of one table's JSON document
#[derive(Debug, Clone)]
pub struct Framer {
    mode: OutputMode,
    renderer: RowRenderer,
}

impl Framer {
    /// Create a framer for `mode`
    pub fn new(mode: OutputMode, renderer: RowRenderer) -> Self {
        Self { mode, renderer }
    }

    /// Output mode
    pub fn mode(&self) -> &OutputMode {
        &self.mode
    }

    /// Token written when the sink is opened
    pub fn open(&self) -> &'static str {
        match self.mode {
            OutputMode::KeyedObject { .. } => "{\n",
            OutputMode::Array => "[",
        }
    }

    /// Render the record at zero-based `index`, prefixed with its separator
    pub fn record(&self, row: &Row, index: u64) -> Result<String, MissingKey> {
        let mut out = String::with_capacity(64 * row.len().max(1));
        match &self.mode {
            OutputMode::KeyedObject { column } => {
                if index > 0 {
                    out.push_str("},\n");
                }
                self.renderer.render_keyed(&mut out, row, column)?;
            }
            OutputMode::Array => {
                out.push_str(if index > 0 { "},{\n" } else { "{\n" });
                self.renderer.render_flat(&mut out, row);
            }
        }
        Ok(out)
    }

    /// Token written after the last record, given how many records were written
    pub fn close(&self, records: u64) -> &'static str {
        match (&self.mode, records) {
            (OutputMode::KeyedObject { .. }, 0) => "}\n",
            (OutputMode::KeyedObject { .. }, _) => "}\n}\n",
            (OutputMode::Array, 0) => "]\n",
            (OutputMode::Array, _) => "}]\n",
        }
    }
}
