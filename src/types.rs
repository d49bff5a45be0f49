//! Common types used throughout sql2json
//!
//! Table descriptors, rows and their column values, and the progress and
//! report records produced by an export run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Tables
// ============================================================================

/// A table to export
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name as reported by the catalog (may be schema-qualified)
    pub name: String,
}

impl TableDescriptor {
    /// Create a table descriptor
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Ordered primary-key columns of a table (possibly empty)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeySpec(pub Vec<String>);

impl PrimaryKeySpec {
    /// Create a primary key spec from column names
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(columns.into_iter().map(Into::into).collect())
    }

    /// Column names in key order
    pub fn columns(&self) -> &[String] {
        &self.0
    }

    /// Output shape implied by this key
    pub fn output_mode(&self) -> OutputMode {
        match self.0.as_slice() {
            [column] => OutputMode::KeyedObject {
                column: column.clone(),
            },
            _ => OutputMode::Array,
        }
    }
}

/// Shape of an exported table's JSON document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputMode {
    /// Object keyed by the single primary-key column
    KeyedObject {
        /// Primary-key column
        column: String,
    },
    /// Array of row objects
    Array,
}

impl OutputMode {
    /// Check if rows are nested under their key
    pub fn is_keyed(&self) -> bool {
        matches!(self, Self::KeyedObject { .. })
    }
}

// ============================================================================
// Rows
// ============================================================================

/// A single column value as delivered by a row source
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
    /// Anything else, in its textual form (dates, blobs, decimals, ...)
    Other(String),
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One row: column names paired with values, in source column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(Arc<str>, ColumnValue)>,
}

impl Row {
    /// Create a row from ordered fields
    pub fn new(fields: Vec<(Arc<str>, ColumnValue)>) -> Self {
        Self { fields }
    }

    /// Build a row from borrowed names, mostly for tests and fixtures
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<ColumnValue>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(name, value)| (Arc::from(name.as_ref()), value.into()))
                .collect(),
        }
    }

    /// Iterate fields in column order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.fields.iter().map(|(name, value)| (name.as_ref(), value))
    }

    /// Look up a column value by name
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.fields
            .iter()
            .find(|(name, _)| name.as_ref() == column)
            .map(|(_, value)| value)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the row has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ============================================================================
// Progress and Reports
// ============================================================================

/// A progress update for the table currently being exported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Table being exported
    pub table: String,
    /// Current phase ("Counting rows", "Writing data", ...)
    pub message: String,
    /// Rows received from the cursor / counted rows
    pub read_fraction: f64,
    /// Rows confirmed written / counted rows
    pub write_fraction: f64,
    /// Completed tables / total tables
    pub overall_fraction: f64,
}

/// Outcome of one table's export
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    /// Table name
    pub table: String,
    /// Output shape used
    pub mode: OutputMode,
    /// File written
    pub path: PathBuf,
    /// Rows counted before streaming
    pub rows_counted: u64,
    /// Rows received from the cursor
    pub rows_read: u64,
    /// Rows confirmed written
    pub rows_written: u64,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

/// Outcome of a whole export run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    /// Per-table reports in export order
    pub tables: Vec<TableReport>,
    /// Rows written across all tables
    pub total_rows: u64,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl ExportSummary {
    /// Record a completed table
    pub fn add_table(&mut self, report: TableReport) {
        self.total_rows += report.rows_written;
        self.tables.push(report);
    }
}

/// Ratio helper for progress fractions; an empty denominator counts as done
pub(crate) fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        done as f64 / total as f64
    }
}
