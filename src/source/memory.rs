//! In-memory table source
//!
//! Holds tables as plain row vectors. Counts, keys and streams can be made to
//! fail, and the reported row count can differ from the rows streamed, which
//! makes it the fixture of choice for exercising the exporter.

use super::{RowStream, TableSource};
use crate::error::{Error, Result};
use crate::types::{PrimaryKeySpec, Row, TableDescriptor};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};

/// One in-memory table
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    /// Table name
    pub name: String,
    /// Primary-key columns
    pub primary_key: PrimaryKeySpec,
    /// Rows in stream order
    pub rows: Vec<Row>,
    /// Reported row count, if different from `rows.len()`
    pub count_override: Option<u64>,
    /// Fail the stream after this many rows
    pub fail_after: Option<usize>,
    /// Fail the row count lookup
    pub fail_count: bool,
}

impl MemoryTable {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set primary-key columns
    #[must_use]
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = PrimaryKeySpec::new(columns);
        self
    }

    /// Set rows
    #[must_use]
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Report `count` rows regardless of how many are streamed
    #[must_use]
    pub fn with_reported_count(mut self, count: u64) -> Self {
        self.count_override = Some(count);
        self
    }

    /// Fail the stream once `rows` rows have been yielded
    #[must_use]
    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    /// Fail the row count lookup
    #[must_use]
    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }
}

/// Table source backed by in-memory tables
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: Vec<MemoryTable>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table; catalog order is insertion order
    #[must_use]
    pub fn with_table(mut self, table: MemoryTable) -> Self {
        self.tables.push(table);
        self
    }

    fn table(&self, table: &TableDescriptor) -> Result<&MemoryTable> {
        self.tables
            .iter()
            .find(|t| t.name == table.name)
            .ok_or_else(|| Error::metadata(&table.name, "table does not exist"))
    }
}

#[async_trait]
impl TableSource for MemorySource {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        Ok(self
            .tables
            .iter()
            .map(|t| TableDescriptor::new(&t.name))
            .collect())
    }

    async fn count_rows(&self, table: &TableDescriptor) -> Result<u64> {
        let t = self.table(table)?;
        if t.fail_count {
            return Err(Error::metadata(&t.name, "count query failed"));
        }
        Ok(t.count_override.unwrap_or(t.rows.len() as u64))
    }

    async fn primary_key_columns(&self, table: &TableDescriptor) -> Result<PrimaryKeySpec> {
        Ok(self.table(table)?.primary_key.clone())
    }

    async fn stream_rows(&self, table: &TableDescriptor) -> Result<RowStream> {
        let t = self.table(table)?;
        let name = t.name.clone();
        let rows: Vec<Result<Row>> = match t.fail_after {
            Some(n) => t
                .rows
                .iter()
                .take(n)
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(Error::stream(
                    name,
                    format!("cursor failed after {n} rows"),
                ))))
                .collect(),
            None => t.rows.iter().cloned().map(Ok).collect(),
        };
        Ok(stream::iter(rows).boxed())
    }
}
