//! Table source module
//!
//! Everything the exporter needs from a database: the table catalog, per-table
//! metadata and a lazy row cursor.
//!
//! # Overview
//!
//! - `TableSource` - the collaborator trait the exporter is written against
//! - `DuckDbSource` - PostgreSQL, MySQL, SQLite or DuckDB through DuckDB
//! - `MemorySource` - in-memory tables with failure injection

mod database;
mod memory;

pub use database::{DuckDbSource, SOURCE_CATALOG};
pub use memory::{MemorySource, MemoryTable};

use crate::error::Result;
use crate::types::{PrimaryKeySpec, Row, TableDescriptor};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy, finite, non-restartable sequence of rows
pub type RowStream = BoxStream<'static, Result<Row>>;

/// A database the exporter can read tables from
#[async_trait]
pub trait TableSource: Send + Sync {
    /// All exportable tables, in catalog order
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>>;

    /// Row count, used as the progress denominator
    async fn count_rows(&self, table: &TableDescriptor) -> Result<u64>;

    /// Primary-key columns in key order (empty if none)
    async fn primary_key_columns(&self, table: &TableDescriptor) -> Result<PrimaryKeySpec>;

    /// Start streaming the table's rows
    async fn stream_rows(&self, table: &TableDescriptor) -> Result<RowStream>;
}
