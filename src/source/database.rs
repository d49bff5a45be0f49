//! DuckDB-backed table source
//!
//! Provides unified access to PostgreSQL, MySQL and SQLite via DuckDB
//! extensions, or to a native DuckDB file. The external database is attached
//! read-only under [`SOURCE_CATALOG`].

use super::{RowStream, TableSource};
use crate::config::{mask_password, DbEngine, SourceConfig};
use crate::error::{Error, Result};
use crate::types::{ColumnValue, PrimaryKeySpec, Row, TableDescriptor};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::Connection;
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Catalog name the source database is attached as
pub const SOURCE_CATALOG: &str = "source_db";

/// Catalog name of DuckDB's own in-memory database
const MEMORY_CATALOG: &str = "memory";

/// Table source using DuckDB as the query engine
pub struct DuckDbSource {
    /// DuckDB connection; cloned for each query
    conn: Mutex<Connection>,
    /// Database type
    engine: DbEngine,
    /// Catalog holding the exported tables
    catalog: String,
    /// Rows buffered ahead of the exporter
    fetch_buffer: usize,
    /// Connection string with the password masked
    connection_info: String,
}

impl DuckDbSource {
    /// Open an in-memory DuckDB and attach the configured database
    pub fn connect(config: &SourceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::connectivity(format!("Failed to create DuckDB connection: {e}")))?;

        let connection_string = config.connection_string()?;
        let catalog = if config.engine == DbEngine::Duckdb && connection_string == ":memory:" {
            MEMORY_CATALOG
        } else {
            attach_database(&conn, config.engine, &connection_string)?;
            SOURCE_CATALOG
        };

        let source = Self {
            conn: Mutex::new(conn),
            engine: config.engine,
            catalog: catalog.to_string(),
            fetch_buffer: crate::config::DEFAULT_FETCH_BUFFER,
            connection_info: mask_password(&connection_string),
        };

        tracing::info!("Connected to {} database {}", source.engine, source.connection_info);
        Ok(source)
    }

    /// Wrap an existing connection whose tables live in `catalog`
    pub fn from_connection(conn: Connection, engine: DbEngine, catalog: impl Into<String>) -> Self {
        let catalog = catalog.into();
        Self {
            conn: Mutex::new(conn),
            engine,
            connection_info: catalog.clone(),
            catalog,
            fetch_buffer: crate::config::DEFAULT_FETCH_BUFFER,
        }
    }

    /// Set how many rows the cursor may read ahead of the exporter
    #[must_use]
    pub fn with_fetch_buffer(mut self, rows: usize) -> Self {
        self.fetch_buffer = rows.max(1);
        self
    }

    /// Database engine
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Connection string for logging, password masked
    pub fn connection_info(&self) -> &str {
        &self.connection_info
    }

    /// Test the database connection
    pub async fn check_connection(&self) -> Result<()> {
        let query = match self.engine {
            DbEngine::Postgres => "SELECT 1 FROM source_db.pg_catalog.pg_tables LIMIT 1",
            DbEngine::Mysql => "SELECT 1 FROM source_db.information_schema.tables LIMIT 1",
            DbEngine::Sqlite => "SELECT 1 FROM source_db.sqlite_master LIMIT 1",
            DbEngine::Duckdb => "SELECT 1",
        };

        self.run_blocking(move |conn| {
            conn.execute_batch(query)
                .map_err(|e| Error::connectivity(format!("Connection check failed: {e}")))
        })
        .await
    }

    /// Fully quoted `catalog.schema.table` reference
    fn qualified_name(&self, table: &str) -> String {
        let mut parts = vec![quote_identifier(&self.catalog)];
        match table.split_once('.') {
            Some((schema, name)) => {
                parts.push(quote_identifier(schema));
                parts.push(quote_identifier(name));
            }
            None => {
                // Default to public schema for postgres
                if self.engine == DbEngine::Postgres {
                    parts.push(quote_identifier("public"));
                }
                parts.push(quote_identifier(table));
            }
        }
        parts.join(".")
    }

    fn clone_connection(&self) -> Result<Connection> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::connectivity("DuckDB connection lock poisoned"))?;
        conn.try_clone()
            .map_err(|e| Error::connectivity(format!("Failed to open DuckDB connection: {e}")))
    }

    /// Run a synchronous DuckDB call off the async runtime
    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.clone_connection()?;
        tokio::task::spawn_blocking(move || f(&conn))
            .await
            .map_err(|e| Error::Other(format!("DuckDB task failed: {e}")))?
    }
}

#[async_trait]
impl TableSource for DuckDbSource {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        let (query, params): (&str, Vec<String>) = match self.engine {
            DbEngine::Postgres => (
                "SELECT table_schema || '.' || table_name AS full_name
                 FROM source_db.information_schema.tables
                 WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
                   AND table_type = 'BASE TABLE'
                 ORDER BY table_schema, table_name",
                vec![],
            ),
            DbEngine::Mysql => (
                "SELECT CONCAT(table_schema, '.', table_name) AS full_name
                 FROM source_db.information_schema.tables
                 WHERE table_schema NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys')
                   AND table_type = 'BASE TABLE'
                 ORDER BY table_schema, table_name",
                vec![],
            ),
            DbEngine::Sqlite => (
                "SELECT name AS full_name FROM source_db.sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
                vec![],
            ),
            DbEngine::Duckdb => (
                "SELECT table_schema || '.' || table_name AS full_name
                 FROM information_schema.tables
                 WHERE table_catalog = ? AND table_type = 'BASE TABLE'
                 ORDER BY table_schema, table_name",
                vec![self.catalog.clone()],
            ),
        };

        tracing::debug!("Listing tables: {}", query);

        let names = self
            .run_blocking(move |conn| {
                let fail = |e: duckdb::Error| Error::connectivity(format!("Failed to list tables: {e}"));
                let mut stmt = conn.prepare(query).map_err(fail)?;
                let rows = stmt
                    .query_map(duckdb::params_from_iter(params.iter()), |row| row.get::<_, String>(0))
                    .map_err(fail)?;
                rows.collect::<std::result::Result<Vec<String>, _>>()
                    .map_err(fail)
            })
            .await?;

        Ok(names.into_iter().map(TableDescriptor::new).collect())
    }

    async fn count_rows(&self, table: &TableDescriptor) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", self.qualified_name(&table.name));
        let name = table.name.clone();

        tracing::debug!("Counting rows: {}", query);

        self.run_blocking(move |conn| {
            let count: i64 = conn
                .query_row(&query, [], |row| row.get(0))
                .map_err(|e| Error::metadata(&name, format!("Failed to count rows: {e}")))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    async fn primary_key_columns(&self, table: &TableDescriptor) -> Result<PrimaryKeySpec> {
        let mut query = String::from(
            "SELECT unnest(constraint_column_names)
             FROM duckdb_constraints()
             WHERE constraint_type = 'PRIMARY KEY' AND database_name = ? AND table_name = ?",
        );
        let mut params = vec![self.catalog.clone()];
        match table.name.split_once('.') {
            Some((schema, name)) => {
                query.push_str(" AND schema_name = ?");
                params.push(name.to_string());
                params.push(schema.to_string());
            }
            None => params.push(table.name.clone()),
        }
        let name = table.name.clone();

        let columns = self
            .run_blocking(move |conn| {
                let fail = |e: duckdb::Error| {
                    Error::metadata(&name, format!("Failed to read primary key: {e}"))
                };
                let mut stmt = conn.prepare(&query).map_err(fail)?;
                let rows = stmt
                    .query_map(duckdb::params_from_iter(params.iter()), |row| row.get::<_, String>(0))
                    .map_err(fail)?;
                rows.collect::<std::result::Result<Vec<String>, _>>()
                    .map_err(fail)
            })
            .await?;

        Ok(PrimaryKeySpec(columns))
    }

    async fn stream_rows(&self, table: &TableDescriptor) -> Result<RowStream> {
        let conn = self.clone_connection()?;
        let relation = self.qualified_name(&table.name);
        let name = table.name.clone();
        let (tx, rx) = mpsc::channel::<Result<Row>>(self.fetch_buffer);

        tokio::task::spawn_blocking(move || match send_rows(&conn, &name, &relation, &tx) {
            Ok(sent) => tracing::debug!("Cursor for {} exhausted after {} rows", name, sent),
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
            }
        });

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}

/// Run `SELECT *` on `relation` and push each row into `tx`.
///
/// Stops early without error when the receiver is gone.
fn send_rows(
    conn: &Connection,
    table: &str,
    relation: &str,
    tx: &mpsc::Sender<Result<Row>>,
) -> Result<u64> {
    let columns = column_names(conn, relation)
        .map_err(|e| Error::metadata(table, format!("Failed to describe columns: {e}")))?;

    let fail = |e: duckdb::Error| Error::stream(table, e.to_string());
    let query = format!("SELECT * FROM {relation}");
    tracing::debug!("Streaming rows: {}", query);

    let mut stmt = conn.prepare(&query).map_err(fail)?;
    let mut rows = stmt.query([]).map_err(fail)?;
    let mut sent = 0u64;

    while let Some(row) = rows.next().map_err(fail)? {
        let mut fields = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value: Value = row.get(i).map_err(fail)?;
            fields.push((Arc::clone(column), column_value(value)));
        }
        if tx.blocking_send(Ok(Row::new(fields))).is_err() {
            tracing::debug!("Row receiver for {} dropped after {} rows", table, sent);
            break;
        }
        sent += 1;
    }

    Ok(sent)
}

/// Column names of `relation` in select order
fn column_names(conn: &Connection, relation: &str) -> duckdb::Result<Vec<Arc<str>>> {
    let mut stmt = conn.prepare(&format!("DESCRIBE SELECT * FROM {relation}"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
    names.map(|name| name.map(Arc::from)).collect()
}

/// Attach external database to DuckDB
fn attach_database(conn: &Connection, engine: DbEngine, connection_string: &str) -> Result<()> {
    let (extension, options) = match engine {
        DbEngine::Postgres => (Some("postgres"), "TYPE POSTGRES, READ_ONLY"),
        DbEngine::Mysql => (Some("mysql"), "TYPE MYSQL, READ_ONLY"),
        DbEngine::Sqlite => (Some("sqlite"), "TYPE SQLITE, READ_ONLY"),
        DbEngine::Duckdb => (None, "READ_ONLY"),
    };

    if let Some(extension) = extension {
        conn.execute_batch(&format!("INSTALL {extension}; LOAD {extension};"))
            .map_err(|e| {
                Error::connectivity(format!("Failed to load {extension} extension: {e}"))
            })?;
    }

    let attach_sql = format!(
        "ATTACH '{}' AS {SOURCE_CATALOG} ({options});",
        connection_string.replace('\'', "''")
    );
    conn.execute_batch(&attach_sql)
        .map_err(|e| Error::connectivity(format!("Failed to attach {engine} database: {e}")))
}

/// Double-quote an identifier for DuckDB SQL
fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Convert a DuckDB value to a column value
fn column_value(value: Value) -> ColumnValue {
    match value {
        Value::Null => ColumnValue::Null,
        Value::Boolean(b) => ColumnValue::Bool(b),
        Value::TinyInt(i) => ColumnValue::Int(i.into()),
        Value::SmallInt(i) => ColumnValue::Int(i.into()),
        Value::Int(i) => ColumnValue::Int(i.into()),
        Value::BigInt(i) => ColumnValue::Int(i),
        Value::HugeInt(i) => ColumnValue::Other(i.to_string()),
        Value::UTinyInt(i) => ColumnValue::Int(i.into()),
        Value::USmallInt(i) => ColumnValue::Int(i.into()),
        Value::UInt(i) => ColumnValue::Int(i.into()),
        Value::UBigInt(i) => ColumnValue::UInt(i),
        Value::Float(f) => ColumnValue::Float(f64::from(f)),
        Value::Double(f) => ColumnValue::Float(f),
        Value::Decimal(d) => ColumnValue::Other(d.to_string()),
        Value::Text(s) => ColumnValue::Text(s),
        Value::Enum(s) => ColumnValue::Text(s),
        Value::Blob(b) => ColumnValue::Other(base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b,
        )),
        Value::Timestamp(unit, t) => {
            let micros = unit.to_micros(t);
            let secs = micros.div_euclid(1_000_000);
            let nsecs = (micros.rem_euclid(1_000_000) * 1000) as u32;
            chrono::DateTime::from_timestamp(secs, nsecs).map_or_else(
                || ColumnValue::Int(t),
                |dt| ColumnValue::Other(dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()),
            )
        }
        Value::Date32(d) => {
            // Days since epoch (719163 is the number of days from 1 CE to 1970-01-01)
            chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163).map_or_else(
                || ColumnValue::Int(d.into()),
                |date| ColumnValue::Other(date.format("%Y-%m-%d").to_string()),
            )
        }
        Value::Time64(unit, t) => {
            // Microseconds since midnight
            let micros = unit.to_micros(t);
            let secs = micros / 1_000_000;
            ColumnValue::Other(format!(
                "{:02}:{:02}:{:02}.{:06}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60,
                micros % 1_000_000
            ))
        }
        other => ColumnValue::Other(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn fixture() -> DuckDbSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR, active BOOLEAN);
             INSERT INTO users VALUES (1, 'Al\"ice', true), (2, 'Bob', NULL);
             CREATE TABLE logs (ts BIGINT, host VARCHAR, msg VARCHAR, PRIMARY KEY (ts, host));
             CREATE TABLE notes (body VARCHAR, created DATE);
             INSERT INTO notes VALUES ('  hi  ', DATE '2024-03-01');",
        )
        .unwrap();
        DuckDbSource::from_connection(conn, DbEngine::Duckdb, MEMORY_CATALOG)
    }

    #[tokio::test]
    async fn test_list_tables_in_catalog_order() {
        let source = fixture();
        let tables = source.list_tables().await.unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["main.logs", "main.notes", "main.users"]);
    }

    #[tokio::test]
    async fn test_primary_key_columns() {
        let source = fixture();

        let users = source
            .primary_key_columns(&TableDescriptor::new("main.users"))
            .await
            .unwrap();
        assert_eq!(users, PrimaryKeySpec::new(["id"]));

        let logs = source
            .primary_key_columns(&TableDescriptor::new("main.logs"))
            .await
            .unwrap();
        assert_eq!(logs, PrimaryKeySpec::new(["ts", "host"]));

        let notes = source
            .primary_key_columns(&TableDescriptor::new("notes"))
            .await
            .unwrap();
        assert!(notes.columns().is_empty());
    }

    #[tokio::test]
    async fn test_count_rows() {
        let source = fixture();
        assert_eq!(
            source.count_rows(&TableDescriptor::new("main.users")).await.unwrap(),
            2
        );
        assert_eq!(
            source.count_rows(&TableDescriptor::new("main.logs")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_count_rows_missing_table() {
        let source = fixture();
        let err = source
            .count_rows(&TableDescriptor::new("main.nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Metadata { .. }));
        assert_eq!(err.table(), Some("main.nope"));
    }

    #[tokio::test]
    async fn test_stream_rows_preserves_columns() {
        let source = fixture().with_fetch_buffer(1);
        let rows: Vec<Row> = source
            .stream_rows(&TableDescriptor::new("main.users"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        let names: Vec<_> = rows[0].fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "name", "active"]);
        assert_eq!(rows[0].get("name"), Some(&ColumnValue::Text("Al\"ice".to_string())));
        assert_eq!(rows[1].get("active"), Some(&ColumnValue::Null));
    }

    #[tokio::test]
    async fn test_stream_rows_converts_dates() {
        let source = fixture();
        let rows: Vec<Row> = source
            .stream_rows(&TableDescriptor::new("main.notes"))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(
            rows[0].get("created"),
            Some(&ColumnValue::Other("2024-03-01".to_string()))
        );
    }

    #[tokio::test]
    async fn test_stream_rows_missing_table_yields_error() {
        let source = fixture();
        let mut stream = source
            .stream_rows(&TableDescriptor::new("main.nope"))
            .await
            .unwrap();
        let first = stream.next().await.unwrap();
        assert!(first.is_err());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_check_connection() {
        assert!(fixture().check_connection().await.is_ok());
    }

    #[test]
    fn test_qualified_name() {
        let source = fixture();
        assert_eq!(
            source.qualified_name("main.users"),
            "\"memory\".\"main\".\"users\""
        );
        assert_eq!(source.qualified_name("we\"ird"), "\"memory\".\"we\"\"ird\"");
    }

    #[test]
    fn test_column_value_conversion() {
        assert_eq!(column_value(Value::Null), ColumnValue::Null);
        assert_eq!(column_value(Value::Boolean(true)), ColumnValue::Bool(true));
        assert_eq!(column_value(Value::Int(42)), ColumnValue::Int(42));
        assert_eq!(column_value(Value::UBigInt(7)), ColumnValue::UInt(7));
        assert_eq!(
            column_value(Value::Text("hello".to_string())),
            ColumnValue::Text("hello".to_string())
        );
        assert_eq!(
            column_value(Value::Blob(vec![1, 2, 3])),
            ColumnValue::Other("AQID".to_string())
        );
    }
}
