//! Integration tests for full table exports
//!
//! Tests the end-to-end flow: table source → scheduler → JSON files on disk

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sql2json::sink::FileSinkFactory;
use sql2json::{
    DbEngine, DuckDbSource, Error, ExportOptions, ExportScheduler, MemorySource, MemoryTable,
    OutputMode, Row, SourceConfig, TableSource,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn scheduler(source: impl TableSource + 'static, dir: &Path) -> ExportScheduler {
    ExportScheduler::new(
        Arc::new(source),
        Arc::new(FileSinkFactory::new()),
        ExportOptions::new(dir),
    )
}

// ============================================================================
// In-memory Source
// ============================================================================

#[tokio::test]
async fn test_export_catalog_to_files() {
    let dir = tempdir().unwrap();
    let source = MemorySource::new()
        .with_table(
            MemoryTable::new("users")
                .with_primary_key(["id"])
                .with_rows(vec![
                    Row::from_pairs([("id", json_value(1)), ("name", "Al\"ice".into())]),
                    Row::from_pairs([("id", json_value(2)), ("name", "Bob".into())]),
                ]),
        )
        .with_table(MemoryTable::new("logs").with_primary_key(["ts", "host"]))
        .with_table(MemoryTable::new("tags").with_rows(vec![
            Row::from_pairs([("tag", "a")]),
            Row::from_pairs([("tag", "b")]),
        ]));

    let scheduler = scheduler(source, dir.path());
    let tables = scheduler.resolve_tables(None).await.unwrap();
    let summary = scheduler.run(&tables).await.unwrap();

    assert_eq!(summary.tables.len(), 3);
    assert_eq!(summary.total_rows, 4);
    assert!(summary.tables[0].mode.is_keyed());
    assert_eq!(summary.tables[1].mode, OutputMode::Array);

    assert_eq!(
        read_json(&dir.path().join("users.json")),
        json!({"1": {"name": "Al\"ice"}, "2": {"name": "Bob"}})
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("logs.json")).unwrap(),
        "[]\n"
    );
    assert_eq!(
        read_json(&dir.path().join("tags.json")),
        json!([{"tag": "a"}, {"tag": "b"}])
    );
}

#[tokio::test]
async fn test_failure_leaves_earlier_files_valid() {
    let dir = tempdir().unwrap();
    let source = MemorySource::new()
        .with_table(MemoryTable::new("first").with_rows(vec![Row::from_pairs([("x", 1i64)])]))
        .with_table(
            MemoryTable::new("second")
                .with_rows(vec![Row::from_pairs([("x", 1i64)]); 3])
                .failing_after(1),
        )
        .with_table(MemoryTable::new("third"));

    let scheduler = scheduler(source, dir.path());
    let tables = scheduler.resolve_tables(None).await.unwrap();
    let err = scheduler.run(&tables).await.unwrap_err();

    assert_eq!(err.table(), Some("second"));
    assert!(matches!(err, Error::TableExport { .. }));
    assert_eq!(read_json(&dir.path().join("first.json")), json!([{"x": 1}]));
    assert!(dir.path().join("second.json").exists());
    assert!(!dir.path().join("third.json").exists());
}

fn json_value(i: i64) -> sql2json::ColumnValue {
    i.into()
}

// ============================================================================
// DuckDB Source
// ============================================================================

fn create_database(path: &Path) {
    let conn = duckdb::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR, score DOUBLE);
         INSERT INTO users VALUES (1, 'Alice', 9.5), (2, '  Bob  ', NULL);
         CREATE TABLE events (day DATE, kind VARCHAR, payload BLOB);
         INSERT INTO events VALUES (DATE '2024-01-02', 'login', 'hi'::BLOB);",
    )
    .unwrap();
}

#[tokio::test]
async fn test_export_duckdb_file() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("app.duckdb");
    create_database(&db_path);
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let source = DuckDbSource::connect(&SourceConfig {
        engine: DbEngine::Duckdb,
        database: Some(db_path.to_string_lossy().into_owned()),
        ..SourceConfig::default()
    })
    .unwrap();
    source.check_connection().await.unwrap();

    let scheduler = scheduler(source, &out);
    let tables = scheduler.resolve_tables(None).await.unwrap();
    let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["main.events", "main.users"]);

    let summary = scheduler.run(&tables).await.unwrap();
    assert_eq!(summary.total_rows, 3);

    assert_eq!(
        read_json(&out.join("main.users.json")),
        json!({
            "1": {"name": "Alice", "score": 9.5},
            "2": {"name": "Bob", "score": null}
        })
    );
    assert_eq!(
        read_json(&out.join("main.events.json")),
        json!([{"day": "2024-01-02", "kind": "login", "payload": "aGk="}])
    );
}

#[tokio::test]
async fn test_export_single_duckdb_table() {
    let dir = tempdir().unwrap();
    let conn = duckdb::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE pairs (a INTEGER, b INTEGER, PRIMARY KEY (a, b));
         INSERT INTO pairs VALUES (1, 2), (3, 4);",
    )
    .unwrap();
    let source = DuckDbSource::from_connection(conn, DbEngine::Duckdb, "memory");

    let scheduler = scheduler(source, dir.path());
    let tables = scheduler.resolve_tables(Some("main.pairs")).await.unwrap();
    scheduler.run(&tables).await.unwrap();

    assert_eq!(
        read_json(&dir.path().join("main.pairs.json")),
        json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}])
    );
}
