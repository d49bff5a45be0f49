// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # sql2json
//!
//! Streams every table of a relational database into one JSON document per
//! table, with bounded memory and live progress.
//!
//! ## Features
//!
//! - **Any SQL source via DuckDB**: PostgreSQL, MySQL and SQLite are attached
//!   read-only; native DuckDB files work directly
//! - **Keyed or array output**: a single-column primary key turns the table
//!   into an object keyed by that column, anything else becomes an array
//! - **Streaming**: rows are rendered and written one at a time
//! - **Progress**: separate read and confirmed-write fractions per table, plus
//!   an overall fraction across tables
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sql2json::config::{DbEngine, SourceConfig};
//! use sql2json::export::{ExportOptions, ExportScheduler};
//! use sql2json::sink::FileSinkFactory;
//! use sql2json::source::DuckDbSource;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> sql2json::Result<()> {
//!     let source = DuckDbSource::connect(&SourceConfig {
//!         engine: DbEngine::Sqlite,
//!         database: Some("app.db".to_string()),
//!         ..SourceConfig::default()
//!     })?;
//!
//!     let scheduler = ExportScheduler::new(
//!         Arc::new(source),
//!         Arc::new(FileSinkFactory::new()),
//!         ExportOptions::new("out"),
//!     );
//!     let tables = scheduler.resolve_tables(None).await?;
//!     let summary = scheduler.run(&tables).await?;
//!     println!("{} rows exported", summary.total_rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ExportScheduler                         │
//! │        tables in order, overall progress, first error        │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ per table
//! ┌──────────────┬───────────────┴───────────┬───────────────────┐
//! │ TableSource  │      TableExporter        │   SinkWriter      │
//! ├──────────────┼───────────────────────────┼───────────────────┤
//! │ list/count   │ Framer → RowRenderer      │ bounded channel   │
//! │ primary key  │        → value encoder    │ write, ack, close │
//! │ row stream   │ read/write fractions      │ OutputSink (file) │
//! └──────────────┴───────────────────────────┴───────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Rows, keys, progress events and reports
pub mod types;

/// Export and connection configuration
pub mod config;

/// JSON text generation
pub mod render;

/// Output destinations
pub mod sink;

/// Database access
pub mod source;

/// Table export and scheduling
pub mod export;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{DbEngine, ExportConfig, SourceConfig};
pub use export::{ExportOptions, ExportScheduler, TableExporter};
pub use source::{DuckDbSource, MemorySource, MemoryTable, TableSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
