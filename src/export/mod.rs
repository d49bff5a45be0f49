//! Export module
//!
//! Drives table exports: one [`TableExporter`] per table, sequenced by the
//! [`ExportScheduler`].
//!
//! # Overview
//!
//! - `TableExporter` - count, key lookup, stream, render and write one table
//! - `ExportScheduler` - runs tables in order and tracks overall progress
//! - `ProgressScope` - scheduler state threaded into each table's export

mod progress;
mod scheduler;
mod table;

pub use progress::ProgressScope;
pub use scheduler::ExportScheduler;
pub use table::TableExporter;

use crate::config::{ExportConfig, DEFAULT_WRITE_BUFFER};
use crate::error::{Error, Result};
use crate::render::DEFAULT_INDENT;
use std::path::{Path, PathBuf};

/// Settings shared by every table of a run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory receiving `<table>.json` files
    pub output_dir: PathBuf,
    /// Spaces per nesting level
    pub indent: usize,
    /// Fragments buffered between exporter and sink
    pub write_buffer: usize,
}

impl ExportOptions {
    /// Options with default indent and buffering
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            indent: DEFAULT_INDENT,
            write_buffer: DEFAULT_WRITE_BUFFER,
        }
    }

    /// Set the indent step
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set the write buffer size
    #[must_use]
    pub fn with_write_buffer(mut self, fragments: usize) -> Self {
        self.write_buffer = fragments;
        self
    }

    /// File a table is exported to
    ///
    /// The table name becomes a single file name inside the output directory,
    /// so names that would leave it (separators, `..`, absolute paths) are
    /// rejected.
    pub fn output_path(&self, table: &str) -> Result<PathBuf> {
        let unusable = table.is_empty()
            || table == "."
            || table == ".."
            || table.contains(['/', '\\', '\0']);
        if unusable {
            return Err(Error::metadata(
                table,
                "table name cannot be used as an output file name",
            ));
        }
        Ok(self.output_dir.join(format!("{table}.json")))
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            output_dir: config.output.clone().unwrap_or_default(),
            indent: config.indent,
            write_buffer: config.write_buffer,
        }
    }
}
