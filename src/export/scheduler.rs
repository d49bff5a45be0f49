//! Export scheduler
//!
//! Runs table exports strictly one after another. The first failure ends the
//! run; tables after it are never opened.

use super::{ExportOptions, ProgressScope, TableExporter};
use crate::error::Result;
use crate::sink::SinkFactory;
use crate::source::TableSource;
use crate::types::{fraction, ExportSummary, ProgressEvent, TableDescriptor};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

/// Sequential exporter for a list of tables
pub struct ExportScheduler {
    source: Arc<dyn TableSource>,
    sinks: Arc<dyn SinkFactory>,
    options: ExportOptions,
    progress: Option<UnboundedSender<ProgressEvent>>,
}

impl ExportScheduler {
    /// Create a scheduler without progress reporting
    pub fn new(
        source: Arc<dyn TableSource>,
        sinks: Arc<dyn SinkFactory>,
        options: ExportOptions,
    ) -> Self {
        Self {
            source,
            sinks,
            options,
            progress: None,
        }
    }

    /// Send progress events to `tx`
    #[must_use]
    pub fn with_progress(mut self, tx: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Export options
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Tables to export: just `only` when given, else the whole catalog
    pub async fn resolve_tables(&self, only: Option<&str>) -> Result<Vec<TableDescriptor>> {
        match only {
            Some(name) => Ok(vec![TableDescriptor::new(name)]),
            None => self.source.list_tables().await,
        }
    }

    /// Export every table in order
    pub async fn run(&self, tables: &[TableDescriptor]) -> Result<ExportSummary> {
        let started = Instant::now();
        let exporter = TableExporter::new(
            self.source.as_ref(),
            self.sinks.as_ref(),
            &self.options,
        );
        let total_tables = tables.len();
        let mut summary = ExportSummary::default();

        tracing::info!(
            "Exporting {} tables to {}",
            total_tables,
            self.options.output_dir().display()
        );

        for (tables_completed, table) in tables.iter().enumerate() {
            tracing::info!("Exporting table {} ({}/{})", table, tables_completed + 1, total_tables);

            let scope = ProgressScope::new(
                &table.name,
                tables_completed,
                total_tables,
                self.progress.as_ref(),
            );
            let report = exporter
                .export(table, &scope)
                .await
                .map_err(|e| e.in_table(&table.name))?;

            tracing::info!(
                "Exported {} rows from {} to {} in {}ms",
                report.rows_written,
                table,
                report.path.display(),
                report.duration_ms
            );
            summary.add_table(report);
        }

        // Repeats the last table's final fractions so they never step backwards
        if let Some(last) = summary.tables.last() {
            ProgressScope::new(&last.table, total_tables, total_tables, self.progress.as_ref())
                .emit(
                    "Export complete",
                    fraction(last.rows_read, last.rows_counted),
                    fraction(last.rows_written, last.rows_counted),
                );
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            "Export complete: {} tables, {} rows in {}ms",
            summary.tables.len(),
            summary.total_rows,
            summary.duration_ms
        );
        Ok(summary)
    }
}
