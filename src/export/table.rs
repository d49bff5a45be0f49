//! Single-table export
//!
//! Protocol for one table:
//!
//! 1. Count rows and look up the primary key; the key decides the output mode.
//! 2. Open the sink and write the opening token.
//! 3. Stream rows. Each row bumps the read counter on arrival, is rendered with
//!    its separator and queued for the sink writer, which bumps the write
//!    counter once the sink has flushed it.
//! 4. Write the closing token, close the sink and wait for the flush.
//!
//! Any failure after the sink is open stops the stream, lets the writer drain
//! what is queued and closes the sink without a closing token.

use super::{ExportOptions, ProgressScope};
use crate::error::{Error, Result};
use crate::render::{Framer, RowRenderer};
use crate::sink::{Chunk, SinkFactory, SinkWriter};
use crate::source::TableSource;
use crate::types::{fraction, TableDescriptor, TableReport};
use futures::StreamExt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Exports one table at a time to `<output_dir>/<table>.json`
pub struct TableExporter<'a> {
    source: &'a dyn TableSource,
    sinks: &'a dyn SinkFactory,
    options: &'a ExportOptions,
}

impl<'a> TableExporter<'a> {
    /// Create an exporter
    pub fn new(
        source: &'a dyn TableSource,
        sinks: &'a dyn SinkFactory,
        options: &'a ExportOptions,
    ) -> Self {
        Self {
            source,
            sinks,
            options,
        }
    }

    /// Export `table`, reporting progress through `scope`
    pub async fn export(
        &self,
        table: &TableDescriptor,
        scope: &ProgressScope<'_>,
    ) -> Result<TableReport> {
        let started = Instant::now();
        let path = self.options.output_path(&table.name)?;

        scope.emit("Counting rows", 0.0, 0.0);
        let rows_counted = self.source.count_rows(table).await?;
        let primary_key = self.source.primary_key_columns(table).await?;
        let mode = primary_key.output_mode();
        tracing::debug!(
            "Table {} has {} rows, primary key {:?}, mode {:?}",
            table,
            rows_counted,
            primary_key.columns(),
            mode
        );

        let framer = Framer::new(mode, RowRenderer::new(self.options.indent));
        let sink = self.sinks.open(&path).await?;
        let acknowledged = Arc::new(AtomicU64::new(0));
        let (tx, writer) = SinkWriter::spawn(
            sink,
            self.options.write_buffer,
            Arc::clone(&acknowledged),
            path.display().to_string(),
        );

        let pumped = self
            .pump(table, &framer, &tx, &acknowledged, rows_counted, scope, &path)
            .await;

        let rows_read = match pumped {
            Ok(rows_read) => rows_read,
            Err(e) => {
                drop(tx);
                let finished = writer.finish().await;
                tracing::debug!("Aborted export of {} left {}", table, path.display());
                return match finished {
                    // The writer stopped first; its error is the real cause
                    Err(sink_err) if e.is_sink() => Err(sink_err),
                    _ => Err(e),
                };
            }
        };

        let closed = tx.send(Chunk::Framing(framer.close(rows_read))).await;
        drop(tx);
        let rows_written = writer.finish().await?;
        if closed.is_err() {
            return Err(Error::sink(
                path.display().to_string(),
                "writer stopped before the closing token",
            ));
        }

        scope.emit(
            "Done",
            fraction(rows_read, rows_counted),
            fraction(rows_written, rows_counted),
        );

        if rows_read != rows_counted {
            tracing::warn!(
                "Table {} streamed {} rows but {} were counted",
                table,
                rows_read,
                rows_counted
            );
        }

        Ok(TableReport {
            table: table.name.clone(),
            mode: framer.mode().clone(),
            path,
            rows_counted,
            rows_read,
            rows_written,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Move rows from the source to the writer; returns rows read
    #[allow(clippy::too_many_arguments)]
    async fn pump(
        &self,
        table: &TableDescriptor,
        framer: &Framer,
        tx: &mpsc::Sender<Chunk>,
        acknowledged: &AtomicU64,
        rows_counted: u64,
        scope: &ProgressScope<'_>,
        path: &Path,
    ) -> Result<u64> {
        let stopped = || Error::sink(path.display().to_string(), "sink writer stopped");

        tx.send(Chunk::Framing(framer.open()))
            .await
            .map_err(|_| stopped())?;

        let mut rows = self.source.stream_rows(table).await?;
        scope.emit("Fetching data", 0.0, 0.0);

        let mut read = 0u64;
        while let Some(row) = rows.next().await {
            let row = row?;
            read += 1;

            let record = framer
                .record(&row, read - 1)
                .map_err(|e| Error::stream(&table.name, e.to_string()))?;
            tx.send(Chunk::Record(record))
                .await
                .map_err(|_| stopped())?;

            let written = acknowledged.load(Ordering::Acquire);
            scope.emit(
                "Writing data",
                fraction(read, rows_counted),
                fraction(written, rows_counted),
            );
        }

        Ok(read)
    }
}
