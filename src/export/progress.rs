//! Progress reporting for a table export

use crate::types::{fraction, ProgressEvent};
use tokio::sync::mpsc::UnboundedSender;

/// Scheduler state as seen by the table currently being exported.
///
/// Every event emitted through a scope carries the same overall fraction,
/// `tables_completed / total_tables`.
#[derive(Debug, Clone, Copy)]
pub struct ProgressScope<'a> {
    table: &'a str,
    tables_completed: usize,
    total_tables: usize,
    tx: Option<&'a UnboundedSender<ProgressEvent>>,
}

impl<'a> ProgressScope<'a> {
    /// Scope for `table`, the `tables_completed + 1`-th of `total_tables`
    pub fn new(
        table: &'a str,
        tables_completed: usize,
        total_tables: usize,
        tx: Option<&'a UnboundedSender<ProgressEvent>>,
    ) -> Self {
        Self {
            table,
            tables_completed,
            total_tables,
            tx,
        }
    }

    /// Scope that reports nowhere
    pub fn silent(table: &'a str) -> Self {
        Self::new(table, 0, 1, None)
    }

    /// Completed tables / total tables
    pub fn overall_fraction(&self) -> f64 {
        fraction(self.tables_completed as u64, self.total_tables as u64)
    }

    /// Send an event; a dropped receiver is ignored
    pub fn emit(&self, message: &str, read_fraction: f64, write_fraction: f64) {
        let Some(tx) = self.tx else {
            return;
        };
        let _ = tx.send(ProgressEvent {
            table: self.table.to_string(),
            message: message.to_string(),
            read_fraction,
            write_fraction,
            overall_fraction: self.overall_fraction(),
        });
    }
}
