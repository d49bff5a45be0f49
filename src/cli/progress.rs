//! Terminal progress display
//!
//! Two bars on stderr: overall progress across tables and read progress for
//! the current table, with the confirmed-write percentage in its message.

use crate::types::ProgressEvent;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Bar resolution; fractions are drawn in thousandths
const BAR_LENGTH: u64 = 1000;

/// Progress bars fed by export progress events
pub struct ProgressDisplay {
    overall: ProgressBar,
    table: ProgressBar,
    current_table: Option<String>,
}

impl ProgressDisplay {
    /// Create bars drawn to stderr
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Create bars that draw nothing
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);

        let overall = multi.add(ProgressBar::new(BAR_LENGTH));
        overall.set_style(bar_style(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}",
        ));
        overall.set_message("tables");
        overall.enable_steady_tick(Duration::from_millis(100));

        let table = multi.add(ProgressBar::new(BAR_LENGTH));
        table.set_style(bar_style("  [{bar:40.green/white}] {percent:>3}% {msg}"));

        Self {
            overall,
            table,
            current_table: None,
        }
    }

    /// Apply one event to the bars
    pub fn update(&mut self, event: &ProgressEvent) {
        if self.current_table.as_deref() != Some(event.table.as_str()) {
            self.table.reset();
            self.current_table = Some(event.table.clone());
        }

        self.overall.set_position(scaled(event.overall_fraction));
        self.table.set_position(scaled(event.read_fraction));
        self.table.set_message(format!(
            "{}: {} (written {:.0}%)",
            event.table,
            event.message,
            event.write_fraction * 100.0
        ));
    }

    /// Current positions of the overall and table bars
    pub fn positions(&self) -> (u64, u64) {
        (self.overall.position(), self.table.position())
    }

    /// Stop drawing and clear the bars
    pub fn finish(&self) {
        self.table.finish_and_clear();
        self.overall.finish_and_clear();
    }

    /// Consume events until the sender side is dropped
    pub fn spawn(mut self, mut rx: UnboundedReceiver<ProgressEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.update(&event);
            }
            self.finish();
        })
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Fraction to bar position; overshoot from stale row counts is capped
fn scaled(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(table: &str, read: f64, write: f64, overall: f64) -> ProgressEvent {
        ProgressEvent {
            table: table.to_string(),
            message: "Writing data".to_string(),
            read_fraction: read,
            write_fraction: write,
            overall_fraction: overall,
        }
    }

    #[test]
    fn test_update_positions() {
        let mut display = ProgressDisplay::hidden();
        display.update(&event("users", 0.5, 0.25, 0.0));
        assert_eq!(display.positions(), (0, 500));

        display.update(&event("orders", 0.1, 0.0, 0.5));
        assert_eq!(display.positions(), (500, 100));
    }

    #[test]
    fn test_scaled_caps_overshoot() {
        assert_eq!(scaled(3.0), BAR_LENGTH);
        assert_eq!(scaled(-1.0), 0);
        assert_eq!(scaled(0.0015), 2);
    }

    #[tokio::test]
    async fn test_spawn_ends_when_sender_dropped() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = ProgressDisplay::hidden().spawn(rx);
        tx.send(event("users", 1.0, 1.0, 1.0)).unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
