//! CLI module
//!
//! Command-line interface for exporting databases.
//!
//! # Commands
//!
//! - `check` - Test the database connection
//! - `tables` - List exportable tables
//! - `export` - Write each table to `<output>/<table>.json`

mod commands;
mod progress;
mod runner;

pub use commands::{Cli, Commands};
pub use progress::ProgressDisplay;
pub use runner::Runner;
