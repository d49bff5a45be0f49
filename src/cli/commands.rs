//! CLI commands and argument parsing

use crate::config::DbEngine;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Export database tables to JSON files
#[derive(Parser, Debug)]
#[command(name = "sql2json")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database engine
    #[arg(short, long, global = true)]
    pub engine: Option<DbEngine>,

    /// Full connection string (overrides host, port, database and user)
    #[arg(long, global = true)]
    pub connection_string: Option<String>,

    /// Database host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Database port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Database name, or file path for sqlite and duckdb
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Database user
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Database password
    #[arg(long, global = true, env = "SQL2JSON_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether this invocation draws progress bars
    pub fn shows_progress(&self) -> bool {
        matches!(self.command, Commands::Export { no_progress, .. } if !no_progress)
    }

    /// Default log level; info lines would tear the progress bars, so those
    /// runs only log warnings unless `-v` is given
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.shows_progress() {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test the database connection
    Check,

    /// List exportable tables, one per line
    Tables,

    /// Export tables to `<output>/<table>.json`
    Export {
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export only this table
        #[arg(short, long)]
        table: Option<String>,

        /// Disable progress bars
        #[arg(long)]
        no_progress: bool,

        /// Fragments buffered between the exporter and the file writer
        #[arg(long)]
        write_buffer: Option<usize>,

        /// Spaces per nesting level
        #[arg(long)]
        indent: Option<usize>,
    },
}
