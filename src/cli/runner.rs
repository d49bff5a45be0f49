//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::cli::progress::ProgressDisplay;
use crate::config::{mask_password, ExportConfig};
use crate::error::{Error, Result, ResultExt};
use crate::export::{ExportOptions, ExportScheduler};
use crate::sink::FileSinkFactory;
use crate::source::{DuckDbSource, TableSource};
use serde_json::json;
use std::sync::Arc;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Tables => self.tables().await,
            Commands::Export { .. } => self.export(self.cli.shows_progress()).await,
        }
    }

    /// Config file (if any) with command-line flags layered on top
    pub fn load_config(&self) -> Result<ExportConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ExportConfig::from_file(path)?,
            None => ExportConfig::default(),
        };

        let source = &mut config.source;
        if let Some(engine) = self.cli.engine {
            source.engine = engine;
        }
        if let Some(ref conn_str) = self.cli.connection_string {
            source.connection_string = Some(conn_str.clone());
        }
        if let Some(ref host) = self.cli.host {
            source.host = Some(host.clone());
        }
        if let Some(port) = self.cli.port {
            source.port = Some(port);
        }
        if let Some(ref database) = self.cli.database {
            source.database = Some(database.clone());
        }
        if let Some(ref user) = self.cli.user {
            source.user = Some(user.clone());
        }
        if let Some(ref password) = self.cli.password {
            source.password = Some(password.clone());
        }

        if let Commands::Export {
            output,
            table,
            write_buffer,
            indent,
            ..
        } = &self.cli.command
        {
            if output.is_some() {
                config.output.clone_from(output);
            }
            if table.is_some() {
                config.table.clone_from(table);
            }
            if let Some(write_buffer) = write_buffer {
                config.write_buffer = *write_buffer;
            }
            if let Some(indent) = indent {
                config.indent = *indent;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Connect off the async runtime; attaching may download an extension
    async fn connect(&self, config: &ExportConfig) -> Result<DuckDbSource> {
        let source_config = config.source.clone();
        let fetch_buffer = config.fetch_buffer;
        tokio::task::spawn_blocking(move || {
            DuckDbSource::connect(&source_config).map(|s| s.with_fetch_buffer(fetch_buffer))
        })
        .await
        .map_err(|e| Error::Other(format!("Connect task failed: {e}")))?
    }

    /// Check the database connection
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        tracing::info!(
            "Checking connection to {} database {}",
            config.source.engine,
            mask_password(&config.source.connection_string()?)
        );

        let source = self.connect(&config).await?;
        source.check_connection().await?;
        let tables = source
            .list_tables()
            .await
            .context("Connected, but the table catalog is unreadable")?;

        println!(
            "{}",
            json!({
                "status": "SUCCEEDED",
                "engine": source.engine().to_string(),
                "connection": source.connection_info(),
                "message": format!("Connection successful. Found {} tables.", tables.len())
            })
        );
        Ok(())
    }

    /// List exportable tables
    async fn tables(&self) -> Result<()> {
        let config = self.load_config()?;
        let source = self.connect(&config).await?;

        for table in source.list_tables().await? {
            println!("{table}");
        }
        Ok(())
    }

    /// Export tables to the output directory
    async fn export(&self, show_progress: bool) -> Result<()> {
        let config = self.load_config()?;
        let output_dir = config.output_dir()?.to_path_buf();

        tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
            Error::sink(
                output_dir.display().to_string(),
                format!("Failed to create output directory: {e}"),
            )
        })?;

        let source = self.connect(&config).await?;
        let mut scheduler = ExportScheduler::new(
            Arc::new(source),
            Arc::new(FileSinkFactory::new()),
            ExportOptions::from(&config),
        );

        let display = if show_progress {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            scheduler = scheduler.with_progress(tx);
            Some(ProgressDisplay::new().spawn(rx))
        } else {
            None
        };

        let result = match scheduler.resolve_tables(config.table.as_deref()).await {
            Ok(tables) => scheduler.run(&tables).await,
            Err(e) => Err(e),
        };

        // Dropping the scheduler closes the progress channel
        drop(scheduler);
        if let Some(display) = display {
            let _ = display.await;
        }

        let summary = result?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn runner(args: &[&str]) -> Runner {
        let mut argv = vec!["sql2json"];
        argv.extend_from_slice(args);
        Runner::new(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"source": {"engine": "postgres", "host": "db", "database": "app"},
                "output": "from-file", "indent": 4}"#,
        )
        .unwrap();

        let config = runner(&[
            "--config",
            path.to_str().unwrap(),
            "--host",
            "override",
            "export",
            "--output",
            "from-flag",
        ])
        .load_config()
        .unwrap();

        assert_eq!(config.source.host.as_deref(), Some("override"));
        assert_eq!(config.source.database.as_deref(), Some("app"));
        assert_eq!(config.output, Some(PathBuf::from("from-flag")));
        assert_eq!(config.indent, 4);
    }

    #[test]
    fn test_invalid_indent_rejected() {
        let result = runner(&["export", "--output", "out", "--indent", "20"]).load_config();
        assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
    }

    #[tokio::test]
    async fn test_export_requires_output() {
        let err = runner(&["--engine", "duckdb", "export", "--no-progress"])
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }

    #[tokio::test]
    async fn test_export_in_memory_duckdb() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("out");

        // An empty in-memory database exports nothing but still succeeds
        runner(&[
            "--engine",
            "duckdb",
            "export",
            "--output",
            out.to_str().unwrap(),
            "--no-progress",
        ])
        .run()
        .await
        .unwrap();

        assert!(out.is_dir());
    }
}
