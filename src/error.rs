//! Error types for sql2json
//!
//! This module defines the error hierarchy for the whole export pipeline.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for sql2json
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Source Errors
    // ============================================================================
    #[error("Cannot reach data source: {message}")]
    Connectivity { message: String },

    #[error("Metadata lookup failed for table '{table}': {message}")]
    Metadata { table: String, message: String },

    #[error("Row stream failed for table '{table}': {message}")]
    Stream { table: String, message: String },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Output sink error for '{path}': {message}")]
    Sink { path: String, message: String },

    // ============================================================================
    // Scheduler Errors
    // ============================================================================
    #[error("Export of table '{table}' failed: {source}")]
    TableExport {
        table: String,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a connectivity error
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
        }
    }

    /// Create a metadata error
    pub fn metadata(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Metadata {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a stream error
    pub fn stream(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sink {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap an error with the table whose export it aborted
    pub fn in_table(self, table: impl Into<String>) -> Self {
        Self::TableExport {
            table: table.into(),
            source: Box::new(self),
        }
    }

    /// The table this error is attributed to, if any
    pub fn table(&self) -> Option<&str> {
        match self {
            Error::TableExport { table, .. }
            | Error::Metadata { table, .. }
            | Error::Stream { table, .. } => Some(table),
            _ => None,
        }
    }

    /// Check if this error came from the output side
    pub fn is_sink(&self) -> bool {
        match self {
            Error::Sink { .. } => true,
            Error::TableExport { source, .. } => source.is_sink(),
            _ => false,
        }
    }
}

/// Result type alias for sql2json
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }
}
