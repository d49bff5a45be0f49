//! Output sink module
//!
//! Writable destinations for exported documents.
//!
//! # Overview
//!
//! - `OutputSink` - an open destination with write, flush and close
//! - `SinkFactory` - opens a sink for a path
//! - `FileSinkFactory` - buffered local files
//! - `SinkWriter` - background task that owns a sink and acknowledges records

mod file;
mod writer;

pub use file::{FileSink, FileSinkFactory};
pub use writer::{Chunk, SinkWriter, FLUSH_BATCH};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// An open output destination.
///
/// A completed `write` means the bytes were accepted by the sink, possibly
/// into a buffer. A completed `flush` means everything written so far has
/// reached the destination; a completed `close` also releases it.
#[async_trait]
pub trait OutputSink: Send {
    /// Append bytes
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Push buffered bytes out to the destination
    async fn flush(&mut self) -> Result<()>;

    /// Flush and release the destination
    async fn close(&mut self) -> Result<()>;
}

/// Opens output sinks
#[async_trait]
pub trait SinkFactory: Send + Sync {
    /// Create (or truncate) the destination at `path`
    async fn open(&self, path: &Path) -> Result<Box<dyn OutputSink>>;
}

#[cfg(test)]
mod tests;
