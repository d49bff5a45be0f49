//! Local file sink

use super::{OutputSink, SinkFactory};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Buffered writer over a local file
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    bytes_written: u64,
}

impl FileSink {
    /// Create or truncate the file at `path`
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await.map_err(|e| {
            Error::sink(
                path.display().to_string(),
                format!("Failed to create file: {e}"),
            )
        })?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            bytes_written: 0,
        })
    }

    /// Bytes accepted so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn error(&self, message: String) -> Error {
        Error::sink(self.path.display().to_string(), message)
    }
}

#[async_trait]
impl OutputSink for FileSink {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.error("write after close".to_string()));
        };
        if let Err(e) = writer.write_all(data).await {
            return Err(self.error(format!("Failed to write: {e}")));
        }
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.error("flush after close".to_string()));
        };
        if let Err(e) = writer.flush().await {
            return Err(self.error(format!("Failed to flush: {e}")));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        if let Err(e) = writer.flush().await {
            return Err(self.error(format!("Failed to flush: {e}")));
        }
        if let Err(e) = writer.get_ref().sync_all().await {
            return Err(self.error(format!("Failed to sync: {e}")));
        }
        if let Err(e) = writer.shutdown().await {
            return Err(self.error(format!("Failed to close: {e}")));
        }

        tracing::debug!(
            "Closed {} after {} bytes",
            self.path.display(),
            self.bytes_written
        );
        Ok(())
    }
}

/// Opens [`FileSink`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSinkFactory;

impl FileSinkFactory {
    /// Create a new factory
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SinkFactory for FileSinkFactory {
    async fn open(&self, path: &Path) -> Result<Box<dyn OutputSink>> {
        Ok(Box::new(FileSink::create(path).await?))
    }
}
