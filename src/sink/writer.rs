//! Background sink writer
//!
//! Owns an [`OutputSink`] for the lifetime of one document. Fragments arrive
//! over a bounded channel and are written in batches: whatever is already
//! queued, up to [`FLUSH_BATCH`] records, then one flush. The record counter
//! advances only after that flush, so it can trail the producer but never lead
//! it, and never counts bytes still sitting in a buffer.

use super::OutputSink;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Most records written between two flushes
pub const FLUSH_BATCH: u64 = 64;

/// A fragment of an output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Opening or closing token
    Framing(&'static str),
    /// One rendered record, separator included
    Record(String),
}

impl Chunk {
    /// Raw bytes of the fragment
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Chunk::Framing(s) => s.as_bytes(),
            Chunk::Record(s) => s.as_bytes(),
        }
    }

    /// Check if this fragment carries a record
    pub fn is_record(&self) -> bool {
        matches!(self, Chunk::Record(_))
    }
}

/// Handle to a running sink writer task
pub struct SinkWriter {
    handle: JoinHandle<Result<u64>>,
    path: String,
}

impl SinkWriter {
    /// Start a writer task for `sink`.
    ///
    /// At most `capacity` fragments are buffered between producer and sink.
    /// `acknowledged` is updated with the number of records the sink has
    /// accepted. Dropping the returned sender ends the document: the writer
    /// drains what is queued, closes the sink and resolves.
    pub fn spawn(
        sink: Box<dyn OutputSink>,
        capacity: usize,
        acknowledged: Arc<AtomicU64>,
        path: impl Into<String>,
    ) -> (mpsc::Sender<Chunk>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(drain(sink, rx, acknowledged));
        (
            tx,
            Self {
                handle,
                path: path.into(),
            },
        )
    }

    /// Wait until the sink is flushed and closed; returns records written.
    ///
    /// Every sender for this writer must be dropped first or this never
    /// resolves.
    pub async fn finish(self) -> Result<u64> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::sink(self.path, format!("Writer task failed: {e}"))),
        }
    }
}

async fn drain(
    mut sink: Box<dyn OutputSink>,
    mut rx: mpsc::Receiver<Chunk>,
    acknowledged: Arc<AtomicU64>,
) -> Result<u64> {
    let mut records = 0u64;

    while let Some(first) = rx.recv().await {
        match write_batch(sink.as_mut(), &mut rx, first).await {
            Ok(flushed) => {
                if flushed > 0 {
                    records += flushed;
                    acknowledged.store(records, Ordering::Release);
                }
            }
            Err(e) => {
                // Stop accepting fragments; the producer sees a closed channel
                rx.close();
                if let Err(close_err) = sink.close().await {
                    tracing::debug!("Closing sink after write failure also failed: {close_err}");
                }
                return Err(e);
            }
        }
    }

    sink.close().await?;
    Ok(records)
}

/// Write `first` plus whatever is already queued, then flush.
///
/// Returns the number of records the flush covered.
async fn write_batch(
    sink: &mut dyn OutputSink,
    rx: &mut mpsc::Receiver<Chunk>,
    first: Chunk,
) -> Result<u64> {
    let mut pending = 0u64;
    let mut next = Some(first);

    while let Some(chunk) = next {
        sink.write(chunk.as_bytes()).await?;
        if chunk.is_record() {
            pending += 1;
        }
        next = if pending < FLUSH_BATCH {
            rx.try_recv().ok()
        } else {
            None
        };
    }

    if pending > 0 {
        sink.flush().await?;
    }
    Ok(pending)
}
