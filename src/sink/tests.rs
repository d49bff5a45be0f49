//! Tests for sink module

use super::*;
use crate::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Sink that fails on the n-th write and remembers whether it was closed
struct FailingSink {
    fail_on: usize,
    writes: usize,
    closed: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl OutputSink for FailingSink {
    async fn write(&mut self, _data: &[u8]) -> crate::Result<()> {
        self.writes += 1;
        if self.writes == self.fail_on {
            return Err(Error::sink("failing", "device full"));
        }
        Ok(())
    }

    async fn flush(&mut self) -> crate::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> crate::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// FileSink Tests
// ============================================================================

#[tokio::test]
async fn test_file_sink_write_and_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.json");

    let mut sink = FileSink::create(&path).await.unwrap();
    sink.write(b"[").await.unwrap();
    sink.write(b"]").await.unwrap();
    assert_eq!(sink.bytes_written(), 2);
    sink.close().await.unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
}

#[tokio::test]
async fn test_file_sink_close_is_idempotent() {
    let dir = tempdir().unwrap();
    let mut sink = FileSink::create(dir.path().join("a.json")).await.unwrap();
    sink.close().await.unwrap();
    sink.close().await.unwrap();
    assert!(sink.write(b"x").await.is_err());
}

#[tokio::test]
async fn test_file_sink_factory_missing_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("t.json");

    let result = FileSinkFactory::new().open(&path).await;
    let err = result.err().expect("open should fail");
    assert!(err.is_sink());
    assert!(err.to_string().contains("Failed to create file"));
}

// ============================================================================
// SinkWriter Tests
// ============================================================================

#[tokio::test]
async fn test_writer_counts_only_records() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.json");
    let sink = FileSinkFactory::new().open(&path).await.unwrap();
    let acked = Arc::new(AtomicU64::new(0));

    let (tx, writer) = SinkWriter::spawn(sink, 4, Arc::clone(&acked), "t.json");
    tx.send(Chunk::Framing("[")).await.unwrap();
    tx.send(Chunk::Record("{\n}".to_string())).await.unwrap();
    tx.send(Chunk::Record("},{\n}".to_string())).await.unwrap();
    tx.send(Chunk::Framing("]")).await.unwrap();
    drop(tx);

    let records = writer.finish().await.unwrap();
    assert_eq!(records, 2);
    assert_eq!(acked.load(Ordering::Acquire), 2);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\n},{\n}]");
}

#[tokio::test]
async fn test_writer_failure_closes_sink_and_channel() {
    let closed = Arc::new(AtomicBool::new(false));
    let sink = Box::new(FailingSink {
        fail_on: 2,
        writes: 0,
        closed: Arc::clone(&closed),
    });
    let acked = Arc::new(AtomicU64::new(0));

    let (tx, writer) = SinkWriter::spawn(sink, 1, Arc::clone(&acked), "failing");
    tx.send(Chunk::Record("a".to_string())).await.unwrap();
    tx.send(Chunk::Record("b".to_string())).await.unwrap();

    // Once the writer gives up, further sends are rejected
    let mut rejected = false;
    for _ in 0..10 {
        if tx.send(Chunk::Record("c".to_string())).await.is_err() {
            rejected = true;
            break;
        }
    }
    assert!(rejected);
    drop(tx);

    let err = writer.finish().await.unwrap_err();
    assert!(err.to_string().contains("device full"));
    assert!(closed.load(Ordering::SeqCst));
    // "a" may share a batch with the failing "b", in which case nothing is acknowledged
    assert!(acked.load(Ordering::Acquire) <= 1);
}

#[tokio::test]
async fn test_writer_acknowledges_only_flushed_bytes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.json");
    let sink = FileSinkFactory::new().open(&path).await.unwrap();
    let acked = Arc::new(AtomicU64::new(0));

    let (tx, writer) = SinkWriter::spawn(sink, 4, Arc::clone(&acked), "t.json");
    tx.send(Chunk::Framing("[")).await.unwrap();
    tx.send(Chunk::Record("{\"a\": 1}".to_string())).await.unwrap();

    for _ in 0..200 {
        if acked.load(Ordering::Acquire) > 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(acked.load(Ordering::Acquire), 1);

    // The sink is still open, so only a flush can have put these bytes on disk
    let on_disk = std::fs::metadata(&path).unwrap().len();
    assert!(on_disk >= "[{\"a\": 1}".len() as u64);

    tx.send(Chunk::Framing("]")).await.unwrap();
    drop(tx);
    assert_eq!(writer.finish().await.unwrap(), 1);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"a\": 1}]");
}

#[tokio::test]
async fn test_writer_flushes_in_bounded_batches() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("many.json");
    let sink = FileSinkFactory::new().open(&path).await.unwrap();
    let acked = Arc::new(AtomicU64::new(0));
    let total = FLUSH_BATCH * 3 + 5;

    let (tx, writer) = SinkWriter::spawn(sink, 512, Arc::clone(&acked), "many.json");
    for i in 0..total {
        tx.send(Chunk::Record(format!("{i},"))).await.unwrap();
    }
    drop(tx);

    assert_eq!(writer.finish().await.unwrap(), total);
    assert_eq!(acked.load(Ordering::Acquire), total);
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches(',').count() as u64, total);
}

#[test]
fn test_chunk_bytes() {
    assert_eq!(Chunk::Framing("[").as_bytes(), b"[");
    assert!(Chunk::Record("x".to_string()).is_record());
    assert!(!Chunk::Framing("]").is_record());
}
