//! Outbound event publication.
//!
//! The poll loop is fire-and-forget towards the sink: batches travel over a
//! channel to a dedicated consumer task, and publish failures are logged
//! there without feeding back into collection.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::metrics::MetricEvent;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write event batch: {0}")]
    Write(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Accepts one poll's batch of metric events for publication.
pub trait EventSink {
    fn publish(&self, batch: &[MetricEvent]) -> impl Future<Output = Result<()>> + Send;
}

/// Serializes each event as one JSON line and writes batches to the wrapped
/// writer.
#[derive(Debug)]
pub struct NdjsonSink<W> {
    writer: tokio::sync::Mutex<W>,
}

impl<W> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> EventSink for NdjsonSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&self, batch: &[MetricEvent]) -> Result<()> {
        // Serialize the whole batch up front so the writer sees either the
        // complete batch or, on a serialization error, nothing at all.
        let mut lines = Vec::with_capacity(batch.len() * 256);
        for event in batch {
            serde_json::to_writer(&mut lines, event)?;
            lines.push(b'\n');
        }

        let mut writer = self.writer.lock().await;
        writer.write_all(&lines).await?;
        writer.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerID, ContainerInfo};
    use crate::metrics::{EventPayload, MemoryFields};

    use std::collections::HashMap;

    fn event(timestamp: u64) -> MetricEvent {
        let info = ContainerInfo::new(
            ContainerID::new("4f1b2c3d4e5f").unwrap(),
            vec!["/web-1".to_owned()],
            "img".to_owned(),
            "cmd".to_owned(),
            0,
            "running".to_owned(),
            HashMap::new(),
        );
        MetricEvent::new(
            timestamp,
            &info,
            EventPayload::Memory(MemoryFields {
                used_bytes: 4096,
                limit_bytes: None,
                percent: None,
            }),
        )
    }

    #[tokio::test]
    async fn test_publish_writes_one_line_per_event() {
        let sink = NdjsonSink::new(Vec::<u8>::new());
        sink.publish(&[event(1), event(2)]).await.unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["category"], "memory");
        assert_eq!(first["timestamp"], 1);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["timestamp"], 2);
    }

    #[tokio::test]
    async fn test_publish_empty_batch_writes_nothing() {
        let sink = NdjsonSink::new(Vec::<u8>::new());
        sink.publish(&[]).await.unwrap();
        assert!(sink.into_inner().is_empty());
    }
}
