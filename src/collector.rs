//! Concurrent per-container snapshot collection.
//!
//! One poll cycle needs exactly one [`RawSnapshot`] per running container.
//! Every read goes to the [`SnapshotReader`] as its own task with its own
//! timeout: a stalled container times out on its own while the remaining
//! containers' samples flow through unaffected. The collector holds no state
//! between polls.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::container::ContainerInfo;
use crate::runtime::{self, SnapshotReader};
use crate::snapshot::RawSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("snapshot read failed: {0}")]
    Read(#[from] runtime::Error),
    #[error("snapshot read timed out after {0:?}")]
    TimedOut(Duration),
}

/// Fans out bounded single-shot snapshot reads, one per container.
pub struct Collector<R> {
    reader: Arc<R>,
    fetch_timeout: Duration,
}

impl<R> Collector<R>
where
    R: SnapshotReader + 'static,
{
    pub fn new(reader: Arc<R>, fetch_timeout: Duration) -> Self {
        Self {
            reader,
            fetch_timeout,
        }
    }

    /// Spawns one fetch task per container and returns the running set.
    ///
    /// Callers consume completions in finish order via
    /// [`JoinSet::join_next`]. A fetch that errors or exceeds the timeout
    /// yields a [`FetchError`] for its container; it is never retried within
    /// the poll. Dropping the set aborts fetches that have not completed, so
    /// a poll cycle ends without leaving reads behind.
    pub fn collect(
        &self,
        containers: Vec<ContainerInfo>,
    ) -> JoinSet<(ContainerInfo, Result<RawSnapshot, FetchError>)> {
        let mut fetches = JoinSet::new();
        for info in containers {
            let reader = Arc::clone(&self.reader);
            let fetch_timeout = self.fetch_timeout;
            fetches.spawn(async move {
                let result =
                    match tokio::time::timeout(fetch_timeout, reader.sample(info.id())).await {
                        Ok(Ok(snapshot)) => Ok(snapshot),
                        Ok(Err(err)) => Err(FetchError::Read(err)),
                        Err(_) => Err(FetchError::TimedOut(fetch_timeout)),
                    };
                (info, result)
            });
        }

        fetches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerID;
    use crate::snapshot::{CpuCounters, MemoryCounters};

    use std::collections::HashMap;
    use std::time::Instant;

    struct FakeReader {
        /// Per-container artificial read latency.
        delays: HashMap<String, Duration>,
        /// Containers whose stream ends without a sample.
        broken: Vec<String>,
    }

    impl FakeReader {
        fn instant() -> Self {
            Self {
                delays: HashMap::new(),
                broken: Vec::new(),
            }
        }
    }

    impl SnapshotReader for FakeReader {
        async fn sample(&self, id: &ContainerID) -> runtime::Result<RawSnapshot> {
            if let Some(delay) = self.delays.get(id.as_str()) {
                tokio::time::sleep(*delay).await;
            }
            if self.broken.iter().any(|broken| broken == id.as_str()) {
                return Err(runtime::Error::StreamClosed { id: id.clone() });
            }
            Ok(RawSnapshot {
                read_at: Instant::now(),
                cpu: CpuCounters::default(),
                memory: MemoryCounters::default(),
                networks: HashMap::new(),
            })
        }
    }

    fn info(id: &str) -> ContainerInfo {
        ContainerInfo::new(
            ContainerID::new(id).unwrap(),
            vec![format!("/{id}")],
            "img".to_owned(),
            "cmd".to_owned(),
            0,
            "running".to_owned(),
            HashMap::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_fetches_complete() {
        let collector = Collector::new(Arc::new(FakeReader::instant()), Duration::from_secs(1));
        let mut fetches = collector.collect(vec![info("aaa"), info("bbb"), info("ccc")]);

        let mut seen = Vec::new();
        while let Some(joined) = fetches.join_next().await {
            let (container, result) = joined.unwrap();
            assert!(result.is_ok());
            seen.push(container.id().to_string());
        }
        seen.sort();
        assert_eq!(seen, ["aaa", "bbb", "ccc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_container_times_out_alone() {
        let reader = FakeReader {
            delays: HashMap::from([("stalled".to_owned(), Duration::from_secs(60))]),
            broken: Vec::new(),
        };
        let collector = Collector::new(Arc::new(reader), Duration::from_secs(1));
        let mut fetches = collector.collect(vec![info("stalled"), info("healthy")]);

        // The healthy container finishes first; the stalled one must not
        // hold it up.
        let (first, result) = fetches.join_next().await.unwrap().unwrap();
        assert_eq!(first.id().as_str(), "healthy");
        assert!(result.is_ok());

        let (second, result) = fetches.join_next().await.unwrap().unwrap();
        assert_eq!(second.id().as_str(), "stalled");
        assert!(matches!(result, Err(FetchError::TimedOut(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_is_isolated() {
        let reader = FakeReader {
            delays: HashMap::new(),
            broken: vec!["broken".to_owned()],
        };
        let collector = Collector::new(Arc::new(reader), Duration::from_secs(1));
        let mut fetches = collector.collect(vec![info("broken"), info("healthy")]);

        let mut ok = 0;
        let mut failed = 0;
        while let Some(joined) = fetches.join_next().await {
            let (container, result) = joined.unwrap();
            match result {
                Ok(_) => {
                    assert_eq!(container.id().as_str(), "healthy");
                    ok += 1;
                }
                Err(FetchError::Read(_)) => {
                    assert_eq!(container.id().as_str(), "broken");
                    failed += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((ok, failed), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_set_abandons_stragglers() {
        let reader = FakeReader {
            delays: HashMap::from([("stalled".to_owned(), Duration::from_secs(60))]),
            broken: Vec::new(),
        };
        let collector = Collector::new(Arc::new(reader), Duration::from_secs(120));
        let fetches = collector.collect(vec![info("stalled")]);
        drop(fetches);
        // Nothing to assert beyond not hanging: the spawned fetch is aborted
        // with the set.
    }
}
