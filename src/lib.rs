use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

/// Quay Monitor: a container metrics shipper.
///
/// Polls a Docker-compatible runtime over its unix socket at a fixed
/// interval, converts each container's cumulative resource counters into
/// per-interval metric events (CPU utilization, memory usage, network
/// throughput), and publishes the events in batches.
pub mod collector;
pub mod config;
pub mod container;
pub mod metrics;
pub mod publish;
pub mod runtime;
pub mod snapshot;

use collector::Collector;
use container::{ContainerID, ContainerInfo};
use metrics::{Engine, MetricEvent};
use publish::EventSink;
use runtime::ContainerRuntime;

/// Runs the monitor until `shutdown` is cancelled.
///
/// Wires the runtime client, collector, metrics engine, and publisher
/// together, then drives the fixed-interval poll loop. Per-poll failures
/// (unreachable runtime, individual fetch errors) are logged and recovered;
/// cancellation is the only way out.
///
/// # Errors
///
/// Returns an error only for startup-style failures such as a system clock
/// before the UNIX epoch.
pub async fn run(shutdown: CancellationToken) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env();
    log::debug!(
        "Polling `{}` every {:?}",
        config.socket.display(),
        config.period
    );

    let runtime = Arc::new(runtime::DockerRuntime::new(&config.socket));
    let engine = Arc::new(Engine::new());
    // A stalled fetch gets at most one interval; the next tick must never
    // find the previous poll still waiting on a single container.
    let collector = Collector::new(Arc::clone(&runtime), config.period);

    let (batch_tx, mut batch_rx) = tokio::sync::mpsc::channel::<Vec<MetricEvent>>(10);
    tokio::spawn(async move {
        let sink = publish::NdjsonSink::new(tokio::io::stdout());
        while let Some(batch) = batch_rx.recv().await {
            if let Err(err) = sink.publish(&batch).await {
                log::error!("failed to publish event batch: {err}");
            }
        }
    });

    let mut interval = tokio::time::interval(config.period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let containers = match runtime.list_containers().await {
            Ok(containers) => containers,
            Err(err) => {
                log::error!("cannot list containers: {err}");
                continue;
            }
        };
        log::trace!("Polling {} containers@{timestamp}", containers.len());

        let batch = poll_cycle(&collector, &engine, containers, timestamp).await;
        if !batch.is_empty() {
            batch_tx
                .send(batch)
                .await
                .expect("publisher task to still exist");
        }
    }

    Ok(())
}

/// One poll cycle: fan out the fetches, feed completed snapshots through the
/// engine in completion order, then evict baselines of departed containers.
///
/// A container whose fetch fails contributes no events and keeps its stored
/// baseline; fetches still pending when the cycle's fetch set is dropped are
/// abandoned and their late results discarded.
async fn poll_cycle<R>(
    collector: &Collector<R>,
    engine: &Engine,
    containers: Vec<ContainerInfo>,
    timestamp: u64,
) -> Vec<MetricEvent>
where
    R: runtime::SnapshotReader + 'static,
{
    let current: HashSet<ContainerID> = containers.iter().map(|c| c.id().clone()).collect();

    let mut fetches = collector.collect(containers);
    let mut batch = Vec::new();
    while let Some(joined) = fetches.join_next().await {
        let (container, result) = joined.expect("fetch task panicked");
        match result {
            Ok(snapshot) => batch.extend(engine.process(&container, snapshot, timestamp)),
            Err(err) => {
                log::error!(
                    target: "collector",
                    "skipping container for this poll: container_id={}, error={err}",
                    container.id(),
                );
            }
        }
    }
    engine.reconcile(&current);

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::EventPayload;
    use snapshot::{CpuCounters, MemoryCounters, RawSnapshot};

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Scripted snapshot reader: pops the next snapshot for each sampled
    /// container; an exhausted script means a failed fetch.
    struct ScriptedReader {
        scripts: Mutex<HashMap<String, Vec<RawSnapshot>>>,
    }

    impl ScriptedReader {
        fn new(scripts: HashMap<String, Vec<RawSnapshot>>) -> Self {
            Self {
                scripts: Mutex::new(scripts),
            }
        }
    }

    impl runtime::SnapshotReader for ScriptedReader {
        async fn sample(&self, id: &ContainerID) -> runtime::Result<RawSnapshot> {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(id.as_str()).and_then(|s| {
                if s.is_empty() {
                    None
                } else {
                    Some(s.remove(0))
                }
            }) {
                Some(snapshot) => Ok(snapshot),
                None => Err(runtime::Error::StreamClosed { id: id.clone() }),
            }
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

    fn cpu_snapshot(usage_ns: u64, system_ns: u64, at: Instant) -> RawSnapshot {
        RawSnapshot {
            read_at: at,
            cpu: CpuCounters {
                usage_ns,
                system_ns,
                online_cpus: 1,
            },
            memory: MemoryCounters {
                used_bytes: 2048,
                limit_bytes: None,
            },
            networks: HashMap::new(),
        }
    }

    fn cpu_percent(batch: &[MetricEvent], id: &str) -> f64 {
        batch
            .iter()
            .find_map(|event| match &event.payload {
                EventPayload::Cpu(fields) if event.container_id.as_str() == id => {
                    Some(fields.percent)
                }
                _ => None,
            })
            .expect("cpu event present")
    }

    #[tokio::test]
    async fn test_two_polls_produce_deltas_and_reconcile() {
        let start = Instant::now();
        let reader = Arc::new(ScriptedReader::new(HashMap::from([
            (
                "aaa".to_owned(),
                vec![
                    cpu_snapshot(1000, 50_000, start),
                    cpu_snapshot(1500, 50_500, start + Duration::from_secs(1)),
                ],
            ),
            ("bbb".to_owned(), vec![cpu_snapshot(0, 0, start)]),
        ])));
        let engine = Engine::new();
        let collector = Collector::new(Arc::clone(&reader), Duration::from_secs(1));

        let first = poll_cycle(&collector, &engine, vec![info("aaa"), info("bbb")], 1).await;
        // Three events per container (no network interfaces in the script).
        assert_eq!(first.len(), 6);
        assert_eq!(cpu_percent(&first, "aaa"), 0.0);
        assert_eq!(engine.tracked(), 2);

        // Poll 2: `bbb` is gone from the list; `aaa` deltas off poll 1.
        let second = poll_cycle(&collector, &engine, vec![info("aaa")], 2).await;
        assert_eq!(second.len(), 3);
        assert_eq!(cpu_percent(&second, "aaa"), 100.0);
        assert_eq!(engine.tracked(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_emits_nothing_and_keeps_baseline() {
        let start = Instant::now();
        let reader = Arc::new(ScriptedReader::new(HashMap::from([(
            "aaa".to_owned(),
            vec![
                cpu_snapshot(1000, 50_000, start),
                // Poll 2 missing: the reader fails that fetch.
            ],
        )])));
        let engine = Engine::new();
        let collector = Collector::new(Arc::clone(&reader), Duration::from_secs(1));

        let first = poll_cycle(&collector, &engine, vec![info("aaa")], 1).await;
        assert_eq!(first.len(), 3);

        let second = poll_cycle(&collector, &engine, vec![info("aaa")], 2).await;
        assert!(second.is_empty());
        // The container is still listed, so its baseline survives the
        // failed poll.
        assert_eq!(engine.tracked(), 1);
    }
}
