use std::collections::HashSet;

use dashmap::DashMap;

use crate::container::{ContainerID, ContainerInfo};
use crate::snapshot::{InterfaceCounters, RawSnapshot};

use super::event::{
    ContainerFields, CpuFields, EventPayload, MemoryFields, MetricEvent, NetworkFields,
};

/// Converts raw counter snapshots into metric events and owns the cross-poll
/// baseline table.
///
/// The table holds the last successfully processed snapshot per container.
/// [`Engine::process`] calls for distinct containers may run concurrently;
/// each call touches its own key exactly once. [`Engine::reconcile`] runs
/// once per poll, after processing, and evicts entries for containers that
/// left the runtime's list, so a reused identifier always starts from a fresh
/// baseline.
#[derive(Debug, Default)]
pub struct Engine {
    previous: DashMap<ContainerID, RawSnapshot>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of containers with a stored baseline.
    pub fn tracked(&self) -> usize {
        self.previous.len()
    }

    /// Computes this poll's events for one container and stores `snapshot`
    /// as the container's new baseline.
    ///
    /// Emits one event per category, one network event per interface. With
    /// no baseline (first observation, post-restart, reused identifier) the
    /// CPU and network events carry zero-valued rates; container-info and
    /// memory events are baseline-free.
    pub fn process(
        &self,
        container: &ContainerInfo,
        snapshot: RawSnapshot,
        timestamp: u64,
    ) -> Vec<MetricEvent> {
        // Swap the baseline in one map operation: the returned entry is the
        // previous poll's snapshot, and concurrent calls for other keys never
        // observe a half-updated entry.
        let baseline = self
            .previous
            .insert(container.id().clone(), snapshot.clone());
        let baseline = baseline.as_ref();

        let mut events = Vec::with_capacity(3 + snapshot.networks.len());
        events.push(MetricEvent::new(
            timestamp,
            container,
            EventPayload::Container(ContainerFields::from_info(container)),
        ));
        events.push(MetricEvent::new(
            timestamp,
            container,
            EventPayload::Cpu(CpuFields {
                percent: cpu_percent(baseline, &snapshot),
                usage_ns: snapshot.cpu.usage_ns,
                system_ns: snapshot.cpu.system_ns,
                online_cpus: snapshot.cpu.online_cpus,
            }),
        ));
        events.push(MetricEvent::new(
            timestamp,
            container,
            EventPayload::Memory(MemoryFields {
                used_bytes: snapshot.memory.used_bytes,
                limit_bytes: snapshot.memory.limit_bytes,
                percent: snapshot.memory.percent(),
            }),
        ));

        // Deterministic batch order regardless of map iteration order.
        let mut interfaces: Vec<_> = snapshot.networks.iter().collect();
        interfaces.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (name, counters) in interfaces {
            let elapsed = baseline.map(|prev| snapshot.elapsed_since(prev));
            let prev_counters = baseline.and_then(|prev| prev.networks.get(name));
            events.push(MetricEvent::new(
                timestamp,
                container,
                EventPayload::Network(network_fields(
                    name,
                    counters,
                    prev_counters,
                    elapsed.unwrap_or(0.0),
                )),
            ));
        }

        events
    }

    /// Drops every baseline whose container is not in `current`.
    ///
    /// Runs once per poll after processing; containers that merely failed
    /// their fetch are still listed and keep their baseline, while departed
    /// containers are forgotten before their identifier can come back.
    pub fn reconcile(&self, current: &HashSet<ContainerID>) {
        self.previous.retain(|id, _| current.contains(id));
    }
}

/// CPU utilization over the interval between `baseline` and `current`.
///
/// Zero without a baseline, on a zero system-time delta, and on counter
/// resets (either delta negative): a restarted container's counters restart
/// from zero, and the only honest value for that poll is zero while the new
/// snapshot becomes the baseline.
fn cpu_percent(baseline: Option<&RawSnapshot>, current: &RawSnapshot) -> f64 {
    let Some(prev) = baseline else {
        return 0.0;
    };
    let usage_delta = current.cpu.usage_ns.checked_sub(prev.cpu.usage_ns);
    let system_delta = current.cpu.system_ns.checked_sub(prev.cpu.system_ns);
    match usage_delta.zip(system_delta) {
        None | Some((_, 0)) => 0.0,
        Some((usage, system)) => {
            usage as f64 / system as f64 * f64::from(current.cpu.online_cpus) * 100.0
        }
    }
}

/// Per-interface event fields: cumulative counters always, per-second rates
/// only against a baseline for the same interface.
///
/// An interface with no baseline entry (first observation of the container
/// or of the interface itself) reports zero rates. Negative deltas from
/// counter resets or interface re-enumeration clamp to zero.
fn network_fields(
    name: &str,
    counters: &InterfaceCounters,
    prev: Option<&InterfaceCounters>,
    elapsed_secs: f64,
) -> NetworkFields {
    let rate = |cur: u64, prev_value: u64| -> f64 {
        if elapsed_secs <= 0.0 {
            return 0.0;
        }
        cur.checked_sub(prev_value)
            .map(|delta| delta as f64 / elapsed_secs)
            .unwrap_or(0.0)
    };

    let (rx_bytes_per_sec, rx_packets_per_sec, tx_bytes_per_sec, tx_packets_per_sec) = match prev {
        Some(prev) => (
            rate(counters.rx_bytes, prev.rx_bytes),
            rate(counters.rx_packets, prev.rx_packets),
            rate(counters.tx_bytes, prev.tx_bytes),
            rate(counters.tx_packets, prev.tx_packets),
        ),
        None => (0.0, 0.0, 0.0, 0.0),
    };

    NetworkFields {
        interface: name.to_owned(),
        rx_bytes: counters.rx_bytes,
        rx_packets: counters.rx_packets,
        rx_errors: counters.rx_errors,
        rx_dropped: counters.rx_dropped,
        tx_bytes: counters.tx_bytes,
        tx_packets: counters.tx_packets,
        tx_errors: counters.tx_errors,
        tx_dropped: counters.tx_dropped,
        rx_bytes_per_sec,
        rx_packets_per_sec,
        tx_bytes_per_sec,
        tx_packets_per_sec,
    }
}
