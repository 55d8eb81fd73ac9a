//! Raw per-container counter snapshots.
//!
//! A [`RawSnapshot`] is an atomic capture of one container's counters at one
//! instant: cumulative CPU time, instantaneous memory usage, and cumulative
//! per-interface network counters. The CPU and network values are counters
//! since container start; turning them into utilization and throughput
//! requires a delta against the previous poll's snapshot, which is the
//! metrics engine's job. Snapshots themselves carry no derived values.

use std::collections::HashMap;
use std::time::Instant;

/// Cumulative CPU counters from one stats sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuCounters {
    /// Total CPU time consumed by the container, in nanoseconds.
    pub usage_ns: u64,
    /// Total CPU time consumed by the whole host, in nanoseconds.
    pub system_ns: u64,
    /// Number of cores available to the container.
    pub online_cpus: u32,
}

/// Instantaneous memory usage from one stats sample. Not cumulative; no
/// baseline is needed to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryCounters {
    /// Bytes currently in use.
    pub used_bytes: u64,
    /// Memory limit in bytes. `None` when the container is unlimited (the
    /// runtime reports `0` for unlimited cgroups).
    pub limit_bytes: Option<u64>,
}

impl MemoryCounters {
    /// Usage as a percentage of the limit, when one is set.
    pub fn percent(&self) -> Option<f64> {
        match self.limit_bytes {
            Some(limit) if limit > 0 => Some(self.used_bytes as f64 / limit as f64 * 100.0),
            _ => None,
        }
    }
}

/// Cumulative traffic counters for a single network interface.
///
/// Field names match the runtime's stats wire format, so the runtime model
/// deserializes directly into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub struct InterfaceCounters {
    #[serde(default)]
    pub rx_bytes: u64,
    #[serde(default)]
    pub rx_packets: u64,
    #[serde(default)]
    pub rx_errors: u64,
    #[serde(default)]
    pub rx_dropped: u64,
    #[serde(default)]
    pub tx_bytes: u64,
    #[serde(default)]
    pub tx_packets: u64,
    #[serde(default)]
    pub tx_errors: u64,
    #[serde(default)]
    pub tx_dropped: u64,
}

/// An immutable capture of all raw counters for one container at one instant.
///
/// All fields come from a single stats sample; values from different samples
/// are never mixed, so deltas between two snapshots are internally
/// consistent.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    /// Monotonic instant the sample was received, used for elapsed-time
    /// computation between consecutive snapshots.
    pub read_at: Instant,
    pub cpu: CpuCounters,
    pub memory: MemoryCounters,
    /// Interface name to cumulative counters.
    pub networks: HashMap<String, InterfaceCounters>,
}

impl RawSnapshot {
    /// Seconds elapsed since an earlier snapshot of the same container.
    /// Returns zero if `earlier` is not actually earlier.
    pub fn elapsed_since(&self, earlier: &RawSnapshot) -> f64 {
        self.read_at
            .saturating_duration_since(earlier.read_at)
            .as_secs_f64()
    }
}
