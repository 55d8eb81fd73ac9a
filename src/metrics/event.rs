use std::collections::HashMap;

use crate::container::{ContainerID, ContainerInfo};

/// A single structured metric record.
///
/// Every poll produces one event per category per container (and one network
/// event per interface); the poll's events for all containers are published
/// together as one batch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricEvent {
    /// Poll timestamp in UNIX epoch seconds.
    pub timestamp: u64,
    pub container_id: ContainerID,
    pub container_name: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl MetricEvent {
    pub fn new(timestamp: u64, container: &ContainerInfo, payload: EventPayload) -> Self {
        Self {
            timestamp,
            container_id: container.id().clone(),
            container_name: container.name().to_owned(),
            payload,
        }
    }
}

/// Category-tagged event payload. Serializes with a `category` tag and the
/// payload fields inlined next to the envelope fields.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum EventPayload {
    Container(ContainerFields),
    Cpu(CpuFields),
    Memory(MemoryFields),
    Network(NetworkFields),
}

/// Static container metadata; requires no baseline.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContainerFields {
    pub image: String,
    pub command: String,
    /// Container creation time in UNIX epoch seconds.
    pub created: i64,
    pub state: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl ContainerFields {
    pub fn from_info(info: &ContainerInfo) -> Self {
        Self {
            image: info.image().to_owned(),
            command: info.command().to_owned(),
            created: info.created(),
            state: info.state().to_owned(),
            labels: info.labels().clone(),
        }
    }
}

/// CPU utilization for one poll interval.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CpuFields {
    /// Utilization percentage over the interval, `0.0`–`100.0 × cores`.
    /// Zero when no baseline exists or a counter reset was detected.
    pub percent: f64,
    /// Cumulative container CPU time in nanoseconds.
    pub usage_ns: u64,
    /// Cumulative system CPU time in nanoseconds.
    pub system_ns: u64,
    pub online_cpus: u32,
}

/// Instantaneous memory usage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemoryFields {
    pub used_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_bytes: Option<u64>,
    /// Usage as a percentage of the limit; absent for unlimited containers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
}

/// Traffic counters and per-second rates for one interface over one poll
/// interval. Rates are zero when the interface has no baseline.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NetworkFields {
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errors: u64,
    pub rx_dropped: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub tx_dropped: u64,
    pub rx_bytes_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub tx_bytes_per_sec: f64,
    pub tx_packets_per_sec: f64,
}
