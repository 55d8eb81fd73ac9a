//! Wire format of the runtime's HTTP API, reduced to the fields this system
//! consumes. Unknown fields are ignored; absent fields default so a sparse
//! response (e.g. a freshly started container without network stats yet)
//! still decodes.

use std::collections::HashMap;
use std::time::Instant;

use crate::container::{self, ContainerID, ContainerInfo};
use crate::snapshot::{CpuCounters, InterfaceCounters, MemoryCounters, RawSnapshot};

/// One entry of the `/containers/json` response.
#[derive(Debug, serde::Deserialize)]
pub(super) struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Command", default)]
    pub command: String,
    #[serde(rename = "Created", default)]
    pub created: i64,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Labels", default)]
    pub labels: HashMap<String, String>,
}

impl TryFrom<ContainerSummary> for ContainerInfo {
    type Error = container::Error;

    fn try_from(summary: ContainerSummary) -> container::Result<Self> {
        let id = ContainerID::new(&summary.id)?;
        Ok(ContainerInfo::new(
            id,
            summary.names,
            summary.image,
            summary.command,
            summary.created,
            summary.state,
            summary.labels,
        ))
    }
}

/// One sample from the `/containers/{id}/stats` stream.
#[derive(Debug, Default, serde::Deserialize)]
pub(super) struct StatsSample {
    #[serde(default)]
    pub cpu_stats: CpuStats,
    #[serde(default)]
    pub memory_stats: MemoryStats,
    #[serde(default)]
    pub networks: HashMap<String, InterfaceCounters>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(super) struct CpuStats {
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    #[serde(default)]
    pub system_cpu_usage: u64,
    #[serde(default)]
    pub online_cpus: u32,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(super) struct CpuUsage {
    #[serde(default)]
    pub total_usage: u64,
    #[serde(default)]
    pub percpu_usage: Option<Vec<u64>>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(super) struct MemoryStats {
    #[serde(default)]
    pub usage: u64,
    #[serde(default)]
    pub limit: u64,
}

impl StatsSample {
    /// Collapses the wire sample into the internal snapshot value, stamped
    /// with the instant the sample was received.
    pub(super) fn into_snapshot(self, read_at: Instant) -> RawSnapshot {
        // Older runtimes omit `online_cpus`; the per-core usage list is the
        // documented fallback.
        let online_cpus = if self.cpu_stats.online_cpus > 0 {
            self.cpu_stats.online_cpus
        } else {
            self.cpu_stats
                .cpu_usage
                .percpu_usage
                .as_ref()
                .map(|per_cpu| per_cpu.len() as u32)
                .filter(|&cores| cores > 0)
                .unwrap_or(1)
        };

        RawSnapshot {
            read_at,
            cpu: CpuCounters {
                usage_ns: self.cpu_stats.cpu_usage.total_usage,
                system_ns: self.cpu_stats.system_cpu_usage,
                online_cpus,
            },
            memory: MemoryCounters {
                used_bytes: self.memory_stats.usage,
                limit_bytes: (self.memory_stats.limit > 0).then_some(self.memory_stats.limit),
            },
            networks: self.networks,
        }
    }
}
