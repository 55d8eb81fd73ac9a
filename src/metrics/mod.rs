//! Normalization of raw counter snapshots into per-interval metric events.
//!
//! The runtime reports cumulative counters (CPU time, network traffic since
//! container start); consumers want per-interval values (utilization
//! percentage, bytes per second). The [`Engine`] bridges the two by keeping
//! the previous poll's snapshot per container as the delta baseline, and
//! reconciling that state against the live container list every poll.
//!
//! Baseline policy, applied uniformly:
//!
//! - no baseline (first observation, restart, reused id) → zero-valued rates;
//! - negative delta (counter reset) → zero for this poll, current snapshot
//!   becomes the baseline;
//! - departed container → baseline evicted at the poll's reconciliation.

mod engine;
mod event;

pub use engine::Engine;
pub use event::{
    ContainerFields, CpuFields, EventPayload, MemoryFields, MetricEvent, NetworkFields,
};
