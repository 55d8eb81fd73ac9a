//! Access to the container runtime's control socket.
//!
//! The runtime exposes an HTTP API over a local unix socket. This module
//! provides the two seams the rest of the system consumes it through:
//!
//! - [`ContainerRuntime`] — enumerate the currently running containers with
//!   their static metadata.
//! - [`SnapshotReader`] — obtain one atomic counter snapshot for a single
//!   container. The runtime's native stats endpoint streams samples
//!   indefinitely; [`DockerRuntime`] reads exactly one sample and closes the
//!   stream, so callers never manage stream lifecycles.

mod docker;
mod model;
mod uds;

pub use docker::DockerRuntime;

use crate::container::{ContainerID, ContainerInfo};
use crate::snapshot::RawSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid request path `{path}`: {source}")]
    RequestPath {
        path: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },
    #[error("request to `{path}` failed: {source}")]
    Request {
        path: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
    #[error("request to `{path}` returned status {status}")]
    Status {
        path: String,
        status: hyper::StatusCode,
    },
    #[error("failed to read response body from `{path}`: {source}")]
    Body {
        path: String,
        #[source]
        source: hyper::Error,
    },
    #[error("failed to decode response from `{path}`: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stats stream for container `{id}` ended before the first sample")]
    StreamClosed { id: ContainerID },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Produces one raw counter snapshot per request for a given container.
///
/// A read may block while the runtime assembles a sample; callers bound it
/// (the collector wraps every read in a timeout).
pub trait SnapshotReader: Send + Sync {
    fn sample(&self, id: &ContainerID) -> impl Future<Output = Result<RawSnapshot>> + Send;
}

/// Enumerates the currently running containers.
pub trait ContainerRuntime: SnapshotReader {
    fn list_containers(&self) -> impl Future<Output = Result<Vec<ContainerInfo>>> + Send;
}
