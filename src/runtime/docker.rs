use std::path::Path;
use std::time::Instant;

use http_body_util::{BodyExt, Empty};
use hyper::body::{Bytes, Incoming};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::container::{ContainerID, ContainerInfo};
use crate::snapshot::RawSnapshot;

use super::uds::UnixConnector;
use super::{ContainerRuntime, Error, Result, SnapshotReader, model};

/// Client for a Docker-compatible runtime API served over a unix socket.
///
/// Each request runs over its own short-lived connection; the stats stream in
/// particular must not be pooled, since dropping its body is what tells the
/// runtime to stop producing samples.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    client: Client<UnixConnector, Empty<Bytes>>,
}

impl DockerRuntime {
    pub fn new(socket: impl AsRef<Path>) -> Self {
        let client =
            Client::builder(TokioExecutor::new()).build(UnixConnector::new(socket.as_ref()));
        Self { client }
    }

    async fn get(&self, path: &str) -> Result<hyper::Response<Incoming>> {
        let uri = format!("http://runtime{path}")
            .parse::<hyper::Uri>()
            .map_err(|source| Error::RequestPath {
                path: path.to_owned(),
                source,
            })?;
        let request = hyper::Request::builder()
            .method(hyper::Method::GET)
            .uri(uri)
            .body(Empty::new())
            .expect("GET request from a parsed URI is always valid");

        let response = self
            .client
            .request(request)
            .await
            .map_err(|source| Error::Request {
                path: path.to_owned(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(Error::Status {
                path: path.to_owned(),
                status: response.status(),
            });
        }

        Ok(response)
    }
}

impl ContainerRuntime for DockerRuntime {
    /// Lists running containers via `/containers/json`.
    ///
    /// Entries with an invalid identifier are skipped with a warning; one
    /// malformed entry must not hide the rest of the list.
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>> {
        const PATH: &str = "/containers/json";

        let response = self.get(PATH).await?;
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|source| Error::Body {
                path: PATH.to_owned(),
                source,
            })?
            .to_bytes();
        let summaries: Vec<model::ContainerSummary> =
            serde_json::from_slice(&body).map_err(|source| Error::Decode {
                path: PATH.to_owned(),
                source,
            })?;

        let mut containers = Vec::with_capacity(summaries.len());
        for summary in summaries {
            match ContainerInfo::try_from(summary) {
                Ok(info) => containers.push(info),
                Err(err) => log::warn!("skipping listed container: {err}"),
            }
        }

        Ok(containers)
    }
}

impl SnapshotReader for DockerRuntime {
    /// Reads exactly one sample from the container's stats stream.
    ///
    /// The endpoint streams newline-delimited JSON samples indefinitely;
    /// body frames are buffered until the first full line, and returning
    /// drops the body, which closes the connection and ends the stream.
    async fn sample(&self, id: &ContainerID) -> Result<RawSnapshot> {
        let path = format!("/containers/{id}/stats");

        let response = self.get(&path).await?;
        let mut body = response.into_body();
        let mut buf: Vec<u8> = Vec::with_capacity(8 * 1024);
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|source| Error::Body {
                path: path.clone(),
                source,
            })?;
            let Some(data) = frame.data_ref() else {
                continue;
            };
            buf.extend_from_slice(data);

            if let Some(end) = buf.iter().position(|&b| b == b'\n') {
                let sample: model::StatsSample =
                    serde_json::from_slice(&buf[..end]).map_err(|source| Error::Decode {
                        path: path.clone(),
                        source,
                    })?;
                return Ok(sample.into_snapshot(Instant::now()));
            }
        }

        Err(Error::StreamClosed { id: id.clone() })
    }
}
