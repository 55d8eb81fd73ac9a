//! Resolved configuration scalars.
//!
//! Configuration ownership sits with the deployment (environment variables);
//! the monitor only consumes the two resolved values it needs: how often to
//! poll and where the runtime socket lives.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PERIOD_SECS: u64 = 1;
const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

#[derive(Debug, Clone)]
pub struct Config {
    /// Poll interval; also bounds each per-container fetch.
    pub period: Duration,
    /// Path to the container runtime's control socket.
    pub socket: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(DEFAULT_PERIOD_SECS),
            socket: PathBuf::from(DEFAULT_SOCKET),
        }
    }
}

impl Config {
    /// Resolves the configuration from `QUAY_MONITOR_PERIOD_SECS` and
    /// `QUAY_MONITOR_SOCKET`, falling back to the defaults (1 second,
    /// `/var/run/docker.sock`). An unparsable period is logged and replaced
    /// by the default rather than failing startup.
    pub fn from_env() -> Self {
        let period = match std::env::var("QUAY_MONITOR_PERIOD_SECS") {
            Ok(raw) => parse_period_secs(&raw).unwrap_or_else(|| {
                log::warn!(
                    "invalid QUAY_MONITOR_PERIOD_SECS value `{raw}`, using {DEFAULT_PERIOD_SECS}s"
                );
                Duration::from_secs(DEFAULT_PERIOD_SECS)
            }),
            Err(_) => Duration::from_secs(DEFAULT_PERIOD_SECS),
        };
        let socket = std::env::var_os("QUAY_MONITOR_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET));

        Self { period, socket }
    }
}

fn parse_period_secs(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs)
}
