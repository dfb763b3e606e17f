//! Process configuration and the optional sources it names.

use std::fs;
use std::io;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 10;

/// Optional collaborators a monitor process may consult.
///
/// Every field is explicitly optional: `None` disables the feature. The
/// binaries check the fields once at startup and thread them into the
/// monitor constructor, rather than probing for missing files downstream.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Sources {
    /// Socket the display reader listens on for inbound messages.
    pub display_socket: Option<SocketEndpoint>,
    /// Socket of the inference server answering request/response calls.
    pub inference_socket: Option<SocketEndpoint>,
    /// Snapshot of the host's software update status.
    pub software_report: Option<Utf8PathBuf>,
    /// Snapshot of the power supply status.
    pub psu_report: Option<Utf8PathBuf>,
    /// Snapshot of the message-queue backlog.
    pub queue_report: Option<Utf8PathBuf>,
    /// Snapshot of the GPS receiver fix.
    pub gps_report: Option<Utf8PathBuf>,
}

/// Configuration loaded at process start.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Optional named sources consulted by the monitor.
    pub sources: Sources,
    /// Tracing filter expression.
    pub log_filter: String,
    /// Tracing output format.
    pub log_format: LogFormat,
    /// Seconds between report refresh passes.
    pub refresh_interval_secs: u64,
    /// Bound on request/response waits, in seconds. `None` waits forever.
    pub response_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Sources::default(),
            log_filter: crate::logging::default_log_filter().to_string(),
            log_format: LogFormat::default(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            response_timeout_secs: None,
        }
    }
}

impl Config {
    /// Loads configuration from the given JSON file.
    ///
    /// Passing `None` yields the defaults, so binaries run unconfigured; a
    /// path that cannot be read or parsed is an error rather than a silent
    /// fallback.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Interval between report refresh passes.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Bound on request/response waits, when configured.
    #[must_use]
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_secs.map(Duration::from_secs)
    }
}

/// Errors raised while loading a [`Config`] file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// Configuration file was not valid JSON.
    #[error("failed to parse configuration '{path}': {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> Utf8PathBuf {
        let path = dir.path().join("stratus.json");
        let mut file = fs::File::create(&path).expect("create config file");
        file.write_all(contents.as_bytes()).expect("write config");
        Utf8PathBuf::from_path_buf(path).expect("utf8 path")
    }

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let config = Config::load(None).expect("defaults");
        assert_eq!(config, Config::default());
        assert!(config.sources.display_socket.is_none());
        assert!(config.response_timeout().is_none());
    }

    #[test]
    fn loads_partial_configuration() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(
            &dir,
            r#"{
                "sources": {
                    "display_socket": {"transport": "unix", "path": "/run/pipes/display.uds"},
                    "queue_report": "/run/reports/queue.json"
                },
                "response_timeout_secs": 30
            }"#,
        );
        let config = Config::load(Some(&path)).expect("load config");
        assert_eq!(
            config.sources.display_socket,
            Some(SocketEndpoint::unix("/run/pipes/display.uds"))
        );
        assert_eq!(
            config.sources.queue_report.as_deref(),
            Some(Utf8Path::new("/run/reports/queue.json"))
        );
        assert!(config.sources.gps_report.is_none());
        assert_eq!(config.response_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
    }

    #[test]
    fn explicit_path_must_exist() {
        let error = Config::load(Some(Utf8Path::new("/nonexistent/stratus.json")))
            .expect_err("missing explicit config should fail");
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_configuration_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_config(&dir, "{not json");
        let error = Config::load(Some(&path)).expect_err("bad json should fail");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }
}
