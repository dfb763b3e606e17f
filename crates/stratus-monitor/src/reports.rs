//! Subsystem report snapshots and the sink they are published to.
//!
//! Producer daemons persist their status as small JSON files; the monitor
//! reads whichever of them are configured. A missing file is a disabled
//! feature, not an error — only an unreadable or malformed file is worth a
//! warning.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use stratus_config::Sources;
use thiserror::Error;
use tracing::warn;

use crate::message::MonitorMessage;

const REPORTS_TARGET: &str = "stratus::monitor::reports";

/// A status snapshot persisted as a JSON file.
pub trait ReportFile: Serialize + DeserializeOwned + Sized {
    /// Loads the report, treating a missing file as "not yet written".
    fn load(path: &Utf8Path) -> Result<Option<Self>, ReportError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ReportError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let report = serde_json::from_str(&contents).map_err(|source| ReportError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(report))
    }

    /// Persists the report for other processes to pick up.
    fn save(&self, path: &Utf8Path) -> Result<(), ReportError> {
        let mut contents =
            serde_json::to_string(self).map_err(|source| ReportError::Serialise { source })?;
        contents.push('\n');
        fs::write(path, contents).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Host software update status.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SoftwareReport {
    /// Timestamp of the last successful update check.
    pub last_update: Option<String>,
    /// Installed software version.
    pub version: Option<String>,
}

impl ReportFile for SoftwareReport {}

/// Power supply status.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PsuReport {
    /// Active power source.
    pub source: Option<String>,
    /// Battery charge percentage.
    pub batt_percent: Option<f64>,
    /// Whether the battery is charging.
    pub charging: Option<bool>,
}

impl ReportFile for PsuReport {}

/// Message-queue backlog status.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct QueueReport {
    /// Number of queued messages awaiting publication.
    pub length: u64,
    /// Broker connection state.
    pub client_status: ClientStatus,
    /// Whether the most recent publication succeeded.
    pub publish_success: bool,
}

impl ReportFile for QueueReport {}

/// Broker connection state reported by the queue client.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ClientStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// GPS receiver fix status.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GpsReport {
    /// Fix quality indicator.
    pub quality: Option<u32>,
    /// Number of satellites in view.
    pub satellites: Option<u32>,
    /// Latitude in decimal degrees.
    pub lat: Option<f64>,
    /// Longitude in decimal degrees.
    pub lng: Option<f64>,
}

impl ReportFile for GpsReport {}

/// Errors raised while reading or writing a report file.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Report file could not be read.
    #[error("failed to read report '{path}': {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// Report file was not valid JSON.
    #[error("failed to parse report '{path}': {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Report could not be serialised.
    #[error("failed to serialise report: {source}")]
    Serialise {
        #[source]
        source: serde_json::Error,
    },
    /// Report file could not be written.
    #[error("failed to write report '{path}': {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One refresh pass over every configured report source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSet {
    pub software: Option<SoftwareReport>,
    pub psu: Option<PsuReport>,
    pub queue: Option<QueueReport>,
    pub gps: Option<GpsReport>,
}

impl ReportSet {
    /// Loads every configured source. Individual failures are logged and
    /// leave that subsystem unreported; a broken report file must not take
    /// the monitor down.
    #[must_use]
    pub fn load(sources: &Sources) -> Self {
        Self {
            software: load_source(sources.software_report.as_deref()),
            psu: load_source(sources.psu_report.as_deref()),
            queue: load_source(sources.queue_report.as_deref()),
            gps: load_source(sources.gps_report.as_deref()),
        }
    }
}

fn load_source<T: ReportFile>(path: Option<&Utf8Path>) -> Option<T> {
    let path = path?;
    match T::load(path) {
        Ok(report) => report,
        Err(error) => {
            warn!(target: REPORTS_TARGET, error = %error, "report refresh failed");
            None
        }
    }
}

/// The composed display state handed to the sink: aggregated subsystem
/// status plus the latest inbound message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySnapshot {
    pub reports: ReportSet,
    pub message: Option<MonitorMessage>,
}

/// Receives composed snapshots whenever a message arrives or the refresh
/// timer fires. Rendering is the implementation's business.
pub trait ReportSink: Send + Sync {
    fn publish(&self, snapshot: &DisplaySnapshot);
}

/// Default sink that records snapshots through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn publish(&self, snapshot: &DisplaySnapshot) {
        tracing::info!(
            target: REPORTS_TARGET,
            message = ?snapshot.message.as_ref().map(MonitorMessage::summary),
            queue_length = snapshot.reports.queue.as_ref().map(|queue| queue.length),
            queue_status = ?snapshot
                .reports
                .queue
                .as_ref()
                .map(|queue| queue.client_status.to_string()),
            batt_percent = snapshot.reports.psu.as_ref().and_then(|psu| psu.batt_percent),
            gps_satellites = snapshot
                .reports
                .gps
                .as_ref()
                .and_then(|gps| gps.satellites),
            "display snapshot"
        );
    }
}
