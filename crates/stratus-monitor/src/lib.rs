//! Display monitor: report aggregation and the message-consumption loop.
//!
//! The [`Monitor`] owns the display state a renderer draws from: the latest
//! subsystem report snapshots plus the most recent inbound message. The
//! [`drive`] module runs the consumption loop that pulls documents off a
//! [`stratus_comms::SocketReader`] and feeds them in.

pub mod drive;
pub mod message;
pub mod monitor;
pub mod reports;

pub use drive::{CancellationToken, DecodePolicy};
pub use message::{MonitorMessage, SampleMessage};
pub use monitor::{Monitor, MonitorState};
pub use reports::{
    ClientStatus, DisplaySnapshot, GpsReport, PsuReport, QueueReport, ReportError, ReportFile,
    ReportSet, ReportSink, SoftwareReport, TracingReportSink,
};
