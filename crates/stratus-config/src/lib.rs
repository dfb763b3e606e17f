//! Shared configuration for the stratus messaging utilities.
//!
//! The display and inference binaries both load a [`Config`] at process
//! start. Every collaborator a monitor may consult is modelled as an
//! explicit optional source: an absent entry means the feature is disabled,
//! never that loading failed.

mod logging;
mod socket;
mod sources;

pub use logging::{LogFormat, default_log_filter};
pub use socket::{SocketEndpoint, SocketParseError};
pub use sources::{Config, ConfigError, Sources};
