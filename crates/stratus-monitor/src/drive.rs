//! The message-consumption loop that feeds a monitor.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use strum::{Display, EnumString};
use stratus_comms::{CommsError, SocketReader};
use tracing::{info, warn};

use crate::monitor::Monitor;

const DRIVE_TARGET: &str = "stratus::monitor::drive";

/// Cooperative cancellation shared between the consumption loop and
/// whatever owns the shutdown decision (typically a signal watcher).
///
/// Tripping the token does not interrupt a blocked read by itself; pair it
/// with [`stratus_comms::ShutdownHandle`] to close the socket and unblock
/// the loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// What to do with a frame that fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DecodePolicy {
    /// Log the frame and keep consuming. The display stays alive across
    /// producer bugs.
    #[default]
    Skip,
    /// Treat the first malformed frame as fatal and stop the loop.
    Abort,
}

impl DecodePolicy {
    /// Parses a policy name, for CLI wiring.
    pub fn parse(input: &str) -> Result<Self, strum::ParseError> {
        Self::from_str(input)
    }
}

/// Consumes the reader's message sequence and forwards every document to
/// the monitor.
///
/// Returns `Ok(())` when cancelled; otherwise runs until the connection
/// fails (`ConnectionError`) or, under [`DecodePolicy::Abort`], until a
/// frame fails to decode. Reconnect policy belongs to the caller — this
/// loop never reopens the socket itself.
pub fn run(
    reader: &mut SocketReader,
    monitor: &Monitor,
    policy: DecodePolicy,
    cancel: &CancellationToken,
) -> Result<(), CommsError> {
    let messages = reader.messages()?;
    for item in messages {
        if cancel.is_cancelled() {
            info!(target: DRIVE_TARGET, "consumption loop cancelled");
            return Ok(());
        }
        match item {
            Ok(document) => monitor.set_message(document),
            Err(CommsError::Decode(error)) => {
                warn!(target: DRIVE_TARGET, error = %error, "malformed frame");
                if policy == DecodePolicy::Abort {
                    return Err(error.into());
                }
            }
            Err(error) => {
                if cancel.is_cancelled() {
                    info!(target: DRIVE_TARGET, "consumption loop cancelled");
                    return Ok(());
                }
                warn!(target: DRIVE_TARGET, error = %error, "message stream failed");
                return Err(error);
            }
        }
    }
    Ok(())
}
