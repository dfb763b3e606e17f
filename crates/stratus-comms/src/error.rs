//! Error taxonomy for the messaging primitives.
//!
//! Transport faults, malformed frames, client misuse, and expired waits are
//! distinct conditions with distinct recovery stories, so each gets its own
//! type. [`CommsError`] is the umbrella the public operations return.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Transport-level failure: the socket could not be opened, the peer went
/// away, or a read or write failed. Never swallowed inside the reader or
/// client; the caller decides whether to reopen or terminate.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Opening the socket failed.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// An operation requires an open connection.
    #[error("socket {endpoint} is not open")]
    NotConnected { endpoint: String },
    /// The peer closed the connection.
    #[error("peer at {endpoint} closed the connection")]
    Closed { endpoint: String },
    /// A read from the socket failed.
    #[error("failed to read from {endpoint}: {source}")]
    Read {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// A write to the socket failed.
    #[error("failed to write to {endpoint}: {source}")]
    Write {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// Unix domain sockets are unavailable on this platform.
    #[cfg(not(unix))]
    #[error("platform does not support unix sockets: {endpoint}")]
    UnsupportedUnix { endpoint: String },
}

/// A frame could not be parsed into a document.
///
/// Carries the offending payload so producer bugs stay visible; whether to
/// skip the frame or abort the stream is the consumer's policy.
#[derive(Debug, Error)]
#[error("failed to decode frame {payload:?}: {source}")]
pub struct DecodeError {
    /// The undecodable frame payload, delimiter stripped.
    pub payload: String,
    #[source]
    pub source: serde_json::Error,
}

/// A document could not be serialised into a frame.
#[derive(Debug, Error)]
#[error("failed to encode document: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Client misuse. A contract violation local to the call, never a
/// recoverable runtime condition; the connection itself stays usable.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// `request` was called while a response was still pending.
    #[error("a request is already pending on {endpoint}")]
    RequestPending { endpoint: String },
    /// `wait_for_response` was called with no request outstanding.
    #[error("no request is pending on {endpoint}")]
    NoPendingRequest { endpoint: String },
}

/// `wait_for_response` exceeded its configured bound. The connection is
/// dropped with it — a late reply must not answer a later request — so the
/// client needs a fresh `open` before its next transaction.
#[derive(Debug, Error)]
#[error("no response from {endpoint} within {timeout:?}")]
pub struct TimeoutError {
    pub endpoint: String,
    pub timeout: Duration,
}

/// Umbrella error returned by the messaging operations.
#[derive(Debug, Error)]
pub enum CommsError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}
