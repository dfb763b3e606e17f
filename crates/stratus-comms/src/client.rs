//! Synchronous request/response client for one outbound connection.

use std::io;
use std::time::Duration;

use serde::Serialize;
use stratus_config::SocketEndpoint;

use crate::codec::{self, Document};
use crate::error::{CommsError, ConnectionError, ProtocolError, TimeoutError};
use crate::transport::{self, Connection};

/// Performs one-request-one-reply transactions over a socket.
///
/// The client holds exactly one pending-request slot: issuing a second
/// request before the response arrives is a [`ProtocolError`], not a queue.
/// Callers on multiple threads must serialise the `request` /
/// [`wait_for_response`](SocketClient::wait_for_response) pair externally.
pub struct SocketClient {
    endpoint: SocketEndpoint,
    response_timeout: Option<Duration>,
    connection: Option<Connection>,
    pending: bool,
}

impl SocketClient {
    /// Builds a client for the given endpoint. No connection is opened yet.
    #[must_use]
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            response_timeout: None,
            connection: None,
            pending: false,
        }
    }

    /// Bounds every [`wait_for_response`](SocketClient::wait_for_response)
    /// call. Without a timeout the wait may block indefinitely.
    ///
    /// An expired wait drops the connection: the peer's reply may still be
    /// in flight, and a stream carrying a stale reply must not serve the
    /// next transaction. Reopen with [`open`](SocketClient::open) before
    /// issuing another request.
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    /// The endpoint this client is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Opens the connection. A missing path or refusing peer is an error;
    /// inference requires the peer to be up.
    pub fn open(&mut self) -> Result<(), CommsError> {
        let connection = transport::connect(&self.endpoint)?;
        connection
            .set_read_timeout(self.response_timeout)
            .map_err(|source| ConnectionError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        self.connection = Some(connection);
        self.pending = false;
        Ok(())
    }

    /// Releases the connection. Idempotent; safe after a failed
    /// [`open`](SocketClient::open).
    pub fn close(&mut self) {
        self.connection = None;
        self.pending = false;
    }

    /// Serialises the payload, writes exactly one frame, and records that a
    /// response is now pending.
    pub fn request<T: Serialize>(&mut self, payload: &T) -> Result<(), CommsError> {
        if self.pending {
            return Err(ProtocolError::RequestPending {
                endpoint: self.endpoint.to_string(),
            }
            .into());
        }
        let frame = codec::encode(payload)?;
        let connection = self
            .connection
            .as_mut()
            .ok_or(ConnectionError::NotConnected {
                endpoint: self.endpoint.to_string(),
            })?;
        transport::write_frame(connection, &frame).map_err(|source| ConnectionError::Write {
            endpoint: self.endpoint.to_string(),
            source,
        })?;
        self.pending = true;
        Ok(())
    }

    /// Blocks until exactly one reply frame arrives and returns the decoded
    /// document. Pending state is cleared on every return path.
    ///
    /// A decoded `null` is a valid response — the protocol's rejection
    /// sentinel — and is returned to the caller, not treated as an error.
    /// Peer close without a reply is a [`ConnectionError`]; an expired
    /// `response_timeout` is a [`TimeoutError`] that also drops the
    /// connection, so the late reply cannot be mistaken for the answer to
    /// a later request.
    pub fn wait_for_response(&mut self) -> Result<Document, CommsError> {
        if !self.pending {
            return Err(ProtocolError::NoPendingRequest {
                endpoint: self.endpoint.to_string(),
            }
            .into());
        }
        self.pending = false;
        let endpoint = self.endpoint.to_string();
        let mut connection = self.connection.take().ok_or(ConnectionError::NotConnected {
            endpoint: endpoint.clone(),
        })?;
        loop {
            match transport::read_frame(&mut connection) {
                Ok(Some(payload)) => {
                    if payload.trim().is_empty() {
                        continue;
                    }
                    self.connection = Some(connection);
                    return codec::decode(&payload).map_err(CommsError::from);
                }
                // The peer went away; the connection stays released.
                Ok(None) => return Err(ConnectionError::Closed { endpoint }.into()),
                Err(source) if is_timeout(&source) => {
                    // The reply may still arrive on this stream; dropping
                    // the connection keeps it away from the next
                    // transaction.
                    drop(connection);
                    return Err(TimeoutError {
                        endpoint,
                        timeout: self.response_timeout.unwrap_or(Duration::ZERO),
                    }
                    .into());
                }
                Err(source) => return Err(ConnectionError::Read { endpoint, source }.into()),
            }
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
