//! Streaming reader for one inbound socket connection.

use stratus_config::SocketEndpoint;
use tracing::trace;

use crate::codec::{self, Document};
use crate::error::{CommsError, ConnectionError};
use crate::transport::{self, Connection, ShutdownHandle};

const READER_TARGET: &str = "stratus::comms::reader";

/// Turns one persistent inbound connection into a lazy, logically infinite
/// sequence of decoded documents.
///
/// The reader never retries on its own: [`connect`](SocketReader::connect)
/// fails when the path is absent or the peer refuses, and the caller may
/// simply call it again. Stream state is connection-scoped; nothing is
/// buffered across reconnects.
pub struct SocketReader {
    endpoint: SocketEndpoint,
    connection: Option<Connection>,
}

impl SocketReader {
    /// Builds a reader for the given endpoint. No connection is opened yet.
    #[must_use]
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            connection: None,
        }
    }

    /// The endpoint this reader is bound to.
    #[must_use]
    pub fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Opens the connection, replacing any previous one.
    pub fn connect(&mut self) -> Result<(), CommsError> {
        let connection = transport::connect(&self.endpoint)?;
        self.connection = Some(connection);
        Ok(())
    }

    /// Whether a connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Clones a handle that closes the connection from another thread,
    /// unblocking a read stuck in [`Messages::next`].
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle, CommsError> {
        let connection = self.connection.as_ref().ok_or_else(|| {
            ConnectionError::NotConnected {
                endpoint: self.endpoint.to_string(),
            }
        })?;
        let handle = connection
            .shutdown_handle()
            .map_err(|source| ConnectionError::Read {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        Ok(handle)
    }

    /// Returns the message sequence for the current connection.
    ///
    /// Each advancement blocks on one frame read and yields the decoded
    /// document. Malformed frames yield [`DecodeError`](crate::DecodeError)
    /// items rather than being dropped. Peer close yields a
    /// [`ConnectionError`] item, never a silent end; after that the
    /// iterator is exhausted and the caller may reconnect.
    pub fn messages(&mut self) -> Result<Messages<'_>, CommsError> {
        let endpoint = self.endpoint.to_string();
        let connection = self
            .connection
            .as_mut()
            .ok_or(ConnectionError::NotConnected {
                endpoint: endpoint.clone(),
            })?;
        Ok(Messages {
            connection,
            endpoint,
            finished: false,
        })
    }
}

/// Iterator over the documents arriving on one connection.
///
/// Yields messages in exact wire order. Blank frames are skipped; they are
/// keep-alive noise, not messages.
#[derive(Debug)]
pub struct Messages<'a> {
    connection: &'a mut Connection,
    endpoint: String,
    finished: bool,
}

impl Iterator for Messages<'_> {
    type Item = Result<Document, CommsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match transport::read_frame(self.connection) {
                Ok(Some(payload)) => {
                    if payload.trim().is_empty() {
                        trace!(target: READER_TARGET, "skipping blank frame");
                        continue;
                    }
                    return Some(codec::decode(&payload).map_err(CommsError::from));
                }
                Ok(None) => {
                    self.finished = true;
                    return Some(Err(ConnectionError::Closed {
                        endpoint: self.endpoint.clone(),
                    }
                    .into()));
                }
                Err(source) => {
                    self.finished = true;
                    return Some(Err(ConnectionError::Read {
                        endpoint: self.endpoint.clone(),
                        source,
                    }
                    .into()));
                }
            }
        }
    }
}
