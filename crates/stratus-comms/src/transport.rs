//! Socket transport shared by the reader and the client.
//!
//! Wraps the stream behind a uniform [`Connection`] type so the framing and
//! transaction logic stays transport agnostic, and owns the one frame-read
//! primitive both sides use.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use stratus_config::SocketEndpoint;

use crate::error::ConnectionError;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest frame either side will read before giving up on the stream.
const MAX_FRAME_BYTES: usize = 64 * 1024;

/// An exclusively owned stream to one peer.
#[derive(Debug)]
pub(crate) enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

impl Connection {
    /// Bounds every subsequent read on this connection.
    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            Self::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }

    /// Clones a handle that can close this connection from another thread.
    pub(crate) fn shutdown_handle(&self) -> io::Result<ShutdownHandle> {
        let stream = match self {
            Self::Tcp(stream) => HandleStream::Tcp(stream.try_clone()?),
            #[cfg(unix)]
            Self::Unix(stream) => HandleStream::Unix(stream.try_clone()?),
        };
        Ok(ShutdownHandle { stream })
    }
}

/// Closes a connection from outside the thread blocked on it.
///
/// Cancellation is cooperative: shutting the socket down makes the blocked
/// read return, after which the stuck call surfaces a connection error.
pub struct ShutdownHandle {
    stream: HandleStream,
}

enum HandleStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ShutdownHandle {
    /// Shuts both directions of the connection down.
    ///
    /// Already-closed connections are not an error; the goal is only to
    /// unblock whoever is reading.
    pub fn shutdown(&self) {
        let outcome = match &self.stream {
            HandleStream::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            HandleStream::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        if let Err(error) = outcome
            && error.kind() != io::ErrorKind::NotConnected
        {
            tracing::warn!(target: "stratus::comms", error = %error, "socket shutdown failed");
        }
    }
}

pub(crate) fn connect(endpoint: &SocketEndpoint) -> Result<Connection, ConnectionError> {
    match endpoint {
        SocketEndpoint::Tcp { host, port } => {
            let address = resolve_tcp_address(host, *port).map_err(|source| {
                ConnectionError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                }
            })?;
            TcpStream::connect_timeout(&address, CONNECT_TIMEOUT)
                .map(Connection::Tcp)
                .map_err(|source| ConnectionError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
        }
        SocketEndpoint::Unix { path } => {
            #[cfg(unix)]
            {
                connect_unix(path.as_str()).map_err(|source| ConnectionError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })
            }

            #[cfg(not(unix))]
            {
                let _ = path;
                Err(ConnectionError::UnsupportedUnix {
                    endpoint: endpoint.to_string(),
                })
            }
        }
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

#[cfg(unix)]
fn connect_unix(path: &str) -> io::Result<Connection> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECT_TIMEOUT)?;
    let stream = UnixStream::from(std::os::fd::OwnedFd::from(socket));
    Ok(Connection::Unix(stream))
}

/// Reads one newline-delimited frame, byte at a time.
///
/// Both the reader and the client exchange at most one outstanding frame,
/// so no read-ahead buffer may sit between calls. Returns the payload with
/// the delimiter stripped, or `None` when the peer closed cleanly between
/// frames. Closing mid-frame is an `UnexpectedEof` error.
pub(crate) fn read_frame(connection: &mut Connection) -> io::Result<Option<String>> {
    let mut payload = Vec::new();
    let mut byte = [0_u8; 1];
    loop {
        let bytes_read = match connection.read(&mut byte) {
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };

        if bytes_read == 0 {
            if payload.is_empty() {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed mid-frame",
            ));
        }

        if byte[0] == b'\n' {
            let text = String::from_utf8(payload).map_err(|error| {
                io::Error::new(io::ErrorKind::InvalidData, error)
            })?;
            return Ok(Some(text));
        }

        payload.push(byte[0]);
        if payload.len() > MAX_FRAME_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "frame exceeds maximum size",
            ));
        }
    }
}

/// Writes one frame followed by the delimiter and flushes.
pub(crate) fn write_frame(connection: &mut Connection, payload: &str) -> io::Result<()> {
    connection.write_all(payload.as_bytes())?;
    connection.write_all(b"\n")?;
    connection.flush()
}
