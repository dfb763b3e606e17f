//! Domain-socket messaging primitives.
//!
//! Producers and consumers on one host exchange newline-delimited JSON
//! frames over Unix domain sockets. Two access patterns are provided: a
//! [`SocketReader`] that turns one inbound connection into an unbounded
//! sequence of decoded documents, and a [`SocketClient`] that performs
//! synchronous request/response transactions with at most one outstanding
//! request per connection.
//!
//! Neither primitive retries on its own; connection failures surface to the
//! caller, which owns reconnect policy.

pub mod client;
pub mod codec;
pub mod error;
pub mod reader;
mod transport;

pub use client::SocketClient;
pub use codec::{Document, decode, encode};
pub use error::{CommsError, ConnectionError, DecodeError, EncodeError, ProtocolError, TimeoutError};
pub use reader::{Messages, SocketReader};
pub use transport::ShutdownHandle;
