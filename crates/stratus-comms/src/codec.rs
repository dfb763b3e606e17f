//! Frame codec: one document per newline-delimited JSON payload.
//!
//! The codec is independent of the transport. Encoded payloads carry no
//! trailing delimiter; appending the newline is the writer's job. Compact
//! JSON escapes control characters, so an encoded payload can never contain
//! an unescaped delimiter byte.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DecodeError, EncodeError};

/// The untyped document form carried on the wire.
pub type Document = serde_json::Value;

/// Encodes a document into a single frame payload.
///
/// Deterministic for a given input; the payload contains no `\n` byte.
pub fn encode<T: Serialize>(document: &T) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(document)?)
}

/// Decodes a frame payload back into a document.
///
/// Malformed input yields a [`DecodeError`] carrying the payload; it never
/// panics. The caller decides whether to skip the frame or abort.
pub fn decode<T: DeserializeOwned>(payload: &str) -> Result<T, DecodeError> {
    serde_json::from_str(payload).map_err(|source| DecodeError {
        payload: payload.to_string(),
        source,
    })
}
