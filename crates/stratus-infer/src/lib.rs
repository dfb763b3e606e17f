//! Stdin-driven harness for exercising the inference request socket.
//!
//! Each input line is one JSON sample document. The harness sends it over
//! the socket client, blocks for the reply, and writes the decoded response
//! to the output stream. The inference peer signals rejection with a `null`
//! reply; [`RejectionPolicy`] decides whether that ends the session.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use strum::{Display, EnumString};
use stratus_comms::{CommsError, SocketClient, codec};
use thiserror::Error;
use tracing::{debug, warn};

const SESSION_TARGET: &str = "stratus::infer";

/// What to do when the peer rejects a sample with a `null` reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RejectionPolicy {
    /// End the session on the first rejection.
    #[default]
    Stop,
    /// Log the rejection and move on to the next sample.
    Skip,
}

impl RejectionPolicy {
    /// Parses a policy name, for CLI wiring.
    pub fn parse(input: &str) -> Result<Self, strum::ParseError> {
        Self::from_str(input)
    }
}

/// Counters accumulated over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Non-blank input lines consumed.
    pub documents: u64,
    /// Requests that received a non-null response.
    pub processed: u64,
    /// Requests the peer answered with `null`.
    pub rejected: u64,
}

/// Errors ending a session early.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transaction with the peer failed.
    #[error(transparent)]
    Comms(#[from] CommsError),
    /// Reading a sample line from the input failed.
    #[error("failed to read input: {source}")]
    Input {
        #[source]
        source: io::Error,
    },
    /// Writing a response document to the output failed.
    #[error("failed to write output: {source}")]
    Output {
        #[source]
        source: io::Error,
    },
}

/// Runs one request/response transaction per input line until the input is
/// exhausted, the peer goes away, or a rejection stops the session.
///
/// The client must already be open. Blank lines are skipped without being
/// counted. Each line is decoded before it is sent, so a malformed sample
/// fails the session with a decode error rather than reaching the peer.
pub fn run_session<R: BufRead, W: Write>(
    client: &mut SocketClient,
    input: R,
    output: &mut W,
    policy: RejectionPolicy,
) -> Result<SessionStats, SessionError> {
    let mut stats = SessionStats::default();
    for line in input.lines() {
        let line = line.map_err(|source| SessionError::Input { source })?;
        if line.trim().is_empty() {
            continue;
        }
        stats.documents += 1;
        let sample: codec::Document =
            codec::decode(&line).map_err(|error| SessionError::Comms(error.into()))?;
        debug!(target: SESSION_TARGET, sample = %sample, "sending sample");

        client.request(&sample)?;
        let response = client.wait_for_response()?;
        if response.is_null() {
            stats.rejected += 1;
            warn!(target: SESSION_TARGET, sample = %sample, "sample rejected");
            match policy {
                RejectionPolicy::Stop => break,
                RejectionPolicy::Skip => continue,
            }
        }

        let frame = codec::encode(&response).map_err(|error| SessionError::Comms(error.into()))?;
        writeln!(output, "{frame}").map_err(|source| SessionError::Output { source })?;
        stats.processed += 1;
    }
    Ok(stats)
}
