//! Entrypoint for the inference test harness.
//!
//! Streams JSON sample documents from stdin through the inference socket
//! and prints each response document to stdout, one per line.

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Instant;

use camino::Utf8PathBuf;
use clap::Parser;
use stratus_comms::SocketClient;
use stratus_config::{Config, SocketEndpoint, default_log_filter};
use stratus_infer::{RejectionPolicy, run_session};
use tracing::{error, info};

const APP_TARGET: &str = "stratus::infer";

/// Command line arguments for the inference harness.
#[derive(Parser, Debug)]
#[command(
    name = "stratus-infer",
    about = "Sends stdin sample documents to the inference socket and prints responses"
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, value_name = "PATH")]
    config_path: Option<Utf8PathBuf>,
    /// Inference socket, e.g. unix:///run/pipes/inference.uds.
    /// Overrides the configured inference socket.
    #[arg(short = 'u', long, value_name = "ENDPOINT")]
    socket: Option<SocketEndpoint>,
    /// Seconds to wait for each response before giving up.
    #[arg(long, value_name = "SECONDS")]
    response_timeout_secs: Option<u64>,
    /// Policy for samples the peer rejects with a null reply.
    #[arg(long, value_name = "POLICY", default_value_t = RejectionPolicy::Stop)]
    rejection_policy: RejectionPolicy,
    /// Tracing filter expression.
    #[arg(long, value_name = "FILTER")]
    log_filter: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config_path.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            let _ = writeln!(io::stderr(), "{error}");
            return ExitCode::FAILURE;
        }
    };

    let filter = cli
        .log_filter
        .clone()
        .unwrap_or_else(|| default_log_filter().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();

    let Some(endpoint) = cli.socket.clone().or_else(|| config.sources.inference_socket.clone())
    else {
        error!(target: APP_TARGET, "no inference socket configured");
        return ExitCode::FAILURE;
    };

    let mut client = SocketClient::new(endpoint);
    let timeout = cli
        .response_timeout_secs
        .map(std::time::Duration::from_secs)
        .or_else(|| config.response_timeout());
    if let Some(timeout) = timeout {
        client = client.with_response_timeout(timeout);
    }
    if let Err(error) = client.open() {
        error!(target: APP_TARGET, error = %error, "failed to open inference socket");
        return ExitCode::FAILURE;
    }
    info!(target: APP_TARGET, socket = %client.endpoint(), "inference socket open");

    let started = Instant::now();
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let outcome = run_session(
        &mut client,
        stdin.lock(),
        &mut stdout,
        cli.rejection_policy,
    );
    client.close();

    match outcome {
        Ok(stats) => {
            info!(
                target: APP_TARGET,
                documents = stats.documents,
                processed = stats.processed,
                rejected = stats.rejected,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "session complete"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(target: APP_TARGET, error = %error, "session failed");
            ExitCode::FAILURE
        }
    }
}
