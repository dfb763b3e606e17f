//! Runtime for the station display utility.
//!
//! Content for the display comes from several sources: the configured
//! subsystem report files and a Unix domain socket carrying inbound
//! messages. The runtime wires a [`Monitor`] to a [`SocketReader`] and runs
//! the consumption loop until the producer goes away or a shutdown signal
//! arrives. Messaging is optional: with no socket configured the monitor
//! runs on report refresh alone.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use stratus_comms::{CommsError, SocketReader};
use stratus_config::{Config, LogFormat, SocketEndpoint};
use stratus_monitor::{CancellationToken, DecodePolicy, Monitor, TracingReportSink, drive};
use tracing::{error, info, warn};

mod signals;
mod telemetry;

const APP_TARGET: &str = "stratus::display";

/// Granularity of cancellation checks when idling without a socket.
const IDLE_SLICE: Duration = Duration::from_millis(100);

/// Command line arguments for the display utility.
#[derive(Parser, Debug)]
#[command(
    name = "stratus-display",
    about = "Drives the station display from subsystem reports and the message socket"
)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, value_name = "PATH")]
    pub config_path: Option<Utf8PathBuf>,
    /// Message socket to read, e.g. unix:///run/pipes/display.uds.
    /// Overrides the configured display socket.
    #[arg(short = 'u', long, value_name = "ENDPOINT")]
    pub socket: Option<SocketEndpoint>,
    /// Tracing filter expression.
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
    /// Log output format.
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
    /// Policy for frames that fail to decode.
    #[arg(long, value_name = "POLICY", default_value_t = DecodePolicy::Skip)]
    pub decode_policy: DecodePolicy,
}

/// Runs the display utility to completion.
#[must_use]
pub fn run(cli: &Cli) -> ExitCode {
    let config = match Config::load(cli.config_path.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            // Telemetry is not up yet; stderr is all there is.
            let _ = writeln!(std::io::stderr(), "{error}");
            return ExitCode::FAILURE;
        }
    };

    let filter = cli
        .log_filter
        .clone()
        .unwrap_or_else(|| config.log_filter.clone());
    let format = cli.log_format.unwrap_or(config.log_format);
    if let Err(error) = telemetry::initialise(&filter, format) {
        let _ = writeln!(std::io::stderr(), "{error}");
        return ExitCode::FAILURE;
    }

    let endpoint = cli
        .socket
        .clone()
        .or_else(|| config.sources.display_socket.clone());

    let mut monitor = Monitor::new(
        config.sources.clone(),
        config.refresh_interval(),
        Arc::new(TracingReportSink),
    );
    let cancel = CancellationToken::new();
    monitor.start();

    let code = match endpoint {
        Some(endpoint) => run_connected(endpoint, &monitor, cli.decode_policy, &cancel),
        None => run_reports_only(&cancel),
    };

    monitor.stop();
    info!(target: APP_TARGET, "finishing");
    code
}

fn run_connected(
    endpoint: SocketEndpoint,
    monitor: &Monitor,
    policy: DecodePolicy,
    cancel: &CancellationToken,
) -> ExitCode {
    // The watcher goes up before the connect so a signal during the
    // connect window still takes the graceful path; the shutdown handle is
    // bound into the slot once the connection exists.
    let slot = signals::ShutdownSlot::new();
    if let Err(error) = signals::spawn_watcher(cancel.clone(), slot.clone()) {
        error!(target: APP_TARGET, error = %error, "failed to install signal handling");
        return ExitCode::FAILURE;
    }

    let mut reader = SocketReader::new(endpoint);
    if let Err(error) = reader.connect() {
        error!(target: APP_TARGET, error = %error, "failed to open message socket");
        return ExitCode::FAILURE;
    }
    info!(target: APP_TARGET, socket = %reader.endpoint(), "message socket open");

    match reader.shutdown_handle() {
        Ok(handle) => slot.set(handle),
        Err(error) => {
            warn!(
                target: APP_TARGET,
                error = %error,
                "no shutdown handle; a signal cannot unblock the reader"
            );
        }
    }
    // A signal that fired before the handle was bound cannot close the
    // socket; honour it here instead of blocking on the first read.
    if cancel.is_cancelled() {
        return ExitCode::SUCCESS;
    }

    match drive::run(&mut reader, monitor, policy, cancel) {
        Ok(()) => ExitCode::SUCCESS,
        // A lost producer ends the session normally: the state machine has
        // already been stopped gracefully and the display keeps its last
        // content.
        Err(CommsError::Connection(_)) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn run_reports_only(cancel: &CancellationToken) -> ExitCode {
    if let Err(error) = signals::spawn_watcher(cancel.clone(), signals::ShutdownSlot::new()) {
        error!(target: APP_TARGET, error = %error, "failed to install signal handling");
        return ExitCode::FAILURE;
    }
    info!(
        target: APP_TARGET,
        "no message socket configured; monitoring reports only"
    );
    while !cancel.is_cancelled() {
        thread::sleep(IDLE_SLICE);
    }
    ExitCode::SUCCESS
}
