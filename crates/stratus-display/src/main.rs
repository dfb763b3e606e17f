//! Entrypoint for the station display utility.
//!
//! The binary delegates to [`stratus_display::run`], which loads
//! configuration, installs telemetry and signal handling, and drives the
//! monitor from the message socket.

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let cli = stratus_display::Cli::parse();
    stratus_display::run(&cli)
}
