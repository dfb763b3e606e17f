//! Signal wiring for graceful shutdown.
//!
//! The watcher thread trips the cancellation token and closes the reader's
//! socket, so a consumption loop blocked in a read surfaces a connection
//! error and winds down instead of hanging until the next frame.

use std::io;
use std::sync::{Arc, Mutex};

use stratus_comms::ShutdownHandle;
use stratus_monitor::CancellationToken;
use thiserror::Error;

/// Late-bound slot for the reader's shutdown handle.
///
/// The watcher is installed before the socket is opened, so a signal
/// arriving during the connect window already takes the graceful path.
/// Once the connection exists the handle is dropped in via
/// [`set`](ShutdownSlot::set).
#[derive(Clone, Default)]
pub struct ShutdownSlot {
    handle: Arc<Mutex<Option<ShutdownHandle>>>,
}

impl ShutdownSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the handle the watcher will use to unblock the reader.
    pub fn set(&self, handle: ShutdownHandle) {
        if let Ok(mut guard) = self.handle.lock() {
            *guard = Some(handle);
        }
    }

    fn shutdown(&self) {
        if let Ok(guard) = self.handle.lock()
            && let Some(handle) = guard.as_ref()
        {
            handle.shutdown();
        }
    }
}

/// Errors raised while installing the signal watcher.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        #[source]
        source: io::Error,
    },
    /// The watcher thread could not be spawned.
    #[error("failed to spawn signal watcher: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
}

/// Spawns a thread that waits for a termination signal, then cancels the
/// token and shuts down whichever connection the slot holds by then.
#[cfg(unix)]
pub fn spawn_watcher(
    cancel: CancellationToken,
    reader_shutdown: ShutdownSlot,
) -> Result<(), SignalError> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
    use signal_hook::iterator::Signals;
    use tracing::info;

    let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
        .map_err(|source| SignalError::Install { source })?;
    std::thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(target: "stratus::display", signal, "shutdown signal received");
                cancel.cancel();
                reader_shutdown.shutdown();
            }
        })
        .map_err(|source| SignalError::Spawn { source })?;
    Ok(())
}

/// Without Unix signals the process relies on the platform default
/// Ctrl-C handling; the watcher is a no-op.
#[cfg(not(unix))]
pub fn spawn_watcher(
    _cancel: CancellationToken,
    _reader_shutdown: ShutdownSlot,
) -> Result<(), SignalError> {
    Ok(())
}
