//! The monitor lifecycle state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use strum::Display;
use stratus_comms::Document;
use stratus_config::Sources;
use tracing::{debug, info, warn};

use crate::message::MonitorMessage;
use crate::reports::{DisplaySnapshot, ReportSet, ReportSink};

const MONITOR_TARGET: &str = "stratus::monitor";

/// Granularity of the refresh thread's stop checks while sleeping.
const REFRESH_SLICE: Duration = Duration::from_millis(25);

/// Lifecycle states of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Aggregates subsystem reports and the latest inbound message into the
/// display state, publishing a composed snapshot to the sink whenever
/// either changes.
///
/// Construction loads an initial report snapshot. [`start`](Monitor::start)
/// spawns the periodic refresh thread; [`set_message`](Monitor::set_message)
/// is the single mutation entry point for inbound messages and is a no-op
/// outside the `Running` state; [`stop`](Monitor::stop) is idempotent.
pub struct Monitor {
    sources: Sources,
    refresh_interval: Duration,
    sink: Arc<dyn ReportSink>,
    state: MonitorState,
    shared: Arc<Mutex<DisplaySnapshot>>,
    stop_flag: Arc<AtomicBool>,
    refresh: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Builds a monitor over the given sources, loading the initial report
    /// snapshot immediately.
    #[must_use]
    pub fn new(sources: Sources, refresh_interval: Duration, sink: Arc<dyn ReportSink>) -> Self {
        let snapshot = DisplaySnapshot {
            reports: ReportSet::load(&sources),
            message: None,
        };
        Self {
            sources,
            refresh_interval,
            sink,
            state: MonitorState::Idle,
            shared: Arc::new(Mutex::new(snapshot)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            refresh: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// The latest composed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> DisplaySnapshot {
        self.shared
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Transitions to `Running` and spawns the report refresh thread.
    /// Calling `start` on a monitor that is already running is a no-op.
    pub fn start(&mut self) {
        if self.state == MonitorState::Running {
            return;
        }
        self.state = MonitorState::Starting;
        self.stop_flag.store(false, Ordering::SeqCst);

        let sources = self.sources.clone();
        let interval = self.refresh_interval;
        let sink = Arc::clone(&self.sink);
        let shared = Arc::clone(&self.shared);
        let stop_flag = Arc::clone(&self.stop_flag);
        self.refresh = Some(thread::spawn(move || {
            run_refresh(&sources, interval, sink.as_ref(), &shared, &stop_flag);
        }));

        self.state = MonitorState::Running;
        info!(target: MONITOR_TARGET, interval_ms = interval.as_millis() as u64, "monitor started");
    }

    /// Applies one inbound document to the display state and publishes the
    /// resulting snapshot. Messages arriving before `start` or after `stop`
    /// are ignored.
    pub fn set_message(&self, document: Document) {
        if self.state != MonitorState::Running {
            debug!(
                target: MONITOR_TARGET,
                state = %self.state,
                "ignoring message outside the running state"
            );
            return;
        }
        let message = MonitorMessage::from_document(document);
        let Ok(mut guard) = self.shared.lock() else {
            warn!(target: MONITOR_TARGET, "display state poisoned; dropping message");
            return;
        };
        guard.message = Some(message);
        self.sink.publish(&guard);
    }

    /// Stops the refresh thread and transitions to `Stopped`. Idempotent.
    pub fn stop(&mut self) {
        if matches!(self.state, MonitorState::Idle | MonitorState::Stopped) {
            self.state = MonitorState::Stopped;
            return;
        }
        self.state = MonitorState::Stopping;
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.refresh.take()
            && handle.join().is_err()
        {
            warn!(target: MONITOR_TARGET, "refresh thread panicked");
        }
        self.state = MonitorState::Stopped;
        info!(target: MONITOR_TARGET, "monitor stopped");
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_refresh(
    sources: &Sources,
    interval: Duration,
    sink: &dyn ReportSink,
    shared: &Mutex<DisplaySnapshot>,
    stop_flag: &AtomicBool,
) {
    while !stop_flag.load(Ordering::SeqCst) {
        let reports = ReportSet::load(sources);
        {
            let Ok(mut guard) = shared.lock() else {
                warn!(target: MONITOR_TARGET, "display state poisoned; stopping refresh");
                return;
            };
            guard.reports = reports;
            sink.publish(&guard);
        }
        sleep_until_stop(interval, stop_flag);
    }
}

fn sleep_until_stop(interval: Duration, stop_flag: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !stop_flag.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        thread::sleep(remaining.min(REFRESH_SLICE));
    }
}
