//! Behavioural tests for the consumption loop over a real domain socket.

#![cfg(unix)]

use std::io::Write;
use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use stratus_comms::{CommsError, SocketReader};
use stratus_config::{SocketEndpoint, Sources};
use stratus_monitor::{
    CancellationToken, DecodePolicy, DisplaySnapshot, Monitor, MonitorMessage, ReportSink, drive,
};

#[derive(Default)]
struct RecordingSink {
    snapshots: Mutex<Vec<DisplaySnapshot>>,
}

impl ReportSink for RecordingSink {
    fn publish(&self, snapshot: &DisplaySnapshot) {
        if let Ok(mut guard) = self.snapshots.lock() {
            guard.push(snapshot.clone());
        }
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    endpoint: SocketEndpoint,
    path: std::path::PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("display.uds");
        let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path").to_string());
        Self {
            _dir: dir,
            endpoint,
            path,
        }
    }
}

fn spawn_producer(path: &Path, frames: Vec<&'static str>) -> JoinHandle<()> {
    let listener = UnixListener::bind(path).expect("bind producer");
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept consumer");
        for frame in frames {
            stream.write_all(frame.as_bytes()).expect("write frame");
            stream.write_all(b"\n").expect("write delimiter");
        }
        stream.flush().expect("flush");
    })
}

fn running_monitor(sink: Arc<RecordingSink>) -> Monitor {
    let mut monitor = Monitor::new(
        Sources::default(),
        Duration::from_secs(60),
        sink as Arc<dyn ReportSink>,
    );
    monitor.start();
    monitor
}

#[test]
fn forwards_every_message_until_the_connection_drops() {
    let fixture = Fixture::new();
    let producer = spawn_producer(&fixture.path, vec!["{\"text\":\"one\"}", "{\"text\":\"two\"}"]);

    let sink = Arc::new(RecordingSink::default());
    let mut monitor = running_monitor(Arc::clone(&sink));
    let mut reader = SocketReader::new(fixture.endpoint.clone());
    reader.connect().expect("connect reader");

    let cancel = CancellationToken::new();
    let outcome = drive::run(&mut reader, &monitor, DecodePolicy::Skip, &cancel);
    assert!(matches!(outcome, Err(CommsError::Connection(_))));

    assert_eq!(
        monitor.snapshot().message,
        Some(MonitorMessage::Text("two".to_string()))
    );
    let published = sink.snapshots.lock().expect("sink lock");
    // The refresh thread may interleave extra publishes; only the relative
    // order of the message publishes matters.
    let texts: Vec<_> = published
        .iter()
        .filter_map(|snapshot| snapshot.message.clone())
        .collect();
    let first_one = texts
        .iter()
        .position(|message| *message == MonitorMessage::Text("one".to_string()))
        .expect("first message published");
    let first_two = texts
        .iter()
        .position(|message| *message == MonitorMessage::Text("two".to_string()))
        .expect("second message published");
    assert!(first_one < first_two, "messages published in wire order");
    drop(published);

    monitor.stop();
    producer.join().expect("join producer");
}

#[test]
fn skip_policy_rides_over_malformed_frames() {
    let fixture = Fixture::new();
    let producer = spawn_producer(&fixture.path, vec!["{broken", "{\"text\":\"after\"}"]);

    let mut monitor = running_monitor(Arc::new(RecordingSink::default()));
    let mut reader = SocketReader::new(fixture.endpoint.clone());
    reader.connect().expect("connect reader");

    let cancel = CancellationToken::new();
    let outcome = drive::run(&mut reader, &monitor, DecodePolicy::Skip, &cancel);
    assert!(matches!(outcome, Err(CommsError::Connection(_))));
    assert_eq!(
        monitor.snapshot().message,
        Some(MonitorMessage::Text("after".to_string()))
    );

    monitor.stop();
    producer.join().expect("join producer");
}

#[test]
fn abort_policy_stops_on_the_first_malformed_frame() {
    let fixture = Fixture::new();
    let producer = spawn_producer(&fixture.path, vec!["{broken", "{\"text\":\"after\"}"]);

    let mut monitor = running_monitor(Arc::new(RecordingSink::default()));
    let mut reader = SocketReader::new(fixture.endpoint.clone());
    reader.connect().expect("connect reader");

    let cancel = CancellationToken::new();
    let outcome = drive::run(&mut reader, &monitor, DecodePolicy::Abort, &cancel);
    assert!(matches!(outcome, Err(CommsError::Decode(_))));
    assert!(monitor.snapshot().message.is_none());

    monitor.stop();
    producer.join().expect("join producer");
}

#[test]
fn cancellation_ends_the_loop_cleanly() {
    let fixture = Fixture::new();
    let listener = UnixListener::bind(&fixture.path).expect("bind silent producer");
    let holder = thread::spawn(move || {
        let (_stream, _) = listener.accept().expect("accept consumer");
        thread::sleep(Duration::from_millis(400));
    });

    let mut monitor = running_monitor(Arc::new(RecordingSink::default()));
    let mut reader = SocketReader::new(fixture.endpoint.clone());
    reader.connect().expect("connect reader");
    let shutdown = reader.shutdown_handle().expect("shutdown handle");

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        canceller.cancel();
        shutdown.shutdown();
    });

    let outcome = drive::run(&mut reader, &monitor, DecodePolicy::Skip, &cancel);
    assert!(outcome.is_ok(), "cancelled shutdown should be clean");

    monitor.stop();
    trigger.join().expect("join trigger");
    holder.join().expect("join producer");
}
