//! Socket fixtures for behavioural tests.
//!
//! Spawns throwaway Unix-socket peers so reader and client behaviour can be
//! verified without any real producer or inference server.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use stratus_config::SocketEndpoint;
use tempfile::TempDir;

/// A temporary socket path living inside its own directory.
pub struct SocketFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl SocketFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create socket dir");
        let path = dir.path().join("stratus-test.uds");
        Self { _dir: dir, path }
    }

    pub fn endpoint(&self) -> SocketEndpoint {
        SocketEndpoint::unix(self.path.to_str().expect("utf8 socket path").to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Binds a listener, accepts one connection, writes the given frames, and
/// closes the connection.
pub fn spawn_producer(path: &Path, frames: Vec<String>) -> JoinHandle<()> {
    let listener = UnixListener::bind(path).expect("bind producer socket");
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept consumer");
        for frame in &frames {
            stream.write_all(frame.as_bytes()).expect("write frame");
            stream.write_all(b"\n").expect("write delimiter");
        }
        stream.flush().expect("flush frames");
    })
}

/// Accepts `connections` consumers in turn, writing one numbered frame to
/// each before closing it.
pub fn spawn_serial_producer(path: &Path, connections: usize) -> JoinHandle<()> {
    let listener = UnixListener::bind(path).expect("bind producer socket");
    thread::spawn(move || {
        for index in 0..connections {
            let (mut stream, _) = listener.accept().expect("accept consumer");
            let frame = format!("{{\"connection\":{index}}}\n");
            stream.write_all(frame.as_bytes()).expect("write frame");
            stream.flush().expect("flush frame");
        }
    })
}

/// Accepts one connection and holds it open without writing, then exits
/// once the peer goes away or the linger budget expires.
pub fn spawn_silent_peer(path: &Path, linger: Duration) -> JoinHandle<()> {
    let listener = UnixListener::bind(path).expect("bind silent socket");
    thread::spawn(move || {
        let (_stream, _) = listener.accept().expect("accept consumer");
        thread::sleep(linger);
    })
}

/// Accepts one connection per session, answering each request line with
/// the session's scripted replies. `None` reads the request but stays
/// silent; each session then holds its connection open until the client
/// drops it. Returns the request lines seen per session.
pub fn spawn_serial_replier(
    path: &Path,
    sessions: Vec<Vec<Option<String>>>,
) -> JoinHandle<Vec<Vec<String>>> {
    let listener = UnixListener::bind(path).expect("bind replier socket");
    thread::spawn(move || {
        let mut recorded = Vec::new();
        for session in &sessions {
            let (stream, _) = listener.accept().expect("accept client");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut writer = stream;
            let mut requests = Vec::new();
            for reply in session {
                let mut line = String::new();
                if reader.read_line(&mut line).expect("read request") == 0 {
                    break;
                }
                requests.push(line.trim_end().to_string());
                if let Some(reply) = reply {
                    writer.write_all(reply.as_bytes()).expect("write reply");
                    writer.write_all(b"\n").expect("write delimiter");
                    writer.flush().expect("flush reply");
                }
            }
            let mut line = String::new();
            while reader.read_line(&mut line).expect("await close") != 0 {
                line.clear();
            }
            recorded.push(requests);
        }
        recorded
    })
}

/// Accepts one connection and answers each request line with the paired
/// reply, in order. `None` reads the request but stays silent.
pub fn spawn_replier(path: &Path, replies: Vec<Option<String>>) -> JoinHandle<Vec<String>> {
    let listener = UnixListener::bind(path).expect("bind replier socket");
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept client");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut writer = stream;
        let mut requests = Vec::new();
        for reply in &replies {
            let mut line = String::new();
            if reader.read_line(&mut line).expect("read request") == 0 {
                break;
            }
            requests.push(line.trim_end().to_string());
            if let Some(reply) = reply {
                writer.write_all(reply.as_bytes()).expect("write reply");
                writer.write_all(b"\n").expect("write delimiter");
                writer.flush().expect("flush reply");
            }
        }
        requests
    })
}
