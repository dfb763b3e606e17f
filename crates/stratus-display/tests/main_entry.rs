//! Integration tests for the `stratus-display` binary entry point.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn missing_configuration_file_exits_with_failure() {
    let mut command = cargo_bin_cmd!("stratus-display");
    command.args(["--config-path", "/nonexistent/stratus.json"]);
    command
        .assert()
        .failure()
        .stderr(contains("failed to read configuration"));
}

#[test]
fn unknown_decode_policy_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("stratus-display");
    command.args(["--decode-policy", "explode"]);
    command.assert().failure();
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixListener;
    use std::process::{Command, Stdio};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn absent_socket_path_is_a_startup_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.uds");
        let endpoint = format!("unix://{}", path.display());

        let mut command = cargo_bin_cmd!("stratus-display");
        command.args(["--socket", &endpoint]);
        command
            .assert()
            .failure()
            .stderr(contains("failed to open message socket"));
    }

    #[test]
    fn consumes_the_stream_and_exits_cleanly_when_the_producer_closes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("display.uds");
        let endpoint = format!("unix://{}", path.display());

        let listener = UnixListener::bind(&path).expect("bind producer");
        let producer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept display");
            stream
                .write_all(b"{\"text\":\"hello\"}\n{\"text\":\"goodbye\"}\n")
                .expect("write frames");
        });

        let mut command = cargo_bin_cmd!("stratus-display");
        command.args(["--socket", &endpoint]);
        command
            .assert()
            .success()
            .stderr(contains("message socket open"));

        producer.join().expect("join producer");
    }

    #[test]
    fn termination_signal_ends_a_blocked_session_cleanly() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("display.uds");
        let endpoint = format!("unix://{}", path.display());
        let listener = UnixListener::bind(&path).expect("bind producer");

        let mut child = Command::new(env!("CARGO_BIN_EXE_stratus-display"))
            .args(["--socket", &endpoint])
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn display");

        // Hold the connection open without writing, so the reader blocks.
        let (_stream, _) = listener.accept().expect("accept display");
        thread::sleep(Duration::from_millis(150));

        let terminate = Command::new("kill")
            .args(["-TERM", &child.id().to_string()])
            .status()
            .expect("send termination signal");
        assert!(terminate.success());

        let status = child.wait().expect("wait for display");
        assert!(status.success(), "signal shutdown should exit zero");
    }
}
