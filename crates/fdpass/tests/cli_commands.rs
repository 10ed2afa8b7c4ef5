#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/fdpass-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        assert!(
            start.elapsed() < timeout,
            "listener did not bind {} in time",
            path.display()
        );
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn version_prints_crate_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_fdpass"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn doctor_passes_on_this_host() {
    let output = Command::new(env!("CARGO_BIN_EXE_fdpass"))
        .args(["doctor", "--format", "json"])
        .output()
        .expect("doctor should run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "doctor failed: {stdout} {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("\"overall\":\"pass\""));
    assert!(stdout.contains("descriptor_loss_detection"));
}

#[test]
fn send_and_listen_roundtrip_over_socket_file() {
    let dir = unique_temp_dir("roundtrip");
    let sock_path = dir.join("pass.sock");

    let content_path = dir.join("payload-source.txt");
    std::fs::write(&content_path, "file-content").expect("content file should be writable");

    let listener = Command::new(env!("CARGO_BIN_EXE_fdpass"))
        .args(["listen"])
        .arg(&sock_path)
        .args(["--count", "1", "--read-fd", "32", "--format", "json"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen should spawn");

    wait_for_socket(&sock_path, Duration::from_secs(5));

    let send = Command::new(env!("CARGO_BIN_EXE_fdpass"))
        .args(["send"])
        .arg(&sock_path)
        .arg("--file")
        .arg(&content_path)
        .args(["--data", "hello fd", "--take", "5", "--format", "json"])
        .output()
        .expect("send should run");
    assert!(
        send.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&send.stderr)
    );
    let send_stdout = String::from_utf8_lossy(&send.stdout);
    assert!(send_stdout.contains("\"sent\":5"));

    let output = listener
        .wait_with_output()
        .expect("listen should exit after one message");
    assert!(
        output.status.success(),
        "listen failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    // Truncated payload, received descriptor, and content read through it.
    assert!(stdout.contains("\"payload\":\"hello\""), "stdout: {stdout}");
    assert!(stdout.contains("\"descriptor\":\"received\""));
    assert!(stdout.contains("file-content"));

    let _ = std::fs::remove_dir_all(&dir);
}
