//! The binary exits on SIGINT/SIGTERM even while its event source is an open,
//! idle stdin.

#![cfg(all(unix, feature = "cli"))]

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Starts `diorama` with an empty config and a piped stdin that is never
/// written to or closed.
fn spawn_diorama(dir: &TempDir, args: &[&str]) -> Child {
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();
    Command::new(env!("CARGO_BIN_EXE_diorama"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .current_dir(dir.path())
        .env("RUST_LOG", "info")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

fn send_signal(child: &Child, signal: libc::c_int) {
    let pid = libc::pid_t::try_from(child.id()).unwrap();
    // SAFETY: kill(2) on our own child's pid.
    assert_eq!(unsafe { libc::kill(pid, signal) }, 0);
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait().unwrap() {
            return Some(status);
        }
        sleep(Duration::from_millis(50));
    }
    let _ = child.kill();
    let _ = child.wait();
    None
}

fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        assert!(Instant::now() < deadline, "{} never appeared", path.display());
        sleep(Duration::from_millis(20));
    }
}

#[test]
fn simulate_exits_on_sigint_with_idle_stdin() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_diorama(&dir, &["simulate", "--dry-run"]);

    // The key help is printed once the harness is up
    let stdout = child.stdout.take().unwrap();
    let mut first = String::new();
    BufReader::new(stdout).read_line(&mut first).unwrap();
    assert!(!first.is_empty());
    sleep(Duration::from_millis(300));

    send_signal(&child, libc::SIGINT);
    let status = wait_with_timeout(&mut child, Duration::from_secs(5))
        .expect("simulate still running after SIGINT");
    assert!(status.success(), "exit status: {status}");
}

#[test]
fn run_exits_on_sigterm_with_idle_stdin() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("diorama.sock");
    let mut child = spawn_diorama(
        &dir,
        &["run", "--dry-run", "--socket", socket.to_str().unwrap()],
    );

    wait_for_path(&socket);
    sleep(Duration::from_millis(300));

    send_signal(&child, libc::SIGTERM);
    let status = wait_with_timeout(&mut child, Duration::from_secs(5))
        .expect("daemon still running after SIGTERM");
    assert!(status.success(), "exit status: {status}");
    assert!(!socket.exists());
}
