//! Tests that run the corebot binary itself.

use std::fs;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

fn corebot() -> Command {
    Command::new(env!("CARGO_BIN_EXE_corebot"))
}

#[test]
fn config_show_prints_effective_json() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{ "check_interval_secs": 30 }"#).unwrap();

    let output = corebot()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["check_interval_secs"], 30);
    assert_eq!(shown["display_tick_secs"], 1);
}

#[test]
fn bad_explicit_config_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, "not json").unwrap();

    let output = corebot()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn run_without_console_input_keeps_scheduling() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();
    fs::write(dir.path().join("clip.mp4"), b"").unwrap();

    let mut child = corebot()
        .arg("--config")
        .arg(&config)
        .args(["run", "--dry-run", "--mute", "--folder"])
        .arg(dir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(1500));
    let still_running = child.try_wait().unwrap().is_none();
    let _ = child.kill();
    let _ = child.wait();
    assert!(still_running, "scheduler exited when stdin closed");
}
