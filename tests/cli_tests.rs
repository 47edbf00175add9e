//! Integration tests for the tunnelbar command line
//!
//! These only exercise paths that exit before the tray is registered.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

const TUNNELBAR_BINARY: &str = env!("CARGO_BIN_EXE_tunnelbar");

fn run_tunnelbar(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(TUNNELBAR_BINARY)
        .args(args)
        .env("TUNNELBAR_CONFIG_DIR", config_dir)
        .env_remove("JOURNAL_STREAM")
        .output()
        .expect("Failed to run tunnelbar")
}

#[test]
fn test_help_lists_arguments() {
    let temp_dir = tempdir().unwrap();
    let output = run_tunnelbar(temp_dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CONFIG_FILE"));
    assert!(stdout.contains("--log-file"));
}

#[test]
fn test_config_file_is_required() {
    let temp_dir = tempdir().unwrap();
    let output = run_tunnelbar(temp_dir.path(), &[]);

    assert!(!output.status.success());
}

#[test]
fn test_missing_config_exits_with_config_error() {
    let temp_dir = tempdir().unwrap();
    let log = temp_dir.path().join("tunnelbar.log");
    let missing = temp_dir.path().join("missing.ovpn");

    let output = run_tunnelbar(
        temp_dir.path(),
        &[
            missing.to_str().unwrap(),
            "--log-file",
            log.to_str().unwrap(),
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);

    // The failure is recorded in the log file as well
    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Failed to start OpenVPN"), "log: {}", contents);
}

#[test]
fn test_missing_binary_exits_with_runtime_error() {
    let temp_dir = tempdir().unwrap();
    let log = temp_dir.path().join("tunnelbar.log");
    let profile = temp_dir.path().join("client.ovpn");
    std::fs::write(&profile, "client\ndev tun\nremote vpn.example.com 1194\n").unwrap();

    let output = run_tunnelbar(
        temp_dir.path(),
        &[
            profile.to_str().unwrap(),
            "--log-file",
            log.to_str().unwrap(),
            "--openvpn",
            "tunnelbar-no-such-openvpn",
            "--no-elevate",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("tunnelbar-no-such-openvpn"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_settings_exits_with_config_error() {
    let temp_dir = tempdir().unwrap();
    std::fs::write(temp_dir.path().join("config.toml"), "stop_grace_millis = 0\n").unwrap();
    let profile = temp_dir.path().join("client.ovpn");
    std::fs::write(&profile, "remote vpn.example.com 1194\n").unwrap();

    let output = run_tunnelbar(temp_dir.path(), &[profile.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
}
