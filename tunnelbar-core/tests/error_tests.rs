//! Unit tests for error types and conversions

use tunnelbar_core::error::{ConfigError, ProcessError, StartupError, TunnelbarError};

#[test]
fn test_startup_error_display() {
    let error = StartupError::ConfigNotFound {
        path: "office.ovpn".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "OpenVPN configuration file not found: office.ovpn"
    );

    let error = StartupError::BinaryNotFound {
        program: "openvpn".to_string(),
    };
    assert_eq!(error.to_string(), "Executable not found: openvpn");
}

#[test]
fn test_process_error_display() {
    let error = ProcessError::UnresponsiveProcess { pid: 4242 };
    assert_eq!(error.to_string(), "Process 4242 did not respond to signals");
}

#[test]
fn test_tunnelbar_error_from_startup() {
    let error: TunnelbarError = StartupError::SpawnFailed {
        reason: "permission denied".to_string(),
    }
    .into();
    assert!(matches!(error, TunnelbarError::Startup(_)));
    assert_eq!(
        error.to_string(),
        "Startup error: Failed to spawn OpenVPN process: permission denied"
    );
}

#[test]
fn test_tunnelbar_error_from_io() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: TunnelbarError = io_error.into();
    assert!(matches!(error, TunnelbarError::Io(_)));
}

#[test]
fn test_exit_codes() {
    let config_missing: TunnelbarError = StartupError::ConfigNotFound {
        path: "office.ovpn".to_string(),
    }
    .into();
    assert_eq!(config_missing.exit_code(), 2);

    let invalid: TunnelbarError = StartupError::InvalidConfig {
        path: "notes.txt".to_string(),
    }
    .into();
    assert_eq!(invalid.exit_code(), 2);

    let settings: TunnelbarError = ConfigError::ValidationError {
        message: "binary cannot be empty".to_string(),
    }
    .into();
    assert_eq!(settings.exit_code(), 2);

    let binary: TunnelbarError = StartupError::BinaryNotFound {
        program: "openvpn".to_string(),
    }
    .into();
    assert_eq!(binary.exit_code(), 1);

    let spawn: TunnelbarError = StartupError::SpawnFailed {
        reason: "EAGAIN".to_string(),
    }
    .into();
    assert_eq!(spawn.exit_code(), 1);
}
