//! Error types for tunnelbar
//!
//! Startup failures are fatal and map to a non-zero exit code. Child exits at
//! runtime are not errors at all; they surface as a connection status.

use thiserror::Error;

/// Main error type for the tunnelbar application
#[derive(Error, Debug)]
pub enum TunnelbarError {
    /// The VPN session could not be started
    #[error("Startup error: {0}")]
    Startup(#[from] StartupError),

    /// Errors related to the settings file
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TunnelbarError {
    /// Exit code reported to the shell for this error
    ///
    /// Configuration problems exit with 2, everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            TunnelbarError::Config(_) | TunnelbarError::Toml(_) => 2,
            TunnelbarError::Startup(startup) => match startup {
                StartupError::ConfigNotFound { .. }
                | StartupError::ConfigUnreadable { .. }
                | StartupError::InvalidConfig { .. }
                | StartupError::LogFile { .. } => 2,
                StartupError::BinaryNotFound { .. } | StartupError::SpawnFailed { .. } => 1,
            },
            TunnelbarError::Io(_) => 1,
        }
    }
}

/// Failures that prevent a VPN session from starting
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    #[error("OpenVPN configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Failed to read OpenVPN configuration {path}: {reason}")]
    ConfigUnreadable { path: String, reason: String },

    #[error("Invalid OpenVPN configuration {path}: missing remote, dev or proto directive")]
    InvalidConfig { path: String },

    #[error("Executable not found: {program}")]
    BinaryNotFound { program: String },

    #[error("Failed to spawn OpenVPN process: {reason}")]
    SpawnFailed { reason: String },

    #[error("Failed to open log file {path}: {reason}")]
    LogFile { path: String, reason: String },
}

/// Settings file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings file: {path}")]
    LoadFailed { path: String },

    #[error("Settings validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Errors raised while terminating the child process tree
///
/// These never leave `Supervisor::stop`, which only logs them.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to signal process {pid}: {reason}")]
    SignalFailed { pid: u32, reason: String },

    #[error("Failed to run privilege command for process {pid}: {reason}")]
    ElevationFailed { pid: u32, reason: String },

    #[error("Process {pid} did not respond to signals")]
    UnresponsiveProcess { pid: u32 },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TunnelbarError>;
