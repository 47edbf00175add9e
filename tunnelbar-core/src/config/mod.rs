//! Configuration module
//!
//! Application settings live in an optional TOML file; the OpenVPN profile
//! itself is passed on the command line and only checked, never edited.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod ovpn;
pub mod toml_config;

/// Application settings
///
/// Every field has a default, so an absent or empty settings file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// OpenVPN executable name or path
    pub binary: String,

    /// Extra arguments placed before the configuration file path
    pub extra_args: Vec<String>,

    /// Command prefixed to the OpenVPN invocation for elevation
    ///
    /// An empty list runs OpenVPN directly.
    pub privilege_command: Vec<String>,

    /// Log destination used when `--log-file` is not given
    pub log_file: Option<PathBuf>,

    /// Give up if no address is assigned within this many seconds
    ///
    /// Counted from start, not reset by output: a chatty OpenVPN that never
    /// gets an address still times out. Unset means wait indefinitely.
    pub connect_timeout_secs: Option<u64>,

    /// Echo every OpenVPN output line to stdout
    pub echo_output: bool,

    /// Time allowed between SIGTERM and SIGKILL on shutdown
    pub stop_grace_millis: u64,
}

impl Settings {
    /// Whether OpenVPN is launched through a privilege command
    pub fn elevated(&self) -> bool {
        !self.privilege_command.is_empty()
    }

    /// Connect timeout as a Duration
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Grace period as a Duration
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_millis)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.binary.trim().is_empty() {
            return Err("binary cannot be empty".to_string());
        }

        if self.privilege_command.iter().any(|part| part.trim().is_empty()) {
            return Err("privilege_command cannot contain empty entries".to_string());
        }

        if self.stop_grace_millis == 0 {
            return Err("stop_grace_millis cannot be zero".to_string());
        }

        if let Some(timeout) = self.connect_timeout_secs {
            if timeout == 0 {
                return Err("connect_timeout_secs cannot be zero".to_string());
            }
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binary: "openvpn".to_string(),
            extra_args: vec![],
            privilege_command: vec!["sudo".to_string()],
            log_file: None,
            connect_timeout_secs: None,
            echo_output: true,
            stop_grace_millis: 3000,
        }
    }
}
