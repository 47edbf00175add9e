//! TOML settings file I/O
//!
//! Loads application settings from the user's configuration directory.

use crate::config::Settings;
use crate::error::{ConfigError, TunnelbarError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default settings file name
const SETTINGS_FILE_NAME: &str = "config.toml";

/// Get the default configuration directory
///
/// Returns ~/.config/tunnelbar, or TUNNELBAR_CONFIG_DIR if set. Under sudo
/// the invoking user's home is used so settings are not looked up in /root.
pub fn get_config_dir() -> Result<PathBuf, TunnelbarError> {
    // Allow tests to override config directory via environment variable
    if let Ok(config_dir) = std::env::var("TUNNELBAR_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        std::env::var("SUDO_HOME").unwrap_or_else(|_| format!("/home/{}", sudo_user))
    } else {
        std::env::var("HOME").map_err(|_| {
            TunnelbarError::Config(ConfigError::IoError {
                message: "HOME environment variable not set".to_string(),
            })
        })?
    };

    Ok(PathBuf::from(home).join(".config").join("tunnelbar"))
}

/// Get the default settings file path
pub fn get_settings_path() -> Result<PathBuf, TunnelbarError> {
    Ok(get_config_dir()?.join(SETTINGS_FILE_NAME))
}

/// Load settings from the default location
///
/// A missing file yields the defaults.
pub fn load_settings() -> Result<Settings, TunnelbarError> {
    let path = get_settings_path()?;
    if !path.exists() {
        debug!("No settings file at {:?}, using defaults", path);
        return Ok(Settings::default());
    }
    load_settings_from_path(&path)
}

/// Load settings from a specific TOML file
///
/// Unlike `load_settings`, a missing file is an error: the caller named it.
pub fn load_settings_from_path<P: AsRef<Path>>(path: P) -> Result<Settings, TunnelbarError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TunnelbarError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => TunnelbarError::Config(ConfigError::IoError {
            message: format!("Failed to read settings file: {}", e),
        }),
    })?;

    let settings = parse_settings(&contents)?;
    debug!("Loaded settings from {:?}", path.as_ref());
    Ok(settings)
}

/// Parse and validate settings from TOML text
pub fn parse_settings(contents: &str) -> Result<Settings, TunnelbarError> {
    let settings: Settings = toml::from_str(contents)?;

    settings
        .validate()
        .map_err(|e| TunnelbarError::Config(ConfigError::ValidationError { message: e }))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_missing_named_file_is_error() {
        let temp_dir = tempdir().unwrap();
        let result = load_settings_from_path(temp_dir.path().join("absent.toml"));
        assert!(matches!(
            result,
            Err(TunnelbarError::Config(ConfigError::LoadFailed { .. }))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let invalid = [
            "binary = \"\"",
            "stop_grace_millis = 0",
            "connect_timeout_secs = 0",
            "privilege_command = [\"\"]",
        ];

        for contents in invalid {
            assert!(
                matches!(
                    parse_settings(contents),
                    Err(TunnelbarError::Config(ConfigError::ValidationError { .. }))
                ),
                "expected validation error for {:?}",
                contents
            );
        }
    }
}
