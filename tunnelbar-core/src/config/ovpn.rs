//! OpenVPN profile checks
//!
//! The profile is owned by OpenVPN; we only make sure it exists and looks
//! like an OpenVPN configuration before spawning anything.

use crate::error::StartupError;
use std::path::Path;

/// Directives of which at least one must appear in a profile
const REQUIRED_DIRECTIVES: [&str; 3] = ["remote ", "dev ", "proto "];

/// Validate an OpenVPN configuration file
pub fn validate_profile(path: &Path) -> Result<(), StartupError> {
    let display = path.to_string_lossy().to_string();

    let contents = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StartupError::ConfigNotFound {
            path: display.clone(),
        },
        _ => StartupError::ConfigUnreadable {
            path: display.clone(),
            reason: e.to_string(),
        },
    })?;

    // Profiles may embed binary-ish key material; only the directives matter
    let contents = String::from_utf8_lossy(&contents);
    if REQUIRED_DIRECTIVES
        .iter()
        .any(|directive| contents.contains(directive))
    {
        Ok(())
    } else {
        Err(StartupError::InvalidConfig { path: display })
    }
}
