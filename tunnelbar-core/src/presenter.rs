//! Menu bar label rendering
//!
//! Pure functions from a connection status to the text the tray shows.

use crate::vpn::ConnectionStatus;
use std::net::Ipv4Addr;

/// Label shown while waiting for an address
pub const CONNECTING_LABEL: &str = "VPN …";

/// Label shown when there is no tunnel
pub const DISCONNECTED_LABEL: &str = "VPN ✕";

/// Visible menu bar label for a status
pub fn render(status: &ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connected(ip) => ip.to_string(),
        ConnectionStatus::Connecting => CONNECTING_LABEL.to_string(),
        ConnectionStatus::Disconnected | ConnectionStatus::Failed(_) => {
            DISCONNECTED_LABEL.to_string()
        }
    }
}

/// One-line description for tooltips and the menu header
pub fn describe(status: &ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Connecting => "Connecting…".to_string(),
        ConnectionStatus::Connected(ip) => format!("Connected as {}", ip),
        ConnectionStatus::Disconnected => "Disconnected".to_string(),
        ConnectionStatus::Failed(reason) => format!("Failed: {}", reason),
    }
}

/// Label flashed after the address was copied
pub fn copied_label(ip: Ipv4Addr) -> String {
    format!("✓ {}", ip)
}
