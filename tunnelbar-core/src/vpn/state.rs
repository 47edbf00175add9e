//! VPN connection status
//!
//! Defines the status of the supervised OpenVPN session and a thread-safe
//! cell the reader thread writes and the UI reads.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};

/// Status of the supervised VPN session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// OpenVPN is running but no address has been assigned yet
    Connecting,

    /// The server pushed a tunnel address
    Connected(Ipv4Addr),

    /// OpenVPN exited cleanly or was stopped on request
    Disconnected,

    /// OpenVPN exited with an error or never finished connecting
    Failed(String),
}

impl ConnectionStatus {
    /// Disconnected and Failed are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Disconnected | ConnectionStatus::Failed(_))
    }

    /// Assigned address, if connected
    pub fn address(&self) -> Option<Ipv4Addr> {
        match self {
            ConnectionStatus::Connected(ip) => Some(*ip),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is allowed
    ///
    /// Terminal states absorb everything, and nothing moves back to
    /// `Connecting`.
    pub fn can_transition_to(&self, next: &ConnectionStatus) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        !matches!(next, ConnectionStatus::Connecting)
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::Connecting
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected(ip) => write!(f, "connected as {}", ip),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Thread-safe status cell
#[derive(Debug, Clone, Default)]
pub struct SharedStatus(Arc<Mutex<ConnectionStatus>>);

impl SharedStatus {
    /// Create a new cell in the `Connecting` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current status
    pub fn get(&self) -> ConnectionStatus {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Apply a transition
    ///
    /// Returns true when the status changed, false when the transition was
    /// rejected or a no-op.
    pub fn transition(&self, next: ConnectionStatus) -> bool {
        let mut current = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !current.can_transition_to(&next) {
            return false;
        }
        *current = next;
        true
    }

    /// Apply a transition only if the current status equals `expected`
    pub fn transition_from(&self, expected: &ConnectionStatus, next: ConnectionStatus) -> bool {
        let mut current = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != *expected || !current.can_transition_to(&next) {
            return false;
        }
        *current = next;
        true
    }
}
