//! Pattern-based parser for OpenVPN output
//!
//! Classifies OpenVPN stdout lines and extracts the tunnel address from the
//! server's PUSH_REPLY control message.

use regex::Regex;
use std::net::Ipv4Addr;

/// Substrings marking the control message that carries pushed options
const PUSH_MARKERS: [&str; 2] = ["PUSH_REPLY", "PUSH: Received control message"];

/// Markers worth surfacing in the diagnostic log
const NOTABLE_MARKERS: [&str; 11] = [
    "CONNECTED",
    "DISCONNECT",
    "AUTH_FAILED",
    "TLS_ERROR",
    "PUSH_REPLY",
    "Initialization Sequence Completed",
    "ERROR:",
    "FATAL:",
    "TCP connection established",
    "Peer Connection Initiated",
    "Connection reset",
];

/// Classification of one line of OpenVPN output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// The server assigned a tunnel address
    AddressAssigned { ip: Ipv4Addr },

    /// Line carrying a notable lifecycle or error marker
    Notable { line: String },

    /// Any other output
    Output { line: String },
}

/// Parser for OpenVPN output
pub struct OutputParser {
    /// Pattern for "ifconfig 10.8.0.2 255.255.255.0" inside a PUSH_REPLY
    ifconfig_pattern: Regex,
}

impl OutputParser {
    /// Create a new OutputParser with compiled regex patterns
    pub fn new() -> Self {
        Self {
            // Whitespace right after the directive keeps ifconfig-ipv6 out
            ifconfig_pattern: Regex::new(r"\bifconfig\s+([0-9.]+)")
                .expect("Failed to compile ifconfig pattern"),
        }
    }

    /// Extract the assigned IPv4 address from a line
    ///
    /// Only lines carrying the push marker are considered, and the token
    /// after `ifconfig` must be a well-formed IPv4 address.
    pub fn assigned_address(&self, line: &str) -> Option<Ipv4Addr> {
        if !PUSH_MARKERS.iter().any(|marker| line.contains(marker)) {
            return None;
        }

        let captures = self.ifconfig_pattern.captures(line)?;
        captures.get(1)?.as_str().parse::<Ipv4Addr>().ok()
    }

    /// Parse a line from OpenVPN stdout
    pub fn parse_line(&self, line: &str) -> OutputEvent {
        if let Some(ip) = self.assigned_address(line) {
            return OutputEvent::AddressAssigned { ip };
        }

        if NOTABLE_MARKERS.iter().any(|marker| line.contains(marker)) {
            return OutputEvent::Notable {
                line: line.to_string(),
            };
        }

        OutputEvent::Output {
            line: line.to_string(),
        }
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}
