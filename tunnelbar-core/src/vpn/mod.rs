//! VPN connection module
//!
//! Handles the OpenVPN child process, its output and the connection status.

pub mod output_parser;
pub mod process;
pub mod state;
pub mod supervisor;

// Public re-exports
pub use output_parser::{OutputEvent, OutputParser};
pub use state::{ConnectionStatus, SharedStatus};
pub use supervisor::{StatusSender, Supervisor};
