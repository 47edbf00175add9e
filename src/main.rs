//! tunnelbar - OpenVPN menu bar indicator
//!
//! Runs OpenVPN with a configuration file and shows the tunnel address the
//! server assigns in the system tray, with menu entries to copy it and to
//! disconnect.

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

mod cli;
mod tray;

#[derive(Parser)]
#[command(name = "tunnelbar", version)]
#[command(about = "Run OpenVPN and show the assigned tunnel address in the menu bar")]
#[command(after_help = "Examples:\n    \
    tunnelbar office.ovpn\n    \
    tunnelbar office.ovpn --log-file ~/vpn.log")]
pub struct Cli {
    /// Path to the OpenVPN configuration file (.ovpn)
    config_file: PathBuf,

    /// Append diagnostics and OpenVPN output to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Settings file (default: ~/.config/tunnelbar/config.toml)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// OpenVPN executable to run
    #[arg(long, value_name = "BINARY")]
    openvpn: Option<String>,

    /// Run OpenVPN directly instead of through the privilege command
    #[arg(long)]
    no_elevate: bool,

    /// Give up when no address is assigned within this many seconds
    #[arg(long, value_name = "SECS")]
    connect_timeout: Option<u64>,

    /// Do not echo OpenVPN output to the terminal
    #[arg(short, long)]
    quiet: bool,

    /// Log debug output, including every OpenVPN line
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli::run::run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    }
}
