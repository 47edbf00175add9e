//! Main command: supervise OpenVPN and drive the tray
//!
//! The event loop owns the supervisor and reacts to status updates from the
//! reader thread, menu clicks and termination signals.

use colored::Colorize;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tunnelbar_core::config::toml_config::{load_settings, load_settings_from_path};
use tunnelbar_core::config::Settings;
use tunnelbar_core::error::{StartupError, TunnelbarError};
use tunnelbar_core::init_logging;
use tunnelbar_core::log_sink::LogSink;
use tunnelbar_core::presenter::{copied_label, describe, render};
use tunnelbar_core::vpn::{ConnectionStatus, Supervisor};

use crate::tray::{Tray, UiEvent};
use crate::Cli;

/// How long the "copied" label stays up
const COPIED_LABEL_DURATION: Duration = Duration::from_secs(1);

/// Merge the settings file with command-line overrides
fn resolve_settings(cli: &Cli) -> Result<Settings, TunnelbarError> {
    let mut settings = match &cli.settings {
        Some(path) => load_settings_from_path(path)?,
        None => load_settings()?,
    };

    if let Some(binary) = &cli.openvpn {
        settings.binary = binary.clone();
    }
    if cli.no_elevate {
        settings.privilege_command.clear();
    }
    if let Some(timeout) = cli.connect_timeout {
        settings.connect_timeout_secs = Some(timeout);
    }
    if cli.quiet {
        settings.echo_output = false;
    }

    settings.validate().map_err(|message| {
        TunnelbarError::Config(tunnelbar_core::error::ConfigError::ValidationError { message })
    })?;
    Ok(settings)
}

/// Run tunnelbar until the user disconnects
pub async fn run(cli: Cli) -> Result<(), TunnelbarError> {
    let settings = resolve_settings(&cli)?;

    let log_path = cli
        .log_file
        .clone()
        .or_else(|| settings.log_file.clone())
        .unwrap_or_else(LogSink::default_path);
    let sink = LogSink::open(&log_path).map_err(|e| StartupError::LogFile {
        path: log_path.display().to_string(),
        reason: e.to_string(),
    })?;

    init_logging(&sink, cli.verbose).map_err(|e| StartupError::LogFile {
        path: log_path.display().to_string(),
        reason: format!("failed to initialize logging: {}", e),
    })?;

    println!(
        "{} starting OpenVPN with {} (log: {})",
        "tunnelbar".bold(),
        cli.config_file.display(),
        log_path.display()
    );

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let supervisor = Supervisor::start(&cli.config_file, &settings, sink, status_tx)
        .map_err(|e| {
            tracing::error!("Failed to start OpenVPN: {}", e);
            e
        })?;

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let tray = Tray::spawn(supervisor.status(), ui_tx.clone()).await;
    let mut status = supervisor.status();
    let mut clipboard: Option<arboard::Clipboard> = None;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            Some(next) = status_rx.recv() => {
                print_status(&next);
                status = next.clone();
                tray.show_status(next).await;
            }
            Some(event) = ui_rx.recv() => match event {
                UiEvent::CopyAddress => {
                    if let Some(ip) = status.address() {
                        if copy_to_clipboard(&mut clipboard, ip.to_string()) {
                            tray.show_label(copied_label(ip)).await;
                            let restore = ui_tx.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(COPIED_LABEL_DURATION).await;
                                let _ = restore.send(UiEvent::RestoreLabel);
                            });
                        }
                    }
                }
                UiEvent::RestoreLabel => tray.show_label(render(&status)).await,
                UiEvent::Quit => {
                    info!("Disconnect requested from the menu");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, disconnecting");
                break;
            }
            _ = terminate.recv() => {
                info!("Terminated, disconnecting");
                break;
            }
        }
    }

    shutdown(supervisor).await;
    println!("Bye!");
    Ok(())
}

/// Stop OpenVPN off the async runtime; stop() blocks for the grace period
async fn shutdown(supervisor: Supervisor) {
    let stopped = tokio::task::spawn_blocking(move || {
        supervisor.stop();
        supervisor.status()
    })
    .await;

    match stopped {
        Ok(status) => debug!("Final status: {}", status),
        Err(e) => warn!("Failed to stop OpenVPN cleanly: {}", e),
    }
}

fn copy_to_clipboard(clipboard: &mut Option<arboard::Clipboard>, text: String) -> bool {
    // The clipboard is kept alive so the copied text survives on X11/Wayland
    if clipboard.is_none() {
        match arboard::Clipboard::new() {
            Ok(cb) => *clipboard = Some(cb),
            Err(e) => {
                warn!("Clipboard unavailable: {}", e);
                return false;
            }
        }
    }

    let Some(cb) = clipboard.as_mut() else {
        return false;
    };
    match cb.set_text(text) {
        Ok(()) => true,
        Err(e) => {
            warn!("Clipboard error: {}", e);
            false
        }
    }
}

fn print_status(status: &ConnectionStatus) {
    let text = describe(status);
    match status {
        ConnectionStatus::Connected(_) => println!("{} {}", "✓".green(), text.green()),
        ConnectionStatus::Connecting => println!("{}", text.yellow()),
        ConnectionStatus::Disconnected => println!("{}", text),
        ConnectionStatus::Failed(_) => println!("{} {}", "✗".red(), text.red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::ffi::OsString;
    use tempfile::tempdir;

    #[test]
    fn test_cli_overrides_settings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "binary = \"openvpn\"\nconnect_timeout_secs = 30\n").unwrap();

        let args: Vec<OsString> = vec![
            "tunnelbar".into(),
            "office.ovpn".into(),
            "--settings".into(),
            path.into_os_string(),
            "--openvpn=/opt/openvpn/sbin/openvpn".into(),
            "--no-elevate".into(),
            "--connect-timeout=5".into(),
            "--quiet".into(),
        ];
        let cli = Cli::parse_from(args);
        let settings = resolve_settings(&cli).unwrap();

        assert_eq!(settings.binary, "/opt/openvpn/sbin/openvpn");
        assert!(settings.privilege_command.is_empty());
        assert_eq!(settings.connect_timeout_secs, Some(5));
        assert!(!settings.echo_output);
    }

    #[test]
    fn test_settings_file_used_without_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "connect_timeout_secs = 30\n").unwrap();

        let args: Vec<OsString> = vec![
            "tunnelbar".into(),
            "office.ovpn".into(),
            "--settings".into(),
            path.into_os_string(),
        ];
        let cli = Cli::parse_from(args);
        let settings = resolve_settings(&cli).unwrap();

        assert_eq!(settings.binary, "openvpn");
        assert_eq!(settings.privilege_command, vec!["sudo".to_string()]);
        assert_eq!(settings.connect_timeout_secs, Some(30));
        assert!(settings.echo_output);
    }
}
