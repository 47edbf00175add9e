//! OpenVPN process tree termination
//!
//! OpenVPN usually runs under `sudo`, so the direct child is the sudo wrapper
//! and the real VPN process is one of its descendants. These helpers find the
//! whole tree and signal it, falling back to the privilege command when the
//! kernel refuses a signal to a root-owned process.

use crate::error::ProcessError;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Check whether a process exists (zombies included)
///
/// EPERM means the process exists but belongs to another user, as OpenVPN
/// does when started through sudo.
pub fn is_process_alive(pid: u32) -> bool {
    matches!(
        kill(Pid::from_raw(pid as i32), None),
        Ok(()) | Err(Errno::EPERM)
    )
}

/// Direct children of a process
///
/// Uses `pgrep -P`; pgrep exits non-zero when nothing matches, which is
/// treated as no children.
pub fn child_pids(pid: u32) -> Vec<u32> {
    let output = Command::new("pgrep")
        .args(["-P", &pid.to_string()])
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout)
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect(),
        Ok(_) => vec![],
        Err(e) => {
            debug!("pgrep unavailable, not scanning children of {}: {}", pid, e);
            vec![]
        }
    }
}

/// All descendants of a process, parents before children
pub fn descendant_pids(pid: u32) -> Vec<u32> {
    let mut found = vec![];
    let mut pending = vec![pid];

    while let Some(parent) = pending.pop() {
        for child in child_pids(parent) {
            if !found.contains(&child) && child != pid {
                found.push(child);
                pending.push(child);
            }
        }
    }

    found
}

/// Send a signal to one process
///
/// A process that is already gone counts as success. When the signal is
/// refused with EPERM and a privilege command is configured, the signal is
/// delivered through `<privilege command> kill -s <SIG> <pid>`.
pub fn signal_process(
    pid: u32,
    signal: Signal,
    privilege_command: &[String],
) -> Result<(), ProcessError> {
    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => {
            debug!("Sent {} to process {}", signal, pid);
            Ok(())
        }
        Err(Errno::ESRCH) => {
            debug!("Process {} already terminated", pid);
            Ok(())
        }
        Err(Errno::EPERM) if !privilege_command.is_empty() => {
            debug!(
                "Permission denied signaling process {}, retrying through {}",
                pid, privilege_command[0]
            );
            elevated_signal(pid, signal, privilege_command)
        }
        Err(e) => Err(ProcessError::SignalFailed {
            pid,
            reason: e.to_string(),
        }),
    }
}

/// Deliver a signal using the privilege command
fn elevated_signal(
    pid: u32,
    signal: Signal,
    privilege_command: &[String],
) -> Result<(), ProcessError> {
    let signal_name = signal.as_str().trim_start_matches("SIG");
    let mut command = Command::new(&privilege_command[0]);
    command.args(&privilege_command[1..]);
    if prompts_for_password(&privilege_command[0]) {
        // Never block shutdown on a password prompt
        command.arg("-n");
    }

    let status = command
        .args(["kill", "-s", signal_name, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| ProcessError::ElevationFailed {
            pid,
            reason: e.to_string(),
        })?;

    // kill exits non-zero when the target vanished in the meantime
    if status.success() || !is_process_alive(pid) {
        Ok(())
    } else {
        Err(ProcessError::ElevationFailed {
            pid,
            reason: format!("kill exited with {}", status),
        })
    }
}

/// Whether the privilege program supports `-n` (non-interactive)
fn prompts_for_password(program: &str) -> bool {
    let name = std::path::Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program);
    matches!(name, "sudo" | "doas")
}

/// Signal every process in a list, logging failures
///
/// Returns the number of processes that could not be signaled.
pub fn signal_all(pids: &[u32], signal: Signal, privilege_command: &[String]) -> usize {
    let mut failures = 0;
    for &pid in pids {
        if let Err(e) = signal_process(pid, signal, privilege_command) {
            warn!("{}", e);
            failures += 1;
        }
    }
    failures
}
