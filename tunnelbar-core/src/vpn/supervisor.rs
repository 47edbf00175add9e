//! OpenVPN process supervisor
//!
//! Spawns OpenVPN, follows its output on a dedicated reader thread and owns
//! the child process until it is terminated and reaped.

use crate::config::ovpn::validate_profile;
use crate::config::Settings;
use crate::error::{ProcessError, StartupError};
use crate::log_sink::LogSink;
use crate::vpn::process::{descendant_pids, is_process_alive, signal_all};
use crate::vpn::{ConnectionStatus, OutputEvent, OutputParser, SharedStatus};
use crate::OUTPUT_TARGET;
use nix::sys::signal::Signal;
use std::io::{self, BufRead, BufReader, PipeReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Channel the supervisor publishes status changes on
pub type StatusSender = mpsc::UnboundedSender<ConnectionStatus>;

/// Directories searched when the binary is not on PATH
///
/// OpenVPN commonly lives in an sbin directory a regular user's PATH lacks.
const SBIN_DIRS: &str = "/usr/local/sbin:/usr/sbin:/sbin:/opt/homebrew/sbin";

/// How often exit status is polled while waiting for the child
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Child handle plus its exit status once reaped
#[derive(Debug, Default)]
struct ProcessSlot {
    child: Option<Child>,
    exit: Option<ExitStatus>,
}

impl ProcessSlot {
    fn record_exit(&mut self, status: ExitStatus) {
        self.exit = Some(status);
        self.child = None;
    }

    /// Non-blocking check for the child's exit, reaping it if it exited
    fn poll_exit(&mut self) -> io::Result<Option<ExitStatus>> {
        if let Some(status) = self.exit {
            return Ok(Some(status));
        }

        let status = match self.child.as_mut() {
            Some(child) => child.try_wait()?,
            None => None,
        };

        if let Some(status) = status {
            self.record_exit(status);
        }
        Ok(status)
    }
}

/// State shared between the supervisor and its threads
struct Shared {
    slot: Mutex<ProcessSlot>,
    status: SharedStatus,
    updates: StatusSender,
    stop_requested: AtomicBool,
    cancel_watchdog: Mutex<Option<std_mpsc::Sender<()>>>,
    privilege_command: Vec<String>,
    stop_grace: Duration,
    echo_output: bool,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, ProcessSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, status: ConnectionStatus) {
        info!("VPN status: {}", status);
        // The receiver is gone once the UI has shut down
        let _ = self.updates.send(status);
    }

    fn publish(&self, next: ConnectionStatus) {
        if self.status.transition(next.clone()) {
            self.notify(next);
        }
    }

    /// Status to report once the child has exited
    fn exit_status_to_status(&self, exit: Option<ExitStatus>) -> ConnectionStatus {
        if self.stop_requested.load(Ordering::SeqCst) {
            return ConnectionStatus::Disconnected;
        }

        match exit {
            Some(status) if status.success() => ConnectionStatus::Disconnected,
            Some(status) => ConnectionStatus::Failed(format!("openvpn {}", status)),
            None => ConnectionStatus::Failed("openvpn exit status unavailable".to_string()),
        }
    }

    /// Block until the child has exited, without holding the slot lock
    fn wait_for_exit(&self) -> Option<ExitStatus> {
        loop {
            {
                let mut slot = self.lock_slot();
                match slot.poll_exit() {
                    Ok(Some(status)) => return Some(status),
                    Ok(None) if slot.child.is_none() => return None,
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Failed to query OpenVPN exit status: {}", e);
                        return None;
                    }
                }
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    /// Terminate the child and its descendants, then reap it
    ///
    /// A no-op once the child has been reaped.
    fn terminate(&self) {
        let mut slot = self.lock_slot();
        match slot.poll_exit() {
            Ok(Some(status)) => {
                debug!("OpenVPN already exited with {}", status);
                return;
            }
            Ok(None) => {}
            Err(e) => debug!("Failed to query OpenVPN exit status: {}", e),
        }

        let Some(mut child) = slot.child.take() else {
            return;
        };

        let pid = child.id();
        // Collected up front: once the sudo wrapper exits its children are
        // reparented and no longer found under it
        let mut descendants = descendant_pids(pid);
        info!("Stopping OpenVPN process {}", pid);
        let mut targets = vec![pid];
        targets.extend(&descendants);
        self.signal_pids(&targets, Signal::SIGTERM);

        let mut exit = None;
        if !wait_for_tree(&mut child, &mut exit, &descendants, self.stop_grace) {
            let mut survivors: Vec<u32> = match exit {
                Some(_) => vec![],
                None => vec![pid],
            };
            survivors.extend(descendants.iter().copied().filter(|&p| is_process_alive(p)));

            // Children started after SIGTERM, e.g. by a shell ignoring it
            for parent in survivors.clone() {
                for late in descendant_pids(parent) {
                    if late != pid && !descendants.contains(&late) {
                        descendants.push(late);
                        survivors.push(late);
                    }
                }
            }

            warn!(
                "OpenVPN did not exit within {:?}, sending SIGKILL",
                self.stop_grace
            );
            self.signal_pids(&survivors, Signal::SIGKILL);
            wait_for_tree(&mut child, &mut exit, &descendants, self.stop_grace);
        }

        match exit {
            Some(status) => {
                debug!("OpenVPN process {} reaped with {}", pid, status);
                slot.record_exit(status);
                for &stuck in descendants.iter().filter(|&&p| is_process_alive(p)) {
                    warn!("{}", ProcessError::UnresponsiveProcess { pid: stuck });
                }
                info!("VPN connection stopped");
            }
            None => {
                warn!("{}", ProcessError::UnresponsiveProcess { pid });
                slot.child = Some(child);
            }
        }
    }

    fn signal_pids(&self, targets: &[u32], signal: Signal) {
        debug!("Sending {} to {:?}", signal, targets);

        let failures = signal_all(targets, signal, &self.privilege_command);
        if failures > 0 {
            debug!("{} of {} processes could not be signaled", failures, targets.len());
        }
    }
}

/// Poll until the child is reaped and none of `descendants` is alive
///
/// `exit` receives the child's status as soon as it is reaped. Returns false
/// when the deadline passes first.
fn wait_for_tree(
    child: &mut Child,
    exit: &mut Option<ExitStatus>,
    descendants: &[u32],
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if exit.is_none() {
            match child.try_wait() {
                Ok(status) => *exit = status,
                Err(e) => debug!("Failed to query OpenVPN exit status: {}", e),
            }
        }

        if exit.is_some() && !descendants.iter().any(|&p| is_process_alive(p)) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

/// Resolve an executable on PATH, then in the sbin directories
fn resolve_program(program: &str) -> Result<PathBuf, StartupError> {
    which::which(program)
        .or_else(|_| {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
            which::which_in(program, Some(SBIN_DIRS), cwd)
        })
        .map_err(|_| StartupError::BinaryNotFound {
            program: program.to_string(),
        })
}

/// Spawn OpenVPN with stdout and stderr merged into one pipe
///
/// The Command holds write ends of the pipe; it is dropped before returning
/// so end-of-stream arrives as soon as the child tree closes its copies.
fn spawn_child(
    config_path: &Path,
    settings: &Settings,
) -> Result<(Child, PipeReader), StartupError> {
    let binary = resolve_program(&settings.binary)?;

    let mut command = match settings.privilege_command.split_first() {
        Some((elevate, elevate_args)) => {
            let mut command = Command::new(resolve_program(elevate)?);
            command.args(elevate_args).arg(&binary);
            command
        }
        None => Command::new(&binary),
    };
    command.args(&settings.extra_args).arg(config_path);

    let spawn_error = |e: io::Error| StartupError::SpawnFailed {
        reason: format!("{}: {}", binary.display(), e),
    };

    let (reader, writer) = io::pipe().map_err(spawn_error)?;
    let stderr_writer = writer.try_clone().map_err(spawn_error)?;
    command.stdout(writer).stderr(stderr_writer);

    debug!("Spawning {:?}", command);
    let child = command.spawn().map_err(spawn_error)?;
    drop(command);

    Ok((child, reader))
}

/// Supervisor of one OpenVPN process
pub struct Supervisor {
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Validate the profile, spawn OpenVPN and start following its output
    ///
    /// On error no child process exists. On success the status is
    /// `Connecting` and has already been sent on `updates`.
    pub fn start(
        config_path: &Path,
        settings: &Settings,
        sink: LogSink,
        updates: StatusSender,
    ) -> Result<Self, StartupError> {
        validate_profile(config_path)?;

        let (child, output) = spawn_child(config_path, settings)?;
        let pid = child.id();
        info!(
            "OpenVPN started with PID {} using {}",
            pid,
            config_path.display()
        );

        let shared = Arc::new(Shared {
            slot: Mutex::new(ProcessSlot {
                child: Some(child),
                exit: None,
            }),
            status: SharedStatus::new(),
            updates,
            stop_requested: AtomicBool::new(false),
            cancel_watchdog: Mutex::new(None),
            privilege_command: settings.privilege_command.clone(),
            stop_grace: settings.stop_grace(),
            echo_output: settings.echo_output,
        });
        shared.notify(ConnectionStatus::Connecting);

        let reader_shared = Arc::clone(&shared);
        let reader = thread::Builder::new()
            .name("openvpn-reader".to_string())
            .spawn(move || read_output(reader_shared, output, sink))
            .map_err(|e| {
                shared.terminate();
                StartupError::SpawnFailed {
                    reason: format!("Failed to start output reader: {}", e),
                }
            })?;

        if let Some(timeout) = settings.connect_timeout() {
            let (cancel, cancelled) = std_mpsc::channel();
            let watchdog_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name("openvpn-watchdog".to_string())
                .spawn(move || watch_connect_timeout(watchdog_shared, timeout, cancelled));

            match spawned {
                Ok(_) => {
                    *shared
                        .cancel_watchdog
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(cancel);
                }
                Err(e) => warn!("Connect timeout disabled, failed to start watchdog: {}", e),
            }
        }

        Ok(Self {
            shared,
            reader: Some(reader),
        })
    }

    /// Current status
    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.get()
    }

    /// PID of the direct child while it is running
    pub fn pid(&self) -> Option<u32> {
        self.shared.lock_slot().child.as_ref().map(Child::id)
    }

    /// Terminate OpenVPN
    ///
    /// Idempotent: once the child is gone this does nothing. Termination
    /// errors are logged, never returned.
    pub fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        // Dropping the sender wakes the watchdog
        self.shared
            .cancel_watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.shared.terminate();
    }

    /// Wait for the reader thread to finish and return the final status
    pub fn wait(&mut self) -> ConnectionStatus {
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("OpenVPN output reader panicked");
            }
        }
        self.status()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reader thread body
fn read_output(shared: Arc<Shared>, output: PipeReader, sink: LogSink) {
    let parser = OutputParser::new();
    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
                handle_line(&shared, &parser, &sink, line);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Failed to read OpenVPN output: {}", e);
                break;
            }
        }
    }

    debug!("OpenVPN output closed, waiting for exit");
    let exit = shared.wait_for_exit();
    if let Some(status) = exit {
        info!("OpenVPN exited with {}", status);
    }
    shared.publish(shared.exit_status_to_status(exit));
}

fn handle_line(shared: &Shared, parser: &OutputParser, sink: &LogSink, line: &str) {
    match parser.parse_line(line) {
        OutputEvent::AddressAssigned { ip } => {
            info!("VPN IP address assigned: {}", ip);
            shared.publish(ConnectionStatus::Connected(ip));
        }
        OutputEvent::Notable { line } => {
            info!(target: OUTPUT_TARGET, "{}", line);
            append_raw(shared, sink, &line);
        }
        OutputEvent::Output { line } => {
            debug!(target: OUTPUT_TARGET, "{}", line);
            append_raw(shared, sink, &line);
        }
    }
}

fn append_raw(shared: &Shared, sink: &LogSink, line: &str) {
    if let Err(e) = sink.append_line(line) {
        warn!("Failed to write to {}: {}", sink.path().display(), e);
    }

    if shared.echo_output {
        // stdout may be closed when started from a desktop launcher
        let _ = writeln!(io::stdout().lock(), "{}", line);
    }
}

/// Watchdog thread body
fn watch_connect_timeout(
    shared: Arc<Shared>,
    timeout: Duration,
    cancelled: std_mpsc::Receiver<()>,
) {
    if cancelled.recv_timeout(timeout) != Err(std_mpsc::RecvTimeoutError::Timeout) {
        return;
    }

    let failed = ConnectionStatus::Failed(format!(
        "no address assigned within {}s",
        timeout.as_secs()
    ));
    if shared
        .status
        .transition_from(&ConnectionStatus::Connecting, failed.clone())
    {
        warn!("OpenVPN did not report an address within {:?}", timeout);
        shared.notify(failed);
        shared.terminate();
    }
}
