//! Append-only log destination
//!
//! The same file receives raw OpenVPN output lines written verbatim and
//! the diagnostic records of the tracing file layer.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

/// Default log file name inside the temporary directory
const DEFAULT_LOG_FILE_NAME: &str = "tunnelbar.log";

/// Shared handle to the log file
#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl LogSink {
    /// Open (or create) a log file in append mode
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Default log path used when neither the CLI nor the settings name one
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(DEFAULT_LOG_FILE_NAME)
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, adding the trailing newline
    pub fn append_line(&self, line: &str) -> io::Result<()> {
        let mut file = self.lock();
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Writer handed out to the tracing file layer
pub struct LogSinkWriter<'a>(MutexGuard<'a, File>);

impl Write for LogSinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogSinkWriter(self.lock())
    }
}
