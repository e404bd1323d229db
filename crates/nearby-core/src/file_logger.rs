//! Buffered, append-only text log kept next to the parameter file.
//!
//! Lines are mirrored to `tracing` as they are recorded and only hit the disk
//! on [`FileLogger::flush`], so a run writes its log in one append.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;

use crate::error::StorageError;
use crate::storage::StorageDir;

const LOG_SUFFIX: &str = "-logs.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct FileLogger {
    storage: StorageDir,
    name: String,
    lines: Mutex<Vec<String>>,
}

impl FileLogger {
    pub fn new(storage: StorageDir, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.storage.file_path(&self.name, LOG_SUFFIX)
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.push(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.push(LogLevel::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.push(LogLevel::Error, message.as_ref());
    }

    fn push(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.lines
            .lock()
            .push(format!("[{}] {} {}", timestamp, level, message));
    }

    /// Buffered lines not yet written.
    pub fn pending(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Append buffered lines to `<storage>/<name>-logs.txt` and clear the buffer.
    ///
    /// Returns `Ok(None)` when there was nothing to write.
    ///
    /// # Errors
    /// Fails when the storage folder or the log path is unusable, or on IO errors.
    /// The buffer is kept on failure.
    pub fn flush(&self) -> Result<Option<PathBuf>, StorageError> {
        let mut lines = self.lines.lock();
        if lines.is_empty() {
            return Ok(None);
        }

        self.storage.ensure()?;
        let path = self.path();
        if path.is_dir() {
            return Err(StorageError::IsADirectory(path));
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        for line in lines.iter() {
            writeln!(file, "{}", line)?;
        }

        lines.clear();
        Ok(Some(path))
    }
}
