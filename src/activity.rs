//! Operational activity log.
//!
//! Components that change the filesystem report what they did through an
//! [`ActivitySink`] handed to them by the caller. The file-backed sink writes
//! one `YYYY-mm-dd HH:MM:SS--message` line per event and is meant to be opened
//! once per process and flushed before exit.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Timestamp layout used for every activity line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Receives human-readable activity messages.
pub trait ActivitySink {
    fn record(&self, message: &str);
}

/// Formats a single activity line without the trailing newline.
pub fn format_line(timestamp: &chrono::DateTime<Local>, message: &str) -> String {
    format!("{}--{}", timestamp.format(TIMESTAMP_FORMAT), message)
}

/// Append-only activity log backed by a file.
pub struct FileActivityLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileActivityLog {
    /// Opens (or creates) the log file in append mode.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered lines to disk.
    pub fn flush(&self) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        writer.flush()
    }
}

impl ActivitySink for FileActivityLog {
    fn record(&self, message: &str) {
        let line = format_line(&Local::now(), message);
        let mut writer = self.writer.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = writeln!(writer, "{}", line) {
            // Reported only; the caller keeps going.
            warn!(path = %self.path.display(), error = %e, "failed to write activity log");
        }
    }
}

impl Drop for FileActivityLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush activity log");
        }
    }
}

/// Keeps activity messages in memory.
#[derive(Debug, Default)]
pub struct MemoryActivityLog {
    messages: Mutex<Vec<String>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl ActivitySink for MemoryActivityLog {
    fn record(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(message.to_string());
    }
}
