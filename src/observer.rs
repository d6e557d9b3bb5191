//! File observation and the record log.
//!
//! [`FileObserver`] walks the top level of a directory and yields one
//! [`FileRecord`] per regular file. Records are appended to a CSV log as
//! `filename,size,extension,date` lines without a header, and read back with
//! a strict parser: a single malformed row fails the whole read.

use crate::config::CompiledFilters;
use crate::file_category::extension_of;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::debug;

/// Layout of the `Date` column, e.g. `Mon Oct  5 14:03:09 2026`.
pub const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Errors raised while observing files or reading/writing the record log.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A row of the record log does not have the expected four columns.
    #[error("Malformed record on line {line}: {reason}")]
    Parse { line: u64, reason: String },

    #[error("Failed to write record log {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl RecordError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One observed file.
///
/// Serialized column names match the report's column headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "ext")]
    pub extension: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl FileRecord {
    /// Builds a record from a file's metadata.
    pub fn from_path(path: &Path) -> Result<Self, RecordError> {
        let metadata = fs::metadata(path).map_err(|e| RecordError::io(path, e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(|e| RecordError::io(path, e))?;

        Ok(Self {
            extension: extension_of(&filename).to_string(),
            filename,
            size: metadata.len(),
            date: format_timestamp(created),
        })
    }
}

/// Formats a filesystem timestamp in local time using [`DATE_FORMAT`].
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(DATE_FORMAT).to_string()
}

/// Emits file records for the top level of a directory.
#[derive(Debug, Clone, Default)]
pub struct FileObserver {
    filters: CompiledFilters,
}

impl FileObserver {
    pub fn new(filters: CompiledFilters) -> Self {
        Self { filters }
    }

    /// Lazily yields a record for each regular file directly inside `root`.
    ///
    /// Subdirectories are not descended into. Every call re-reads the
    /// directory; nothing is cached between calls.
    pub fn observe<'a>(
        &'a self,
        root: &Path,
    ) -> Result<impl Iterator<Item = Result<FileRecord, RecordError>> + 'a, RecordError> {
        let entries = fs::read_dir(root).map_err(|e| RecordError::io(root, e))?;
        let root = root.to_path_buf();

        Ok(entries.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(RecordError::io(&root, e))),
            };
            let path = entry.path();
            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => {}
                _ => return None,
            }
            if !self.filters.should_include(&path) {
                debug!(path = %path.display(), "excluded by filters");
                return None;
            }
            Some(FileRecord::from_path(&path))
        }))
    }
}

/// Append-only CSV log of file records.
#[derive(Debug, Clone)]
pub struct RecordLog {
    path: PathBuf,
}

impl RecordLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends records, creating the log if needed. Returns how many were written.
    pub fn append<I>(&self, records: I) -> Result<usize, RecordError>
    where
        I: IntoIterator<Item = FileRecord>,
    {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| RecordError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RecordError::io(&self.path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let mut written = 0;
        for record in records {
            writer.serialize(&record).map_err(|e| RecordError::Write {
                path: self.path.clone(),
                source: e,
            })?;
            written += 1;
        }
        writer.flush().map_err(|e| RecordError::io(&self.path, e))?;

        debug!(path = %self.path.display(), written, "appended file records");
        Ok(written)
    }

    /// Reads every record in the log, in file order.
    ///
    /// A missing log reads as empty.
    pub fn read(&self) -> Result<Vec<FileRecord>, RecordError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .map_err(|e| RecordError::io(&self.path, io::Error::from(e)))?;

        reader
            .deserialize::<FileRecord>()
            .map(|row| row.map_err(parse_error))
            .collect()
    }
}

fn parse_error(err: csv::Error) -> RecordError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    RecordError::Parse {
        line,
        reason: err.to_string(),
    }
}
