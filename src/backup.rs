//! Backup mirror with a retention window.
//!
//! Every organized file is copied into a backup tree whose layout mirrors the
//! organized root, e.g. `<organized>/Text Files/a.txt` is copied to
//! `<backup>/Text Files/a.txt`. [`BackupManager::prune_stale`] later deletes
//! backup files older than the retention window. Directories are never
//! removed, even when a prune leaves them empty.
//!
//! Pruning walks the tree without any locking. It must only run after an
//! organize pass has fully completed, never while one is copying into the
//! same tree.

use crate::activity::ActivitySink;
use crate::file_organizer::{OrganizeError, OrganizeResult};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Backups older than this are pruned unless configured otherwise.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 86_400);

/// Returns the filesystem timestamp used to age a backup entry.
///
/// This is the creation (birth) time where the platform reports one, and the
/// modification time otherwise.
pub fn entry_timestamp(metadata: &Metadata) -> io::Result<SystemTime> {
    metadata.created().or_else(|_| metadata.modified())
}

/// Outcome of a prune sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    /// Backup files deleted by the sweep.
    pub removed: Vec<PathBuf>,
    /// Number of backup files still within the retention window.
    pub kept: usize,
}

/// Owns the backup tree: copies organized files into it and prunes it.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_root: PathBuf,
    retention: Duration,
}

impl BackupManager {
    pub fn new(backup_root: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            backup_root: backup_root.into(),
            retention,
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Returns where `destination` is mirrored in the backup tree.
    pub fn mirror_path(&self, destination: &Path, organized_root: &Path) -> OrganizeResult<PathBuf> {
        let relative = destination
            .strip_prefix(organized_root)
            .map_err(|_| OrganizeError::NotUnderRoot {
                path: destination.to_path_buf(),
                root: organized_root.to_path_buf(),
            })?;
        Ok(self.backup_root.join(relative))
    }

    /// Copies an organized file to its mirrored location in the backup tree.
    ///
    /// The original stays in place. An older backup with the same relative
    /// path is replaced, and the new entry starts a fresh retention window.
    pub fn backup(
        &self,
        destination: &Path,
        organized_root: &Path,
        activity: &dyn ActivitySink,
    ) -> OrganizeResult<PathBuf> {
        let backup_path = self.mirror_path(destination, organized_root)?;

        if let Some(parent) = backup_path.parent() {
            fs::create_dir_all(parent).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        // Copying over an existing file would keep its old creation time.
        if backup_path.is_file() {
            fs::remove_file(&backup_path).map_err(|e| OrganizeError::io(&backup_path, e))?;
        }

        fs::copy(destination, &backup_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound if !destination.exists() => OrganizeError::NotFound {
                path: destination.to_path_buf(),
            },
            _ => OrganizeError::CopyFailed {
                from: destination.to_path_buf(),
                to: backup_path.clone(),
                source: e,
            },
        })?;

        debug!(from = %destination.display(), to = %backup_path.display(), "backed up file");
        activity.record(&format!(
            "Backed up {} to {}",
            display_name(destination),
            backup_path.display()
        ));
        Ok(backup_path)
    }

    /// Deletes backup files older than the retention window, as of now.
    pub fn prune_stale(&self, activity: &dyn ActivitySink) -> OrganizeResult<PruneReport> {
        self.prune_stale_at(SystemTime::now(), activity)
    }

    /// Deletes every backup file whose age at `now` exceeds the retention window.
    ///
    /// A file is removed only when `now - timestamp > retention`. Files with a
    /// timestamp in the future count as brand new. A missing backup root is
    /// treated as an empty tree.
    pub fn prune_stale_at(
        &self,
        now: SystemTime,
        activity: &dyn ActivitySink,
    ) -> OrganizeResult<PruneReport> {
        let mut report = PruneReport::default();
        if !self.backup_root.exists() {
            debug!(root = %self.backup_root.display(), "no backup tree to prune");
            return Ok(report);
        }

        for entry in WalkDir::new(&self.backup_root) {
            let entry = entry.map_err(walk_error)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let metadata = entry.metadata().map_err(walk_error)?;
            let created = entry_timestamp(&metadata).map_err(|e| OrganizeError::io(path, e))?;
            let age = now.duration_since(created).unwrap_or(Duration::ZERO);

            if age > self.retention {
                fs::remove_file(path).map_err(|e| OrganizeError::io(path, e))?;
                info!(path = %path.display(), age_secs = age.as_secs(), "deleted old backup file");
                activity.record(&format!(
                    "{} has been deleted from backup",
                    display_name(path)
                ));
                report.removed.push(path.to_path_buf());
            } else {
                report.kept += 1;
            }
        }

        Ok(report)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn walk_error(err: walkdir::Error) -> OrganizeError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    OrganizeError::io(path, io::Error::from(err))
}
