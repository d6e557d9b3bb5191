/// File organization system for moving files into category directories.
///
/// This module provides the [`Relocator`], which moves a single file into its
/// category directory, and the [`FileOrganizer`], which runs a whole organize
/// pass: list the root, classify every regular file, move it and back it up.
/// A failure on one file is recorded in the [`OrganizeReport`] and the pass
/// continues with the next file.
use crate::activity::ActivitySink;
use crate::backup::{BackupManager, PruneReport};
use crate::config::CompiledFilters;
use crate::file_category::{ClassifiedFile, Classifier, OTHERS_CATEGORY};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while moving, copying or pruning files.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The path vanished or never existed.
    #[error("Path not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The process may not read or write the path.
    #[error("Permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a category or mirror directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to move a file to its category directory.
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to copy a file into the backup tree.
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The directory to organize does not exist or is not a directory.
    #[error("Invalid base path {}: not an existing directory", .path.display())]
    InvalidBasePath { path: PathBuf },

    /// Only regular files can be relocated.
    #[error("{} is not a regular file", .path.display())]
    NotAFile { path: PathBuf },

    /// A backed up file must live under the organized root.
    #[error("{} is not inside {}", .path.display(), .root.display())]
    NotUnderRoot { path: PathBuf, root: PathBuf },
}

impl OrganizeError {
    /// Wraps an I/O error, keeping not-found and permission errors distinct.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Records a single file move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The original path of the file before organization.
    pub original_path: PathBuf,
    /// The new path of the file after organization.
    pub new_path: PathBuf,
    /// The category the file was moved to.
    pub category: String,
}

/// Moves files into `destination_root/<category>/`.
///
/// A file already present under the same name is replaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relocator;

impl Relocator {
    /// Moves `source` into its category directory and records the operation.
    ///
    /// The category directory is created if it doesn't exist. The file is
    /// renamed, not copied, so it disappears from its original location.
    ///
    /// # Errors
    ///
    /// * `NotFound` if `source` does not exist (also when it vanished after listing)
    /// * `NotAFile` if `source` is a directory
    /// * `DirectoryCreationFailed` or `MoveFailed` on any other I/O failure
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::activity::MemoryActivityLog;
    /// use dirsort::file_organizer::Relocator;
    /// use std::path::Path;
    ///
    /// let log = MemoryActivityLog::new();
    /// let op = Relocator
    ///     .relocate(Path::new("/in/a.txt"), Path::new("/out"), "Text Files", &log)
    ///     .expect("move failed");
    /// assert_eq!(op.new_path, Path::new("/out/Text Files/a.txt"));
    /// ```
    pub fn relocate(
        &self,
        source: &Path,
        destination_root: &Path,
        category: &str,
        activity: &dyn ActivitySink,
    ) -> OrganizeResult<Operation> {
        let metadata = fs::metadata(source).map_err(|e| OrganizeError::io(source, e))?;
        if metadata.is_dir() {
            return Err(OrganizeError::NotAFile {
                path: source.to_path_buf(),
            });
        }

        let category_path = destination_root.join(category);
        fs::create_dir_all(&category_path).map_err(|e| {
            OrganizeError::DirectoryCreationFailed {
                path: category_path.clone(),
                source: e,
            }
        })?;

        let file_name = source
            .file_name()
            .ok_or_else(|| OrganizeError::MoveFailed {
                from: source.to_path_buf(),
                to: category_path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "file has no name component"),
            })?;

        let destination_path = category_path.join(file_name);
        if destination_path.exists() {
            warn!(path = %destination_path.display(), "overwriting existing file");
        }

        fs::rename(source, &destination_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound if !source.exists() => OrganizeError::NotFound {
                path: source.to_path_buf(),
            },
            _ => OrganizeError::MoveFailed {
                from: source.to_path_buf(),
                to: destination_path.clone(),
                source: e,
            },
        })?;

        debug!(from = %source.display(), to = %destination_path.display(), "moved file");
        activity.record(&format!(
            "Moved {} to {}",
            file_name.to_string_lossy(),
            destination_path.display()
        ));

        Ok(Operation {
            original_path: source.to_path_buf(),
            new_path: destination_path,
            category: category.to_string(),
        })
    }
}

/// Which step of a file's processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Relocate,
    Backup,
}

/// A file that could not be fully processed.
#[derive(Debug)]
pub struct FileFailure {
    /// The path the failing step operated on.
    pub path: PathBuf,
    pub stage: Stage,
    pub error: OrganizeError,
}

/// A file that was moved and backed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub operation: Operation,
    pub backup_path: PathBuf,
}

/// Result of a whole organize pass.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    pub outcomes: Vec<FileOutcome>,
    pub failures: Vec<FileFailure>,
}

impl OrganizeReport {
    /// Returns true if every discovered file was moved and backed up.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of files processed successfully per category.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *counts
                .entry(outcome.operation.category.clone())
                .or_insert(0) += 1;
        }
        counts
    }
}

/// Runs classify → relocate → backup over every regular file of a directory.
pub struct FileOrganizer {
    classifier: Classifier,
    relocator: Relocator,
    backups: BackupManager,
    filters: CompiledFilters,
}

impl FileOrganizer {
    pub fn new(
        classifier: Classifier,
        relocator: Relocator,
        backups: BackupManager,
        filters: CompiledFilters,
    ) -> Self {
        Self {
            classifier,
            relocator,
            backups,
            filters,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Lists and classifies the regular files directly inside `root`.
    ///
    /// Directories (including category directories from earlier runs) and
    /// files rejected by the filters are skipped. The result is sorted by path.
    pub fn plan(&self, root: &Path) -> OrganizeResult<Vec<ClassifiedFile>> {
        if !root.is_dir() {
            return Err(OrganizeError::InvalidBasePath {
                path: root.to_path_buf(),
            });
        }

        let entries = fs::read_dir(root).map_err(|e| OrganizeError::io(root, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OrganizeError::io(root, e))?;
            if let Ok(file_type) = entry.file_type()
                && file_type.is_file()
            {
                let path = entry.path();
                if self.filters.should_include(&path) {
                    files.push(self.classifier.classify_path(&path));
                } else {
                    debug!(path = %path.display(), "excluded by filters");
                }
            }
        }

        files.sort_by(|a, b| a.source.cmp(&b.source));
        Ok(files)
    }

    /// Creates one directory per catalog category plus `Others`.
    ///
    /// Every directory is attempted; the ones that could not be created are
    /// returned. Files bound for such a category fail individually when they
    /// are relocated.
    pub fn prepare_layout(&self, organized_root: &Path) -> Vec<OrganizeError> {
        self.classifier
            .catalog()
            .category_names()
            .into_iter()
            .chain(std::iter::once(OTHERS_CATEGORY))
            .filter_map(|name| {
                let path = organized_root.join(name);
                fs::create_dir_all(&path)
                    .err()
                    .map(|e| OrganizeError::DirectoryCreationFailed { path, source: e })
            })
            .collect()
    }

    /// Organizes every regular file in `root` into `organized_root`.
    pub fn organize(
        &self,
        root: &Path,
        organized_root: &Path,
        activity: &dyn ActivitySink,
    ) -> OrganizeResult<OrganizeReport> {
        let files = self.plan(root)?;
        Ok(self.organize_files(files, organized_root, activity, |_| {}))
    }

    /// Runs a complete pass: organize everything, then prune stale backups.
    ///
    /// Pruning starts only after every file has been moved and backed up, so
    /// it never races with a copy from the same pass.
    pub fn run(
        &self,
        root: &Path,
        organized_root: &Path,
        activity: &dyn ActivitySink,
    ) -> OrganizeResult<(OrganizeReport, PruneReport)> {
        let report = self.organize(root, organized_root, activity)?;
        let pruned = self.backups.prune_stale(activity)?;
        Ok((report, pruned))
    }

    /// Moves and backs up already classified files.
    ///
    /// Each file is processed on its own: a failure is recorded in the report
    /// and the pass moves on. A failed backup does not undo the move.
    /// `on_file` is called after each file, successful or not.
    pub fn organize_files<F>(
        &self,
        files: Vec<ClassifiedFile>,
        organized_root: &Path,
        activity: &dyn ActivitySink,
        mut on_file: F,
    ) -> OrganizeReport
    where
        F: FnMut(&ClassifiedFile),
    {
        for error in self.prepare_layout(organized_root) {
            warn!(%error, "could not prepare category directory");
        }

        let mut report = OrganizeReport::default();
        for file in &files {
            match self.process_file(file, organized_root, activity) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(failure) => {
                    warn!(
                        path = %failure.path.display(),
                        error = %failure.error,
                        "could not organize file"
                    );
                    report.failures.push(failure);
                }
            }
            on_file(file);
        }

        info!(
            moved = report.outcomes.len(),
            failed = report.failures.len(),
            "organize pass finished"
        );
        report
    }

    fn process_file(
        &self,
        file: &ClassifiedFile,
        organized_root: &Path,
        activity: &dyn ActivitySink,
    ) -> Result<FileOutcome, FileFailure> {
        let operation = self
            .relocator
            .relocate(&file.source, organized_root, &file.category, activity)
            .map_err(|error| FileFailure {
                path: file.source.clone(),
                stage: Stage::Relocate,
                error,
            })?;

        let backup_path = self
            .backups
            .backup(&operation.new_path, organized_root, activity)
            .map_err(|error| FileFailure {
                path: operation.new_path.clone(),
                stage: Stage::Backup,
                error,
            })?;

        Ok(FileOutcome {
            operation,
            backup_path,
        })
    }
}
