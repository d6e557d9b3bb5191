//! Settings and file filtering configuration.
//!
//! Settings are loaded from a TOML file and cover where files are organized,
//! where backups and logs go, how long backups are kept, and which files the
//! organizer and observer should leave alone. The category table itself is
//! built in and not part of the file.
//!
//! # Configuration File Format
//!
//! ```toml
//! root = "/home/user/Downloads"
//! organized_root = "/home/user/Sorted"   # defaults to `root`
//! backup_root = "Backup_folder"
//! retention_days = 7
//! activity_log = "ExtensionData.log"
//! record_log = "FileLogs.csv"
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use crate::backup::DEFAULT_RETENTION;
use crate::file_category::{ExtensionCatalog, OTHERS_CATEGORY};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".dirsortrc.toml";

/// Errors that can occur during configuration loading and filtering.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax, structure or values.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Everything a run needs to know besides the category table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory whose files get organized and observed.
    pub root: PathBuf,
    /// Where category directories are created. `None` means `root`.
    pub organized_root: Option<PathBuf>,
    /// Root of the backup mirror.
    pub backup_root: PathBuf,
    /// Backups older than this many days are pruned.
    pub retention_days: u64,
    /// Operational `timestamp--message` log.
    pub activity_log: PathBuf,
    /// CSV log of observed file records.
    pub record_log: PathBuf,
    pub filters: FilterRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            organized_root: None,
            backup_root: PathBuf::from("Backup_folder"),
            retention_days: DEFAULT_RETENTION.as_secs() / 86_400,
            activity_log: PathBuf::from("ExtensionData.log"),
            record_log: PathBuf::from("FileLogs.csv"),
            filters: FilterRules::default(),
        }
    }
}

impl Settings {
    /// Load settings from a file, with fallback to defaults.
    ///
    /// Attempts to load settings in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.dirsortrc.toml` in the current directory
    /// 3. Look for `~/.config/dirsort/config.toml` in home directory
    /// 4. Fall back to default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found but cannot be read, parsed or
    /// validated, or if an explicitly provided file does not exist.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values that would make a run unsafe.
    ///
    /// A zero-day retention would prune backups as soon as they are written.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_days == 0 {
            return Err(ConfigError::ConfigInvalid(
                "retention_days must be at least 1".to_string(),
            ));
        }
        let organized = resolve_path(&self.organized_root());
        let backup = resolve_path(&self.backup_root);
        if organized.starts_with(&backup) {
            return Err(ConfigError::ConfigInvalid(format!(
                "organized root {} must not be inside backup_root {}",
                organized.display(),
                backup.display()
            )));
        }

        let categories = ExtensionCatalog::standard();
        let names = categories
            .category_names()
            .into_iter()
            .chain(std::iter::once(OTHERS_CATEGORY));
        for name in names {
            let category_dir = organized.join(name);
            if backup.starts_with(&category_dir) {
                return Err(ConfigError::ConfigInvalid(format!(
                    "backup_root {} must not be inside category directory {}",
                    backup.display(),
                    category_dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Directory that receives the category subdirectories.
    pub fn organized_root(&self) -> PathBuf {
        self.organized_root
            .clone()
            .unwrap_or_else(|| self.root.clone())
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(86_400))
    }

    /// Compiles the filter rules, always excluding the tool's own logs and
    /// its local settings file.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        let mut rules = self.filters.clone();
        rules.exclude.filenames.push(LOCAL_CONFIG_FILE.to_string());
        for log in [&self.activity_log, &self.record_log] {
            if let Some(name) = log.file_name() {
                rules
                    .exclude
                    .filenames
                    .push(name.to_string_lossy().into_owned());
            }
        }
        CompiledFilters::new(rules)
    }
}

/// Makes `path` absolute and resolves symlinks and `..` for the part of it
/// that exists. Missing trailing components are appended unchanged.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return absolute.clone(),
        }
    }
}

/// Rules deciding which files are considered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files (starting with "."). Defaults to true.
    #[serde(default = "default_enable_hidden_files")]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: default_enable_hidden_files(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

fn default_enable_hidden_files() -> bool {
    true
}

/// Rules for excluding files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, with or without the leading dot.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Compiled filter rules, ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
        };
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Filters that let every file through.
    pub fn allow_all() -> Self {
        Self {
            enable_hidden_files: true,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }

    /// Check if a file should be considered (not excluded).
    ///
    /// Include patterns win over everything else. Otherwise hidden files,
    /// exact names, extensions, glob patterns and regexes are checked in that
    /// order, and anything not excluded is included.
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_any(&self.include_patterns, file_path, &file_name) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.matches_any(&self.exclude_patterns, file_path, &file_name) {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }

    /// Patterns are tried against the full path and the bare file name, so
    /// `*.part` matches regardless of where the directory lives.
    fn matches_any(&self, patterns: &[Pattern], file_path: &Path, file_name: &str) -> bool {
        patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path) || pattern.matches(file_name))
    }
}

impl Default for CompiledFilters {
    fn default() -> Self {
        // Default rules contain no patterns, so compiling cannot fail.
        Self::new(FilterRules::default()).unwrap_or_else(|_| Self::allow_all())
    }
}
