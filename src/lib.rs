//! dirsort - sort files into category folders by extension
//!
//! This library classifies files by extension, moves them into per-category
//! directories, mirrors every moved file into a backup tree that is pruned
//! after a retention window, and records file metadata for size and age
//! reports.

pub mod activity;
pub mod backup;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod observer;
pub mod output;
pub mod report;

pub use activity::{ActivitySink, FileActivityLog, MemoryActivityLog};
pub use backup::{BackupManager, DEFAULT_RETENTION, PruneReport};
pub use config::{CompiledFilters, ConfigError, FilterRules, Settings};
pub use file_category::{Classifier, ExtensionCatalog, OTHERS_CATEGORY};
pub use file_organizer::{FileOrganizer, OrganizeError, OrganizeReport, OrganizeResult, Relocator};
pub use observer::{FileObserver, FileRecord, RecordError, RecordLog};

pub use cli::{Cli, Command, run_cli};
