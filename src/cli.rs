//! Command-line interface module for dirsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and settings overrides
//! - Organization orchestration (organize → back up → prune)
//! - Standalone pruning
//! - File observation and reporting

use crate::activity::FileActivityLog;
use crate::backup::BackupManager;
use crate::config::Settings;
use crate::file_category::Classifier;
use crate::file_organizer::{FileOrganizer, Relocator};
use crate::observer::{FileObserver, FileRecord, RecordLog};
use crate::output::OutputFormatter;
use crate::report;
use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Sort files by extension, keep time-bounded backups, and report on sizes.
#[derive(Debug, Parser)]
#[command(name = "dirsort", version, about)]
pub struct Cli {
    /// Path to a TOML settings file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase diagnostic output (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move files into category folders, back them up, then prune old backups.
    Organize(OrganizeArgs),
    /// Delete backups older than the retention window.
    Prune(PruneArgs),
    /// Append a record for every file in a directory to the record log.
    Observe(ObserveArgs),
    /// Summarize the record log by extension.
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// Directory to organize.
    pub root: Option<PathBuf>,

    /// Where to create category folders (defaults to the organized directory).
    #[arg(long)]
    pub organized_root: Option<PathBuf>,

    #[command(flatten)]
    pub backup: BackupArgs,

    /// Show what would be moved without touching any file.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Root of the backup mirror.
    #[arg(long)]
    pub backup_root: Option<PathBuf>,

    /// Days a backup is kept before it is pruned.
    #[arg(long)]
    pub retention_days: Option<u64>,

    /// Operational log file.
    #[arg(long)]
    pub activity_log: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PruneArgs {
    #[command(flatten)]
    pub backup: BackupArgs,
}

#[derive(Debug, Args)]
pub struct ObserveArgs {
    /// Directory to observe.
    pub root: Option<PathBuf>,

    /// Record log to append to.
    #[arg(long)]
    pub log: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Record log to read.
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Print the summary as JSON instead of a chart.
    #[arg(long)]
    pub json: bool,

    /// Width of the chart bars.
    #[arg(long, default_value_t = 40)]
    pub width: usize,
}

impl BackupArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.backup_root {
            settings.backup_root = path.clone();
        }
        if let Some(days) = self.retention_days {
            settings.retention_days = days;
        }
        if let Some(path) = &self.activity_log {
            settings.activity_log = path.clone();
        }
    }
}

/// Runs the CLI application.
///
/// Settings are loaded first (see [`Settings::load`]), then overridden by
/// whatever the command line specifies.
///
/// # Errors
///
/// Returns an error if the settings are invalid, a command fails outright,
/// or an organize pass could not process every file.
pub fn run_cli(cli: Cli) -> Result<()> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Error loading configuration")?;

    match cli.command {
        Command::Organize(args) => {
            if let Some(root) = args.root {
                settings.root = root;
            }
            if let Some(organized_root) = args.organized_root {
                settings.organized_root = Some(organized_root);
            }
            args.backup.apply(&mut settings);
            settings.validate()?;

            if args.dry_run {
                organize_directory_dry_run(&settings)
            } else {
                organize_directory(&settings)
            }
        }
        Command::Prune(args) => {
            args.backup.apply(&mut settings);
            settings.validate()?;
            prune_backups(&settings)
        }
        Command::Observe(args) => {
            if let Some(root) = args.root {
                settings.root = root;
            }
            if let Some(log) = args.log {
                settings.record_log = log;
            }
            observe_directory(&settings)
        }
        Command::Report(args) => {
            if let Some(log) = args.log {
                settings.record_log = log;
            }
            show_report(&settings, args.json, args.width)
        }
    }
}

fn build_organizer(settings: &Settings) -> Result<FileOrganizer> {
    let filters = settings
        .compile_filters()
        .context("Error compiling filters")?;
    let backups = BackupManager::new(settings.backup_root.clone(), settings.retention());

    Ok(FileOrganizer::new(
        Classifier::default(),
        Relocator,
        backups,
        filters,
    ))
}

fn open_activity_log(settings: &Settings) -> Result<FileActivityLog> {
    FileActivityLog::open(&settings.activity_log).with_context(|| {
        format!(
            "Error opening activity log {}",
            settings.activity_log.display()
        )
    })
}

/// Organizes the root, then prunes stale backups once every file is done.
///
/// Files that fail are reported and skipped; the command still fails at the
/// end so the exit status reflects the partial result.
pub fn organize_directory(settings: &Settings) -> Result<()> {
    OutputFormatter::info(&format!(
        "Organizing contents of: {}",
        settings.root.display()
    ));

    let organizer = build_organizer(settings)?;
    let activity = open_activity_log(settings)?;
    let organized_root = settings.organized_root();

    let files = organizer.plan(&settings.root)?;
    if files.is_empty() {
        OutputFormatter::plain("No files found to organize.");
    }

    let pb = OutputFormatter::create_progress_bar(files.len() as u64);
    let report = organizer.organize_files(files, &organized_root, &activity, |file| {
        let name = file
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(name);
        pb.inc(1);
    });
    pb.finish_and_clear();

    OutputFormatter::failures(&report.failures);
    OutputFormatter::summary_table(&report.category_counts(), report.outcomes.len());

    let pruned = organizer.backups().prune_stale(&activity)?;
    OutputFormatter::pruned(&pruned, organizer.backups().backup_root());

    activity.flush().context("Error flushing activity log")?;

    if !report.is_complete_success() {
        bail!(
            "{} file(s) could not be organized. Please review errors above.",
            report.failures.len()
        );
    }
    OutputFormatter::success("Organization complete!");
    Ok(())
}

/// Shows where each file would go without moving anything.
pub fn organize_directory_dry_run(settings: &Settings) -> Result<()> {
    OutputFormatter::dry_run_notice(&format!(
        "Analyzing contents of: {}",
        settings.root.display()
    ));

    let organizer = build_organizer(settings)?;
    let files = organizer.plan(&settings.root)?;
    if files.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return Ok(());
    }

    let organized_root = settings.organized_root();
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    for file in &files {
        let name = file
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        OutputFormatter::plain(&format!(" - {}", name));
        OutputFormatter::plain(&format!(
            "   → Would move to {}",
            organized_root.join(&file.category).join(&name).display()
        ));
        *category_counts.entry(file.category.clone()).or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&category_counts, files.len());
    OutputFormatter::dry_run_notice("No files were modified.");
    Ok(())
}

/// Deletes backups older than the retention window.
pub fn prune_backups(settings: &Settings) -> Result<()> {
    let backups = BackupManager::new(settings.backup_root.clone(), settings.retention());
    let activity = open_activity_log(settings)?;

    let report = backups.prune_stale(&activity)?;
    activity.flush().context("Error flushing activity log")?;

    OutputFormatter::pruned(&report, backups.backup_root());
    Ok(())
}

/// Appends one record per file in the root to the record log.
pub fn observe_directory(settings: &Settings) -> Result<()> {
    let filters = settings
        .compile_filters()
        .context("Error compiling filters")?;
    let observer = FileObserver::new(filters);

    let records = observer
        .observe(&settings.root)?
        .collect::<Result<Vec<FileRecord>, _>>()?;
    let written = RecordLog::new(settings.record_log.clone()).append(records)?;

    OutputFormatter::success(&format!(
        "Recorded {} file(s) from {} in {}",
        written,
        settings.root.display(),
        settings.record_log.display()
    ));
    Ok(())
}

/// Reads the record log and prints the size distribution and file ages.
pub fn show_report(settings: &Settings, as_json: bool, width: usize) -> Result<()> {
    let records = RecordLog::new(settings.record_log.clone()).read()?;
    let summary = report::summarize(&records);
    let ages = report::file_age(&records);

    if as_json {
        let value = json!({
            "summary": summary,
            "age": ages,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if records.is_empty() {
        OutputFormatter::warning(&format!(
            "No records found in {}",
            settings.record_log.display()
        ));
        return Ok(());
    }

    OutputFormatter::plain(&report::render_chart(&summary, width));
    OutputFormatter::header("FILES BY DATE");
    for bucket in &ages {
        OutputFormatter::plain(&format!(
            "{}  {:<10} {}",
            bucket.date, bucket.ext, bucket.count
        ));
    }
    Ok(())
}
