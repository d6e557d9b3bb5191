use dirsort::activity::MemoryActivityLog;
use dirsort::backup::{BackupManager, DEFAULT_RETENTION, entry_timestamp};
use dirsort::config::CompiledFilters;
use dirsort::file_category::{Classifier, ExtensionCatalog, OTHERS_CATEGORY};
use dirsort::file_organizer::{FileOrganizer, OrganizeError, Relocator, Stage};
use dirsort::observer::{FileObserver, RecordLog};
use dirsort::{Cli, run_cli};
use clap::Parser;
/// Integration tests for dirsort
///
/// These tests exercise complete workflows on temporary directories:
/// 1. Organize passes (classification, moves, backups)
/// 2. Backup retention and pruning
/// 3. Observation and the record log
/// 4. The command-line entry points
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const DAY: Duration = Duration::from_secs(86_400);

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary workspace with separate input, backup and log locations.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("inbox")).expect("Failed to create inbox");
        TestFixture { temp_dir }
    }

    /// Directory whose files get organized.
    fn root(&self) -> PathBuf {
        self.temp_dir.path().join("inbox")
    }

    fn backup_root(&self) -> PathBuf {
        self.temp_dir.path().join("Backup_folder")
    }

    fn workspace(&self) -> &Path {
        self.temp_dir.path()
    }

    fn create_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    fn organizer(&self) -> FileOrganizer {
        FileOrganizer::new(
            Classifier::default(),
            Relocator,
            BackupManager::new(self.backup_root(), DEFAULT_RETENTION),
            CompiledFilters::default(),
        )
    }

    fn assert_file_exists(&self, path: &Path) {
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, path: &Path) {
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    /// Writes an empty settings file so tests never pick up a user config.
    fn empty_config(&self) -> PathBuf {
        let path = self.workspace().join("settings.toml");
        fs::write(&path, "").expect("Failed to write settings");
        path
    }

    /// Runs the CLI with an isolated config and activity log.
    fn run(&self, args: &[&str]) -> anyhow::Result<()> {
        let config = self.empty_config();
        let mut argv: Vec<String> = vec!["dirsort".to_string()];
        argv.extend(args.iter().map(|a| a.to_string()));
        argv.push("--config".to_string());
        argv.push(config.to_string_lossy().into_owned());
        let cli = Cli::try_parse_from(argv).expect("Failed to parse arguments");
        run_cli(cli)
    }

    fn path_arg(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }
}

fn timestamp_of(path: &Path) -> SystemTime {
    let metadata = fs::metadata(path).expect("Failed to stat file");
    entry_timestamp(&metadata).expect("Failed to read timestamp")
}

// ============================================================================
// Test Suite 1: Organize passes
// ============================================================================

#[test]
fn test_known_and_unknown_extensions_scenario() {
    let fixture = TestFixture::new();
    let a = fixture.create_file("a.txt", b"0123456789");
    let b = fixture.create_file("b.unknownext", b"12345");
    let log = MemoryActivityLog::new();

    let report = fixture
        .organizer()
        .organize(&fixture.root(), &fixture.root(), &log)
        .expect("Organize failed");

    assert!(report.is_complete_success());
    assert_eq!(report.outcomes.len(), 2);

    let organized_a = fixture.root().join("Text Files").join("a.txt");
    let organized_b = fixture.root().join("Others").join("b.unknownext");
    fixture.assert_file_exists(&organized_a);
    fixture.assert_file_exists(&organized_b);
    fixture.assert_file_not_exists(&a);
    fixture.assert_file_not_exists(&b);

    let backup_a = fixture.backup_root().join("Text Files").join("a.txt");
    let backup_b = fixture.backup_root().join("Others").join("b.unknownext");
    assert_eq!(fs::read(&backup_a).unwrap(), b"0123456789");
    assert_eq!(fs::read(&backup_b).unwrap(), b"12345");
}

#[test]
fn test_every_known_extension_lands_in_its_category() {
    let fixture = TestFixture::new();
    let catalog = ExtensionCatalog::standard();
    let mut expected = Vec::new();
    for category in catalog.categories() {
        for (ext, _) in category.extensions() {
            let name = format!("sample{}", ext);
            fixture.create_file(&name, ext.as_bytes());
            expected.push((category.name().to_string(), name));
        }
    }

    let report = fixture
        .organizer()
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Organize failed");
    assert_eq!(report.outcomes.len(), expected.len());

    for (category, name) in expected {
        let organized = fixture.root().join(&category).join(&name);
        let backup = fixture.backup_root().join(&category).join(&name);
        fixture.assert_file_exists(&organized);
        fixture.assert_file_not_exists(&fixture.root().join(&name));
        assert_eq!(fs::read(&organized).unwrap(), fs::read(&backup).unwrap());
    }
}

#[test]
fn test_uppercase_extensions_are_classified() {
    let fixture = TestFixture::new();
    fixture.create_file("HOLIDAY.JPG", b"jpg");

    fixture
        .organizer()
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Organize failed");

    fixture.assert_file_exists(&fixture.root().join("Image Files").join("HOLIDAY.JPG"));
}

#[test]
fn test_layout_is_prepared_for_every_category() {
    let fixture = TestFixture::new();

    let report = fixture
        .organizer()
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Organize failed");
    assert!(report.outcomes.is_empty());

    for name in ExtensionCatalog::standard().category_names() {
        assert!(fixture.root().join(name).is_dir(), "missing {}", name);
    }
    assert!(fixture.root().join(OTHERS_CATEGORY).is_dir());
}

#[test]
fn test_separate_organized_root() {
    let fixture = TestFixture::new();
    fixture.create_file("song.mp3", b"mp3");
    let organized_root = fixture.workspace().join("sorted");

    fixture
        .organizer()
        .organize(&fixture.root(), &organized_root, &MemoryActivityLog::new())
        .expect("Organize failed");

    fixture.assert_file_exists(&organized_root.join("Audio Files").join("song.mp3"));
    fixture.assert_file_exists(&fixture.backup_root().join("Audio Files").join("song.mp3"));
    assert!(!fixture.root().join("Audio Files").exists());
}

#[test]
fn test_directories_left_alone_and_hidden_files_organized() {
    let fixture = TestFixture::new();
    fs::create_dir(fixture.root().join("photos.zip")).unwrap();
    fixture.create_file(".hidden.txt", b"secret");
    fixture.create_file("visible.txt", b"hello");

    let report = fixture
        .organizer()
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Organize failed");

    assert_eq!(report.outcomes.len(), 2);
    assert!(fixture.root().join("photos.zip").is_dir());
    fixture.assert_file_not_exists(&fixture.root().join(".hidden.txt"));
    fixture.assert_file_exists(&fixture.root().join("Text Files").join(".hidden.txt"));
    fixture.assert_file_exists(&fixture.backup_root().join("Text Files").join(".hidden.txt"));
}

#[test]
fn test_default_settings_organize_dotfiles() {
    let fixture = TestFixture::new();
    fixture.create_file(".notes.txt", b"notes");
    let filters = dirsort::Settings::default()
        .compile_filters()
        .expect("Failed to compile filters");
    let organizer = FileOrganizer::new(
        Classifier::default(),
        Relocator,
        BackupManager::new(fixture.backup_root(), DEFAULT_RETENTION),
        filters,
    );

    let report = organizer
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Organize failed");

    assert_eq!(report.outcomes.len(), 1);
    fixture.assert_file_exists(&fixture.root().join("Text Files").join(".notes.txt"));
}

#[test]
fn test_second_pass_skips_category_directories() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"first");
    let organizer = fixture.organizer();

    organizer
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("First organize failed");
    let second = organizer
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Second organize failed");

    assert!(second.outcomes.is_empty());
    fixture.assert_file_exists(&fixture.root().join("Text Files").join("a.txt"));
}

#[test]
fn test_name_clash_replaces_existing_file() {
    let fixture = TestFixture::new();
    let text_dir = fixture.root().join("Text Files");
    fs::create_dir(&text_dir).unwrap();
    fs::write(text_dir.join("a.txt"), "old").unwrap();
    fixture.create_file("a.txt", b"new");

    let report = fixture
        .organizer()
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Organize failed");

    assert!(report.is_complete_success());
    assert_eq!(fs::read_to_string(text_dir.join("a.txt")).unwrap(), "new");
    assert_eq!(fs::read_dir(&text_dir).unwrap().count(), 1);
}

#[cfg(unix)]
#[test]
fn test_failure_on_one_file_does_not_stop_the_pass() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"text");
    fixture.create_file("b.png", b"png");
    fixture.create_file("c.zip", b"zip");

    // A directory occupying the destination name makes the move of a.txt fail.
    let blocker = fixture.root().join("Text Files").join("a.txt");
    fs::create_dir_all(&blocker).unwrap();

    let log = MemoryActivityLog::new();
    let report = fixture
        .organizer()
        .organize(&fixture.root(), &fixture.root(), &log)
        .expect("Organize failed");

    assert!(!report.is_complete_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, fixture.root().join("a.txt"));
    assert_eq!(report.failures[0].stage, Stage::Relocate);
    assert!(matches!(report.failures[0].error, OrganizeError::MoveFailed { .. }));

    assert_eq!(report.outcomes.len(), 2);
    fixture.assert_file_exists(&fixture.root().join("a.txt"));
    fixture.assert_file_exists(&fixture.root().join("Image Files").join("b.png"));
    fixture.assert_file_exists(&fixture.root().join("Compressed Files").join("c.zip"));
    assert!(blocker.is_dir());
    assert!(!fixture.backup_root().join("Text Files").join("a.txt").exists());
}

#[test]
fn test_vanished_file_is_recorded_and_others_continue() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"text");
    let gone = fixture.create_file("b.pdf", b"pdf");
    fixture.create_file("c.mp4", b"mp4");
    let organizer = fixture.organizer();

    let files = organizer.plan(&fixture.root()).expect("Plan failed");
    // Simulates the file disappearing between listing and moving.
    fs::remove_file(&gone).unwrap();

    let mut processed = 0;
    let report = organizer
        .organize_files(files, &fixture.root(), &MemoryActivityLog::new(), |_| {
            processed += 1
        });

    assert_eq!(processed, 3);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Relocate);
    assert_eq!(report.failures[0].path, gone);
    assert!(matches!(report.failures[0].error, OrganizeError::NotFound { .. }));
    fixture.assert_file_exists(&fixture.root().join("Video Files").join("c.mp4"));
}

#[test]
fn test_file_named_like_a_category_fails_alone() {
    let fixture = TestFixture::new();
    let blocker = fixture.create_file(OTHERS_CATEGORY, b"extensionless");
    fixture.create_file("a.txt", b"text");

    let report = fixture
        .organizer()
        .organize(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Organize failed");

    assert_eq!(report.outcomes.len(), 1);
    fixture.assert_file_exists(&fixture.root().join("Text Files").join("a.txt"));
    fixture.assert_file_not_exists(&fixture.root().join("a.txt"));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, blocker);
    assert_eq!(report.failures[0].stage, Stage::Relocate);
    assert!(matches!(
        report.failures[0].error,
        OrganizeError::DirectoryCreationFailed { .. }
    ));
    fixture.assert_file_exists(&blocker);
}

#[test]
fn test_organize_invalid_root() {
    let fixture = TestFixture::new();
    let result = fixture.organizer().organize(
        &fixture.workspace().join("missing"),
        &fixture.root(),
        &MemoryActivityLog::new(),
    );
    assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
}

// ============================================================================
// Test Suite 2: Backups and retention
// ============================================================================

#[test]
fn test_prune_runs_only_after_the_whole_pass() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    fixture.create_file("b.zip", b"b");
    fixture.create_file("c.unknownext", b"c");

    // A backup left over from an earlier run, already past retention by the
    // time of any later sweep.
    let old_dir = fixture.backup_root().join("Document Files");
    fs::create_dir_all(&old_dir).unwrap();
    fs::write(old_dir.join("old.pdf"), "old").unwrap();

    let log = MemoryActivityLog::new();
    let (report, pruned) = fixture
        .organizer()
        .run(&fixture.root(), &fixture.root(), &log)
        .expect("Run failed");

    assert_eq!(report.outcomes.len(), 3);
    // Fresh backups from this pass are all still there.
    for outcome in &report.outcomes {
        fixture.assert_file_exists(&outcome.backup_path);
    }
    assert!(pruned.kept >= 3);

    // No prune event is interleaved with the organize events.
    let messages = log.messages();
    let first_prune = messages
        .iter()
        .position(|m| m.ends_with("has been deleted from backup"))
        .unwrap_or(messages.len());
    let last_organize = messages
        .iter()
        .rposition(|m| m.starts_with("Moved ") || m.starts_with("Backed up "))
        .expect("organize events missing");
    assert!(last_organize < first_prune);
    assert_eq!(
        messages
            .iter()
            .filter(|m| m.starts_with("Moved "))
            .count(),
        3
    );
}

#[test]
fn test_stale_backup_pruned_and_directory_kept_scenario() {
    let fixture = TestFixture::new();
    let text_dir = fixture.backup_root().join("Text Files");
    fs::create_dir_all(&text_dir).unwrap();
    let entry = text_dir.join("a.txt");
    fs::write(&entry, "0123456789").unwrap();

    let manager = BackupManager::new(fixture.backup_root(), DEFAULT_RETENTION);
    let log = MemoryActivityLog::new();
    let now = timestamp_of(&entry) + 8 * DAY;

    let report = manager.prune_stale_at(now, &log).expect("Prune failed");

    assert_eq!(report.removed, vec![entry.clone()]);
    fixture.assert_file_not_exists(&entry);
    assert!(text_dir.is_dir());
    assert_eq!(log.messages().len(), 1);
}

#[test]
fn test_prune_at_creation_time_removes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    fixture.create_file("b.gif", b"b");
    let (report, _) = fixture
        .organizer()
        .run(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Run failed");

    let manager = BackupManager::new(fixture.backup_root(), DEFAULT_RETENTION);
    for outcome in &report.outcomes {
        let now = timestamp_of(&outcome.backup_path);
        let pruned = manager
            .prune_stale_at(now, &MemoryActivityLog::new())
            .expect("Prune failed");
        assert!(pruned.removed.is_empty());
    }
    for outcome in &report.outcomes {
        fixture.assert_file_exists(&outcome.backup_path);
    }
}

#[test]
fn test_prune_only_touches_the_backup_tree() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    let organizer = fixture.organizer();
    let (report, _) = organizer
        .run(&fixture.root(), &fixture.root(), &MemoryActivityLog::new())
        .expect("Run failed");

    let backup = &report.outcomes[0].backup_path;
    let far_future = timestamp_of(backup) + 365 * DAY;
    let pruned = organizer
        .backups()
        .prune_stale_at(far_future, &MemoryActivityLog::new())
        .expect("Prune failed");

    assert_eq!(pruned.removed, vec![backup.clone()]);
    fixture.assert_file_exists(&report.outcomes[0].operation.new_path);
}

// ============================================================================
// Test Suite 3: Observation and record log
// ============================================================================

#[test]
fn test_observe_log_round_trip() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"0123456789");
    fixture.create_file("b.unknownext", b"12345");
    fixture.create_file("README", b"read me");
    fs::create_dir(fixture.root().join("sub")).unwrap();

    let observer = FileObserver::default();
    let observed: Vec<_> = observer
        .observe(&fixture.root())
        .expect("Observe failed")
        .collect::<Result<_, _>>()
        .expect("Record failed");

    let log = RecordLog::new(fixture.workspace().join("FileLogs.csv"));
    log.append(observed.clone()).expect("Append failed");
    let read_back = log.read().expect("Read failed");

    let key = |r: &dirsort::FileRecord| (r.filename.clone(), r.size, r.extension.clone());
    let mut expected: Vec<_> = observed.iter().map(key).collect();
    let mut actual: Vec<_> = read_back.iter().map(key).collect();
    expected.sort();
    actual.sort();
    assert_eq!(actual, expected);
    assert!(actual.contains(&("README".to_string(), 7, String::new())));
}

#[test]
fn test_observer_skips_own_record_log() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"a");
    let settings = dirsort::Settings {
        root: fixture.root(),
        record_log: fixture.root().join("FileLogs.csv"),
        ..Default::default()
    };
    let observer = FileObserver::new(settings.compile_filters().unwrap());
    let log = RecordLog::new(settings.record_log.clone());

    for _ in 0..2 {
        let records: Vec<_> = observer
            .observe(&settings.root)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        log.append(records).unwrap();
    }

    let all = log.read().unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| r.filename == "a.txt"));
}

// ============================================================================
// Test Suite 4: Command-line entry points
// ============================================================================

#[test]
fn test_cli_organize_then_observe_and_report() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", b"0123456789");
    fixture.create_file("b.unknownext", b"12345");
    let activity_log = fixture.workspace().join("ExtensionData.log");
    let record_log = fixture.workspace().join("FileLogs.csv");

    fixture
        .run(&[
            "organize",
            &TestFixture::path_arg(&fixture.root()),
            "--backup-root",
            &TestFixture::path_arg(&fixture.backup_root()),
            "--activity-log",
            &TestFixture::path_arg(&activity_log),
        ])
        .expect("organize failed");

    fixture.assert_file_exists(&fixture.root().join("Text Files").join("a.txt"));
    fixture.assert_file_exists(&fixture.backup_root().join("Others").join("b.unknownext"));

    let activity = fs::read_to_string(&activity_log).unwrap();
    assert!(activity.lines().any(|l| l.contains("--Moved a.txt to ")));

    let text_dir = fixture.root().join("Text Files");
    fixture
        .run(&[
            "observe",
            &TestFixture::path_arg(&text_dir),
            "--log",
            &TestFixture::path_arg(&record_log),
        ])
        .expect("observe failed");
    let records = RecordLog::new(&record_log).read().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].filename, "a.txt");
    assert_eq!(records[0].size, 10);

    fixture
        .run(&["report", "--log", &TestFixture::path_arg(&record_log), "--json"])
        .expect("report failed");
}

#[test]
fn test_cli_dry_run_moves_nothing() {
    let fixture = TestFixture::new();
    let file = fixture.create_file("a.txt", b"a");
    let activity_log = fixture.workspace().join("ExtensionData.log");

    fixture
        .run(&[
            "organize",
            &TestFixture::path_arg(&fixture.root()),
            "--dry-run",
            "--backup-root",
            &TestFixture::path_arg(&fixture.backup_root()),
            "--activity-log",
            &TestFixture::path_arg(&activity_log),
        ])
        .expect("dry run failed");

    fixture.assert_file_exists(&file);
    assert!(!fixture.root().join("Text Files").exists());
    assert!(!fixture.backup_root().exists());
    assert!(!activity_log.exists());
}

#[test]
fn test_cli_rejects_zero_retention() {
    let fixture = TestFixture::new();
    let result = fixture.run(&[
        "prune",
        "--backup-root",
        &TestFixture::path_arg(&fixture.backup_root()),
        "--retention-days",
        "0",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_cli_prune_keeps_fresh_backups() {
    let fixture = TestFixture::new();
    let dir = fixture.backup_root().join("Text Files");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("fresh.txt"), "fresh").unwrap();

    fixture
        .run(&[
            "prune",
            "--backup-root",
            &TestFixture::path_arg(&fixture.backup_root()),
            "--activity-log",
            &TestFixture::path_arg(&fixture.workspace().join("ExtensionData.log")),
        ])
        .expect("prune failed");

    fixture.assert_file_exists(&dir.join("fresh.txt"));
}
