//! Best-effort pre-operation backups.
//!
//! # Responsibility
//! - Define the `BackupCreator` seam used before destructive operations.
//! - Name backups after the operation and rotate old files.
//!
//! # Invariants
//! - A failed backup never fails the operation; it is logged and reported
//!   as `None`.
//! - Rotation only touches `backup_*.db` / `backup_*.db.gz` files.

use crate::config::AdminConfig;
use chrono::Local;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

mod sqlite;

pub use sqlite::SqliteBackup;

static UNSAFE_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid operation-name regex"));
static ROTATED_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^backup_.+\.db(\.gz)?$").expect("valid backup-file regex"));

/// Writes a copy of the database to `output_file`.
///
/// Returns `true` only when a usable backup was written.
pub trait BackupCreator {
    fn create_backup(&self, output_file: &Path, compress: bool, schema_only: bool) -> bool;
}

/// Operation-scoped backups in one directory.
pub struct OperationBackups {
    creator: Box<dyn BackupCreator>,
    dir: PathBuf,
    max_backups: usize,
    compress: bool,
}

impl OperationBackups {
    pub fn new(
        creator: Box<dyn BackupCreator>,
        dir: impl Into<PathBuf>,
        max_backups: usize,
        compress: bool,
    ) -> Self {
        Self {
            creator,
            dir: dir.into(),
            max_backups: max_backups.max(1),
            compress,
        }
    }

    /// SQLite file backups of the configured database.
    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(
            Box::new(SqliteBackup::new(&config.database_path)),
            &config.backup_dir,
            config.max_backups,
            config.compress_backups,
        )
    }

    /// Backs up the whole database before `operation`.
    ///
    /// Returns the backup path, or `None` when the backup could not be made.
    /// Existing backups are never overwritten.
    pub fn create(&self, operation: &str) -> Option<PathBuf> {
        self.create_at(operation, &backup_timestamp())
    }

    fn create_at(&self, operation: &str, timestamp: &str) -> Option<PathBuf> {
        let operation = sanitize_operation(operation);
        if let Err(err) = fs::create_dir_all(&self.dir) {
            warn!(
                "event=backup_create module=backup status=error op={operation} error_code=backup_dir_failed error={err}"
            );
            return None;
        }

        let path = unused_backup_path(&self.dir, &operation, timestamp, self.compress);

        if !self.creator.create_backup(&path, self.compress, false) {
            warn!(
                "event=backup_create module=backup status=error op={operation} error_code=backup_failed path={}",
                path.display()
            );
            return None;
        }

        info!(
            "event=backup_create module=backup status=ok op={operation} path={}",
            path.display()
        );
        let removed = rotate_backups(&self.dir, self.max_backups);
        if removed > 0 {
            info!("event=backup_rotate module=backup status=ok removed={removed}");
        }
        Some(path)
    }
}

/// `backup_before_<op>_<YYYYmmdd_HHMMSS>.db[.gz]`
pub fn backup_file_name(operation: &str, compress: bool) -> String {
    file_name_at(operation, &backup_timestamp(), 0, compress)
}

fn backup_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sequence `0` has no suffix; later ones append `_<n>` before the extension.
fn file_name_at(operation: &str, timestamp: &str, sequence: usize, compress: bool) -> String {
    let extension = if compress { "db.gz" } else { "db" };
    let suffix = if sequence == 0 {
        String::new()
    } else {
        format!("_{sequence}")
    };
    format!(
        "backup_before_{}_{timestamp}{suffix}.{extension}",
        sanitize_operation(operation)
    )
}

fn unused_backup_path(dir: &Path, operation: &str, timestamp: &str, compress: bool) -> PathBuf {
    let mut sequence = 0;
    loop {
        let path = dir.join(file_name_at(operation, timestamp, sequence, compress));
        if !path.exists() {
            return path;
        }
        sequence += 1;
    }
}

fn sanitize_operation(operation: &str) -> String {
    let cleaned = UNSAFE_NAME_CHARS.replace_all(operation.trim(), "_");
    if cleaned.is_empty() {
        "operation".to_string()
    } else {
        cleaned.into_owned()
    }
}

/// Keeps the newest `max_backups` rotated files in `dir`; returns how many
/// were removed.
pub fn rotate_backups(dir: &Path, max_backups: usize) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("event=backup_rotate module=backup status=error error_code=read_dir_failed error={err}");
            return 0;
        }
    };

    let mut backups: Vec<(SystemTime, String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            if !ROTATED_FILE.is_match(&name) {
                return None;
            }
            let modified = entry.metadata().and_then(|meta| meta.modified()).ok()?;
            Some((modified, name, entry.path()))
        })
        .collect();
    if backups.len() <= max_backups {
        return 0;
    }

    backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    let mut removed = 0;
    for (_, name, path) in backups.into_iter().skip(max_backups) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(err) => warn!(
                "event=backup_rotate module=backup status=error file={name} error_code=remove_failed error={err}"
            ),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeCreator {
        succeed: bool,
        calls: std::rc::Rc<Cell<usize>>,
    }

    impl BackupCreator for FakeCreator {
        fn create_backup(&self, output_file: &Path, _compress: bool, _schema_only: bool) -> bool {
            self.calls.set(self.calls.get() + 1);
            if self.succeed {
                fs::write(output_file, b"backup").unwrap();
            }
            self.succeed
        }
    }

    #[test]
    fn file_names_are_sanitized_and_timestamped() {
        let name = backup_file_name("delete project/3 'Alpha'", false);
        assert!(name.starts_with("backup_before_delete_project_3_Alpha__"), "{name}");
        assert!(name.ends_with(".db"));
        assert!(ROTATED_FILE.is_match(&name));
        assert!(backup_file_name("x", true).ends_with(".db.gz"));
    }

    #[test]
    fn failed_backup_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let calls = std::rc::Rc::new(Cell::new(0));
        let backups = OperationBackups::new(
            Box::new(FakeCreator {
                succeed: false,
                calls: calls.clone(),
            }),
            dir.path(),
            3,
            false,
        );
        assert_eq!(backups.create("delete_project_1"), None);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn same_second_backups_keep_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let calls = std::rc::Rc::new(Cell::new(0));
        let creator = |succeed| {
            Box::new(FakeCreator {
                succeed,
                calls: calls.clone(),
            })
        };
        let working = OperationBackups::new(creator(true), dir.path(), 10, false);
        let failing = OperationBackups::new(creator(false), dir.path(), 10, false);

        let first = working.create_at("delete_project_1", "20260101_120000").unwrap();
        let second = working.create_at("delete_project_1", "20260101_120000").unwrap();
        assert_ne!(first, second);
        assert!(second
            .to_string_lossy()
            .ends_with("backup_before_delete_project_1_20260101_120000_1.db"));
        assert!(ROTATED_FILE.is_match(&second.file_name().unwrap().to_string_lossy()));

        assert_eq!(failing.create_at("delete_project_1", "20260101_120000"), None);
        assert!(first.exists());
        assert!(second.exists());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn rotation_keeps_newest_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        for idx in 0..5 {
            fs::write(dir.path().join(format!("backup_before_op_2024010{idx}_000000.db")), b"x")
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        assert_eq!(rotate_backups(dir.path(), 2), 3);
        let mut left: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(left.len(), 3);
        assert!(left.contains(&"notes.txt".to_string()));
    }
}
