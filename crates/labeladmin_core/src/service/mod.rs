//! Maintenance use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into operator-facing operations.
//! - Own the preview, confirmation and backup steps around every write.

use crate::backup::OperationBackups;
use crate::console::Console;
use std::path::PathBuf;

pub mod edit_service;
pub mod maintenance_service;
pub mod report;
pub mod schema_service;

/// Takes a best-effort backup and tells the operator how it went.
///
/// `None` when backups are disabled or the backup failed.
pub(crate) fn backup_with_notice(
    backups: Option<&OperationBackups>,
    console: &mut dyn Console,
    operation: &str,
) -> Option<PathBuf> {
    let path = backups?.create(operation);
    match &path {
        Some(path) => console.say(&format!("Backup created: {}", path.display())),
        None => console.say("Backup failed; continuing without a backup."),
    }
    path
}
