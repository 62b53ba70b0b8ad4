//! Cascading deletion use-cases.
//!
//! # Responsibility
//! - Preview what a deletion would remove (`check`).
//! - Run preview, confirmation, backup and delete as one flow (`delete`).
//! - Apply the same flow to a list of targets (`delete_many`).
//!
//! # Invariants
//! - `check` only reads; it never opens a write transaction.
//! - Nothing is deleted unless the target resolves and, when confirmation is
//!   requested, the operator typed the exact accepted answer.
//! - Deletes run in one `BEGIN IMMEDIATE` transaction on a fresh session.

use crate::backup::OperationBackups;
use crate::console::{confirm, Confirmation, Console};
use crate::db::{DbError, SessionFactory};
use crate::model::deletion::{
    BatchItem, BatchReport, DeleteOptions, DeletionOutcome, DeletionPreview, DeletionReport,
    TableCount,
};
use crate::model::records::TargetRecord;
use crate::model::target::DeletionTarget;
use crate::repo::cascade_repo::{CascadePlan, SqliteCascadeRepository};
use crate::repo::lookup_repo::SqliteLookupRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::backup_with_notice;
use crate::service::report::{render_deletion, render_preview};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::time::Instant;

const BATCH_CONFIRMATION: Confirmation = Confirmation::Exact("DELETE_ALL");

pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

/// Service error for deletion and schema-change use-cases.
#[derive(Debug)]
pub enum MaintenanceError {
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Operator console could not be read or written.
    Console(io::Error),
    /// Request is well-formed but cannot be applied to the current data.
    InvalidRequest(String),
}

impl Display for MaintenanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Console(err) => write!(f, "console error: {err}"),
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
        }
    }
}

impl Error for MaintenanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Console(err) => Some(err),
            Self::InvalidRequest(_) => None,
        }
    }
}

impl From<RepoError> for MaintenanceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for MaintenanceError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for MaintenanceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<io::Error> for MaintenanceError {
    fn from(value: io::Error) -> Self {
        Self::Console(value)
    }
}

/// Deletion and schema-change operations over one database.
pub struct MaintenanceService<C: Console> {
    pub(super) sessions: SessionFactory,
    pub(super) backups: Option<OperationBackups>,
    pub(super) console: C,
}

impl<C: Console> MaintenanceService<C> {
    /// Service without backups; see [`Self::with_backups`].
    pub fn new(sessions: SessionFactory, console: C) -> Self {
        Self {
            sessions,
            backups: None,
            console,
        }
    }

    pub fn with_backups(mut self, backups: OperationBackups) -> Self {
        self.backups = Some(backups);
        self
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Previews the cascade for `target` and prints the summary.
    ///
    /// Returns `None` (after printing a message) when the target does not
    /// resolve.
    pub fn check(&mut self, target: &DeletionTarget) -> MaintenanceResult<Option<DeletionPreview>> {
        let conn = self.sessions.open()?;
        let Some(preview) = preview_target(&conn, target)? else {
            self.say_not_found(target);
            return Ok(None);
        };
        self.say_lines(render_preview(&preview));
        Ok(Some(preview))
    }

    /// Deletes `target` and everything that depends on it.
    ///
    /// # Errors
    /// - `Console` when the confirmation prompt cannot be read.
    /// - `Repo` for storage failures; the transaction is rolled back.
    pub fn delete(
        &mut self,
        target: &DeletionTarget,
        options: DeleteOptions,
    ) -> MaintenanceResult<DeletionOutcome> {
        let started_at = Instant::now();
        let kind = target.kind();
        let Some(preview) = self.check(target)? else {
            info!(
                "event=delete module=service status=not_found kind={}",
                kind.slug()
            );
            return Ok(DeletionOutcome::NotFound);
        };

        if options.confirm {
            self.console.say("");
            self.console.say(&format!(
                "WARNING: This will permanently delete {}.",
                kind.warning()
            ));
            let question = format!("Confirm deletion of {}", preview.target.subject());
            if !confirm(&mut self.console, &question, kind.confirmation())? {
                self.console.say("Deletion cancelled.");
                info!(
                    "event=delete module=service status=cancelled kind={} key={}",
                    kind.slug(),
                    preview.target.key_slug()
                );
                return Ok(DeletionOutcome::Cancelled);
            }
        }

        let backup_path = if options.backup {
            self.take_backup(&format!(
                "delete_{}_{}",
                kind.slug(),
                preview.target.key_slug()
            ))
        } else {
            None
        };

        let mut conn = self.sessions.open()?;
        let Some(deleted) = delete_in_transaction(&mut conn, target)? else {
            self.say_not_found(target);
            return Ok(DeletionOutcome::NotFound);
        };

        let deleted_records = deleted.iter().map(|entry| entry.count).sum();
        let report = DeletionReport {
            preview,
            deleted,
            deleted_records,
            backup_path,
        };
        info!(
            "event=delete module=service status=ok kind={} key={} deleted={} duration_ms={}",
            kind.slug(),
            report.preview.target.key_slug(),
            report.deleted_records,
            started_at.elapsed().as_millis()
        );
        self.say_lines(render_deletion(&report));
        Ok(DeletionOutcome::Deleted(report))
    }

    /// Deletes several targets behind one confirmation.
    ///
    /// Missing targets are skipped. Without `confirm_each` the operator
    /// confirms the whole batch once with `DELETE_ALL` and a single backup
    /// is taken; with it, every target goes through its own prompt and
    /// backup. A failing target is recorded and the batch continues.
    pub fn delete_many(
        &mut self,
        targets: &[DeletionTarget],
        confirm_each: bool,
    ) -> MaintenanceResult<BatchReport> {
        let mut report = BatchReport::default();
        let mut found: Vec<(&DeletionTarget, DeletionPreview)> = Vec::new();
        {
            let conn = self.sessions.open()?;
            for target in targets {
                match preview_target(&conn, target)? {
                    Some(preview) => found.push((target, preview)),
                    None => {
                        self.console
                            .say(&format!("Skipping {target}: not found"));
                        report.skipped.push(target.to_string());
                    }
                }
            }
        }

        if found.is_empty() {
            self.console.say("Nothing to delete.");
            return Ok(report);
        }

        report.previewed_records = found.iter().map(|(_, p)| p.total_records).sum();
        self.console.say("=== BATCH DELETION OVERVIEW ===");
        for (_, preview) in &found {
            self.console.say(&format!(
                "  {}: {} records",
                preview.target.subject(),
                preview.total_records
            ));
        }
        self.console.say("");
        self.console
            .say(&format!("TOTAL RECORDS: {}", report.previewed_records));

        let mut options = DeleteOptions {
            confirm: true,
            backup: true,
        };
        if !confirm_each {
            let question = format!("Delete all {} targets listed above", found.len());
            if !confirm(&mut self.console, &question, BATCH_CONFIRMATION)? {
                self.console.say("Batch deletion cancelled.");
                report.cancelled = true;
                return Ok(report);
            }
            self.take_backup(&format!("delete_many_{}", found.len()));
            options = DeleteOptions {
                confirm: false,
                backup: false,
            };
        }

        for (target, _) in found {
            let item = match self.delete(target, options) {
                Ok(outcome) => {
                    if outcome.is_deleted() {
                        report.succeeded += 1;
                    }
                    BatchItem {
                        target: target.to_string(),
                        outcome: Some(outcome),
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(
                        "event=delete_many module=service status=item_error kind={} error={err}",
                        target.kind().slug()
                    );
                    self.console
                        .say(&format!("Failed to delete {target}: {err}"));
                    report.failed += 1;
                    BatchItem {
                        target: target.to_string(),
                        outcome: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            report.items.push(item);
        }

        self.console.say(&format!(
            "Batch complete: {} deleted, {} failed, {} skipped",
            report.succeeded,
            report.failed,
            report.skipped.len()
        ));
        Ok(report)
    }

    pub(super) fn take_backup(&mut self, operation: &str) -> Option<PathBuf> {
        backup_with_notice(self.backups.as_ref(), &mut self.console, operation)
    }

    pub(super) fn say_lines(&mut self, lines: Vec<String>) {
        for line in lines {
            self.console.say(&line);
        }
    }

    fn say_not_found(&mut self, target: &DeletionTarget) {
        self.console.say(&format!("Not found: {target}"));
    }
}

/// Resolves `target` and counts its cascade on `conn`. Read-only.
pub fn preview_target(
    conn: &Connection,
    target: &DeletionTarget,
) -> RepoResult<Option<DeletionPreview>> {
    let Some(record) = SqliteLookupRepository::new(conn).resolve(target)? else {
        return Ok(None);
    };
    preview_record(conn, record).map(Some)
}

fn preview_record(conn: &Connection, record: TargetRecord) -> RepoResult<DeletionPreview> {
    let plan = CascadePlan::for_record(&record);
    let data_counts = SqliteCascadeRepository::new(conn).count(&plan)?;
    let affected_projects = match &record {
        TargetRecord::Schema(schema) => {
            SqliteLookupRepository::new(conn).projects_using_schema(schema.id)?
        }
        _ => Vec::new(),
    };
    let total_records = data_counts.iter().map(|entry| entry.count).sum::<u64>() + 1;
    Ok(DeletionPreview {
        target: record,
        data_counts,
        affected_projects,
        total_records,
    })
}

/// Re-resolves and deletes `target` in one immediate transaction.
///
/// Returns `None` when the target vanished since the preview.
fn delete_in_transaction(
    conn: &mut Connection,
    target: &DeletionTarget,
) -> RepoResult<Option<Vec<TableCount>>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let Some(record) = SqliteLookupRepository::new(&tx).resolve(target)? else {
        return Ok(None);
    };
    let plan = CascadePlan::for_record(&record);
    let deleted = SqliteCascadeRepository::new(&tx).execute(&plan)?;
    tx.commit()?;
    Ok(Some(deleted))
}
