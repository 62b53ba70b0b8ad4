//! Preview and outcome types for check/delete operations.

use crate::model::records::{NamedRecord, TargetRecord};
use serde::Serialize;
use std::path::PathBuf;

/// Rows one cascade step touches, keyed by a stable table label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub count: u64,
}

/// What a deletion would remove.
///
/// `total_records` is the sum of `data_counts` plus one for the root row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionPreview {
    pub target: TargetRecord,
    pub data_counts: Vec<TableCount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_projects: Vec<NamedRecord>,
    pub total_records: u64,
}

impl DeletionPreview {
    pub fn count_for(&self, table: &str) -> Option<u64> {
        self.data_counts
            .iter()
            .find(|entry| entry.table == table)
            .map(|entry| entry.count)
    }
}

/// Result of a completed deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub preview: DeletionPreview,
    /// Rows actually removed per table, root row included.
    pub deleted: Vec<TableCount>,
    pub deleted_records: u64,
    pub backup_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeletionOutcome {
    /// Target did not resolve; nothing was touched.
    NotFound,
    /// Operator declined the confirmation prompt.
    Cancelled,
    Deleted(DeletionReport),
}

impl DeletionOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }
}

/// Options for a single deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Ask for typed confirmation before deleting.
    pub confirm: bool,
    /// Take a pre-operation backup (best-effort).
    pub backup: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            confirm: true,
            backup: true,
        }
    }
}

impl DeleteOptions {
    /// No prompt, backup still taken.
    pub fn unattended() -> Self {
        Self {
            confirm: false,
            backup: true,
        }
    }
}

/// Per-target entry of a batch deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    pub target: String,
    pub outcome: Option<DeletionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Targets that did not resolve during the preview pass.
    pub skipped: Vec<String>,
    pub items: Vec<BatchItem>,
    pub succeeded: usize,
    pub failed: usize,
    /// The batch-wide confirmation was declined.
    pub cancelled: bool,
    pub previewed_records: u64,
}
