//! Preview and result of moving a project onto another schema.

use crate::model::deletion::TableCount;
use crate::model::records::{ProjectRecord, SchemaRecord};
use serde::Serialize;
use std::path::PathBuf;

/// What switching a project's schema would drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaChangePreview {
    pub project: ProjectRecord,
    pub new_schema: SchemaRecord,
    /// Questions in the current schema but not in the new one.
    pub removed_question_ids: Vec<i64>,
    /// Rows deleted by the switch, per table.
    pub data_counts: Vec<TableCount>,
    /// Project roles whose `completed_at` is cleared.
    pub roles_reset: u64,
}

impl SchemaChangePreview {
    pub fn count_for(&self, table: &str) -> Option<u64> {
        self.data_counts
            .iter()
            .find(|entry| entry.table == table)
            .map(|entry| entry.count)
    }

    pub fn total_records(&self) -> u64 {
        self.data_counts.iter().map(|entry| entry.count).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.project.schema_id == self.new_schema.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaChangeReport {
    pub preview: SchemaChangePreview,
    pub deleted: Vec<TableCount>,
    pub backup_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaChangeOutcome {
    /// Project or schema did not resolve.
    NotFound,
    /// The project already uses the requested schema.
    Unchanged,
    Cancelled,
    Changed(SchemaChangeReport),
}
