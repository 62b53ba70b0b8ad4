//! Core maintenance logic for the labeling platform database.
//! Every destructive operation goes through preview, confirmation and
//! backup before it touches data.

pub mod backup;
pub mod config;
pub mod console;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use backup::{BackupCreator, OperationBackups, SqliteBackup};
pub use config::{AdminConfig, ConfigError};
pub use console::{Confirmation, Console, ScriptedConsole, StdConsole};
pub use db::{open_db, DbError, SessionFactory};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::deletion::{BatchReport, DeleteOptions, DeletionOutcome, DeletionPreview};
pub use model::schema_change::{SchemaChangeOutcome, SchemaChangePreview};
pub use model::target::{DeletionTarget, EntityKind, ProjectRole, RecordRef};
pub use repo::{RepoError, RepoResult};
pub use service::edit_service::{EditError, EditService};
pub use service::maintenance_service::{MaintenanceError, MaintenanceService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
