//! Session-per-call connection factory.

use super::{open_db, open_existing_db, DbResult};
use rusqlite::Connection;
use std::path::PathBuf;

/// Opens one connection per maintenance operation.
///
/// Connections are never cached; dropping the returned value closes the
/// session, and anything not committed is rolled back by SQLite.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    path: PathBuf,
}

impl SessionFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens a session on the existing, fully migrated database.
    ///
    /// # Errors
    /// `MissingDatabase`, `OutdatedSchema` or `UnsupportedSchemaVersion`
    /// instead of creating or migrating anything.
    pub fn open(&self) -> DbResult<Connection> {
        open_existing_db(&self.path)
    }

    /// Creates the database file if needed and applies pending migrations.
    pub fn initialize(&self) -> DbResult<()> {
        drop(open_db(&self.path)?);
        Ok(())
    }
}
