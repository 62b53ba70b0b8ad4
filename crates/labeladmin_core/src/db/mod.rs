//! SQLite storage bootstrap, schema migrations and per-operation sessions.
//!
//! # Responsibility
//! - Open and configure SQLite connections for maintenance operations.
//! - Apply the platform schema migrations when bootstrapping a database.
//! - Hand out one fresh connection per operation (`SessionFactory`); sessions
//!   only open databases that already exist at the latest version.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No maintenance query runs on a connection whose migrations failed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;
mod session;

pub use open::{open_db, open_db_in_memory, open_existing_db};
pub use session::SessionFactory;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Session target does not exist; sessions never create databases.
    MissingDatabase(PathBuf),
    /// Database predates the latest migration and must be initialized first.
    OutdatedSchema {
        db_version: u32,
        required: u32,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingDatabase(path) => {
                write!(f, "database file `{}` does not exist", path.display())
            }
            Self::OutdatedSchema {
                db_version,
                required,
            } => write!(
                f,
                "database schema version {db_version} is older than required {required}; initialize or migrate it first"
            ),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MissingDatabase(_)
            | Self::OutdatedSchema { .. }
            | Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
