//! Repository layer over the platform tables.
//!
//! # Responsibility
//! - Resolve operator keys (ids, names, compound keys) to rows.
//! - Count and delete cascades, and apply record edits.
//! - Keep every SQL string inside this module.
//!
//! # Invariants
//! - Lookups are read-only; mutations only run on the connection or
//!   transaction the caller passes in.
//! - A row that does not resolve is `Ok(None)`, not an error.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod cascade_repo;
pub mod edit_repo;
pub mod lookup_repo;
pub mod schema_change_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Persisted state contradicts what the operation just read.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
