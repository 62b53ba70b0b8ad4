//! Environment-driven configuration for maintenance runs.
//!
//! | Env Var                      | Default          |
//! |------------------------------|------------------|
//! | `DBURL`                      | (required)       |
//! | `LABELADMIN_BACKUP_DIR`      | `./db_backups`   |
//! | `LABELADMIN_MAX_BACKUPS`     | `10`             |
//! | `LABELADMIN_BACKUP_COMPRESS` | `false`          |
//! | `LABELADMIN_BACKUPS`         | `true`           |
//! | `LABELADMIN_LOG_LEVEL`       | by build mode    |
//! | `LABELADMIN_LOG_DIR`         | unset (no logs)  |

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DATABASE_URL_VAR: &str = "DBURL";
const BACKUP_DIR_VAR: &str = "LABELADMIN_BACKUP_DIR";
const MAX_BACKUPS_VAR: &str = "LABELADMIN_MAX_BACKUPS";
const BACKUP_COMPRESS_VAR: &str = "LABELADMIN_BACKUP_COMPRESS";
const BACKUPS_ENABLED_VAR: &str = "LABELADMIN_BACKUPS";
const LOG_LEVEL_VAR: &str = "LABELADMIN_LOG_LEVEL";
const LOG_DIR_VAR: &str = "LABELADMIN_LOG_DIR";

pub const DEFAULT_BACKUP_DIR: &str = "./db_backups";
pub const DEFAULT_MAX_BACKUPS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidValue { var: &'static str, value: String },
    UnsupportedDatabaseUrl(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVar(var) => write!(f, "environment variable `{var}` is not set"),
            Self::InvalidValue { var, value } => {
                write!(f, "invalid value `{value}` for `{var}`")
            }
            Self::UnsupportedDatabaseUrl(url) => write!(
                f,
                "unsupported database url `{url}`; expected sqlite://<path> or a file path"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved settings for one maintenance process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    /// SQLite file every session opens.
    pub database_path: PathBuf,
    /// Directory receiving pre-operation backups.
    pub backup_dir: PathBuf,
    /// Rotation limit for `backup_*` files in `backup_dir`.
    pub max_backups: usize,
    pub compress_backups: bool,
    /// When false, destructive operations run without a backup.
    pub backups_enabled: bool,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl AdminConfig {
    /// Config with defaults for everything but the database location.
    pub fn for_database(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            max_backups: DEFAULT_MAX_BACKUPS,
            compress_backups: false,
            backups_enabled: true,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }

    /// Loads `.env` (when present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup(DATABASE_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingVar(DATABASE_URL_VAR))?;
        let mut config = Self::for_database(parse_database_url(&url)?);

        if let Some(dir) = lookup(BACKUP_DIR_VAR).filter(|value| !value.trim().is_empty()) {
            config.backup_dir = PathBuf::from(dir.trim());
        }
        if let Some(value) = lookup(MAX_BACKUPS_VAR) {
            config.max_backups = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|max| *max > 0)
                .ok_or(ConfigError::InvalidValue {
                    var: MAX_BACKUPS_VAR,
                    value,
                })?;
        }
        if let Some(value) = lookup(BACKUP_COMPRESS_VAR) {
            config.compress_backups = parse_flag(BACKUP_COMPRESS_VAR, value)?;
        }
        if let Some(value) = lookup(BACKUPS_ENABLED_VAR) {
            config.backups_enabled = parse_flag(BACKUPS_ENABLED_VAR, value)?;
        }
        if let Some(level) = lookup(LOG_LEVEL_VAR).filter(|value| !value.trim().is_empty()) {
            config.log_level = level.trim().to_string();
        }
        config.log_dir = lookup(LOG_DIR_VAR)
            .filter(|value| !value.trim().is_empty())
            .map(|dir| PathBuf::from(dir.trim()));

        Ok(config)
    }
}

/// Maps a `DBURL` value onto the SQLite file it names.
///
/// Accepts `sqlite://<path>`, `sqlite:<path>` and bare paths. Server URLs
/// (`postgres://` and friends) are rejected.
pub fn parse_database_url(url: &str) -> Result<PathBuf, ConfigError> {
    let trimmed = url.trim();
    let path = if let Some(rest) = trimmed.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("sqlite:") {
        rest
    } else if trimmed.contains("://") {
        return Err(ConfigError::UnsupportedDatabaseUrl(trimmed.to_string()));
    } else {
        trimmed
    };

    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Err(ConfigError::UnsupportedDatabaseUrl(trimmed.to_string()));
    }
    Ok(PathBuf::from(path))
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}
