//! SQLite file backups through the online backup API, optionally gzipped.

use super::BackupCreator;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::error;
use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const PAGES_PER_STEP: std::os::raw::c_int = 100;
const STEP_PAUSE: Duration = Duration::from_millis(10);

#[derive(Debug)]
enum WriteError {
    Sqlite(rusqlite::Error),
    Io(io::Error),
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WriteError {}

impl From<rusqlite::Error> for WriteError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<io::Error> for WriteError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Copies the database at `source` into standalone SQLite files.
#[derive(Debug, Clone)]
pub struct SqliteBackup {
    source: PathBuf,
}

impl SqliteBackup {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    fn open_source(&self) -> rusqlite::Result<Connection> {
        Connection::open_with_flags(
            &self.source,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    fn copy_all(&self, output_file: &Path) -> rusqlite::Result<()> {
        let src = self.open_source()?;
        let mut dst = Connection::open(output_file)?;
        let backup = Backup::new(&src, &mut dst)?;
        backup.run_to_completion(PAGES_PER_STEP, STEP_PAUSE, None)
    }

    /// Recreates tables, indexes, views and triggers without rows.
    fn copy_schema(&self, output_file: &Path) -> rusqlite::Result<()> {
        let src = self.open_source()?;
        let mut stmt = src.prepare(
            "SELECT sql FROM sqlite_master
             WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'
             ORDER BY CASE type WHEN 'table' THEN 0 WHEN 'index' THEN 1 ELSE 2 END, rowid;",
        )?;
        let statements = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let version: u32 = src.query_row("PRAGMA user_version;", [], |row| row.get(0))?;

        let mut dst = Connection::open(output_file)?;
        let tx = dst.transaction()?;
        for sql in &statements {
            tx.execute_batch(sql)?;
        }
        tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
        tx.commit()
    }

    fn copy(&self, output_file: &Path, schema_only: bool) -> rusqlite::Result<()> {
        if schema_only {
            self.copy_schema(output_file)
        } else {
            self.copy_all(output_file)
        }
    }

    /// Copies into a staging file next to `output_file`, then gzips it.
    fn copy_compressed(&self, output_file: &Path, schema_only: bool) -> Result<(), WriteError> {
        let staging = staging_path(output_file);
        let result = self
            .copy(&staging, schema_only)
            .map_err(WriteError::from)
            .and_then(|()| gzip_file(&staging, output_file).map_err(WriteError::from));
        let _ = fs::remove_file(&staging);
        result
    }
}

fn staging_path(output_file: &Path) -> PathBuf {
    let mut name = output_file.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    output_file.with_file_name(name)
}

fn gzip_file(source: &Path, output_file: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let output = BufWriter::new(File::create(output_file)?);
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.flush()
}

impl BackupCreator for SqliteBackup {
    fn create_backup(&self, output_file: &Path, compress: bool, schema_only: bool) -> bool {
        let result = if compress {
            self.copy_compressed(output_file, schema_only)
        } else {
            self.copy(output_file, schema_only).map_err(WriteError::from)
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=backup_write module=backup status=error schema_only={schema_only} compress={compress} path={} error={err}",
                    output_file.display()
                );
                let _ = std::fs::remove_file(output_file);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db;
    use flate2::read::GzDecoder;

    fn seeded_db(dir: &Path) -> PathBuf {
        let path = dir.join("labels.db");
        let conn = open_db(&path).unwrap();
        conn.execute(
            "INSERT INTO users (user_id_str, password_hash) VALUES ('alice', 'x');",
            [],
        )
        .unwrap();
        path
    }

    #[test]
    fn full_backup_copies_rows() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded_db(dir.path());
        let out = dir.path().join("backup_full.db");

        assert!(SqliteBackup::new(&source).create_backup(&out, false, false));
        let copy = Connection::open(&out).unwrap();
        let users: i64 = copy
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 1);
    }

    #[test]
    fn schema_only_backup_has_tables_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded_db(dir.path());
        let out = dir.path().join("backup_schema.db");

        assert!(SqliteBackup::new(&source).create_backup(&out, false, true));
        let copy = Connection::open(&out).unwrap();
        let users: i64 = copy
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 0);
        let version: u32 = copy
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }

    #[test]
    fn compressed_backup_gunzips_to_a_readable_database() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded_db(dir.path());
        let out = dir.path().join("backup.db.gz");

        assert!(SqliteBackup::new(&source).create_backup(&out, true, false));
        assert!(!staging_path(&out).exists());

        let restored = dir.path().join("restored.db");
        let mut decoder = GzDecoder::new(File::open(&out).unwrap());
        io::copy(&mut decoder, &mut File::create(&restored).unwrap()).unwrap();
        let copy = Connection::open(&restored).unwrap();
        let users: i64 = copy
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 1);
    }

    #[test]
    fn failed_compressed_backup_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("backup.db.gz");
        assert!(!SqliteBackup::new(dir.path().join("absent.db")).create_backup(&out, true, false));
        assert!(!out.exists());
        assert!(!staging_path(&out).exists());
    }

    #[test]
    fn missing_source_fails_without_leaving_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("backup.db");
        assert!(!SqliteBackup::new(dir.path().join("absent.db")).create_backup(&out, false, false));
        assert!(!out.exists());
    }
}
