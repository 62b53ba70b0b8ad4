use labeladmin_core::db::migrations::latest_version;
use labeladmin_core::db::{open_db, open_db_in_memory, DbError, SessionFactory};
use rusqlite::Connection;

const PLATFORM_TABLES: &[&str] = &[
    "users",
    "videos",
    "video_tags",
    "question_groups",
    "questions",
    "question_group_questions",
    "schemas",
    "schema_question_groups",
    "projects",
    "project_videos",
    "project_user_roles",
    "project_groups",
    "project_group_projects",
    "project_video_question_displays",
    "annotator_answers",
    "reviewer_ground_truth",
    "answer_reviews",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in PLATFORM_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    conn_first
        .execute(
            "INSERT INTO schemas (name) VALUES ('Lighting');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = SessionFactory::new(&path).open().unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let schemas: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM schemas;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(schemas, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn duplicate_answers_are_rejected_by_the_schema() {
    let conn = open_db_in_memory().unwrap();
    let insert = "INSERT INTO annotator_answers (video_id, question_id, user_id, project_id, answer_value)
                  VALUES (1, 1, 1, 1, 'yes');";
    conn.execute(insert, []).unwrap();
    assert!(conn.execute(insert, []).is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

#[test]
fn sessions_refuse_missing_database_without_creating_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typo_labels.db");

    let err = SessionFactory::new(&path).open().unwrap_err();

    assert!(matches!(err, DbError::MissingDatabase(ref missing) if missing == &path));
    assert!(!path.exists());
}

#[test]
fn sessions_refuse_unmigrated_database_without_migrating_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE unrelated (id INTEGER PRIMARY KEY);")
        .unwrap();

    let err = SessionFactory::new(&path).open().unwrap_err();

    assert!(matches!(
        err,
        DbError::OutdatedSchema {
            db_version: 0,
            ..
        }
    ));
    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn initialize_creates_and_migrates_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.db");
    let sessions = SessionFactory::new(&path);

    sessions.initialize().unwrap();
    sessions.initialize().unwrap();

    let conn = sessions.open().unwrap();
    assert_eq!(schema_version(&conn), latest_version());
}
