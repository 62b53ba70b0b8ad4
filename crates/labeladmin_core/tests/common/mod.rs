#![allow(dead_code)]

use labeladmin_core::db::open_db;
use labeladmin_core::SessionFactory;
use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ALL_TABLES: &[&str] = &[
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

/// Small labeling dataset:
/// - projects Alpha(1) and Beta(2) use schema 2, Gamma(3) uses schema 1
/// - schema 1 = group Lighting (questions 1, 2); schema 2 adds group Camera
///   (question 3); schema 3 is archived
/// - Alpha has three answers, two ground-truth rows, two custom displays
///   and one reviewed answer
const SEED_SQL: &str = "
INSERT INTO users (id, user_id_str, email, password_hash, user_type) VALUES
    (1, 'alice', 'alice@example.com', 'x', 'human'),
    (2, 'bob', 'bob@example.com', 'x', 'human'),
    (3, 'carol', NULL, 'x', 'human');

INSERT INTO videos (id, video_uid, url) VALUES
    (1, 'v1.mp4', 'https://cdn.example.com/v1.mp4'),
    (2, 'v2.mp4', 'https://cdn.example.com/v2.mp4');

INSERT INTO video_tags (video_id, tag, tag_source) VALUES
    (1, 'outdoor', 'model'),
    (1, 'night', 'reviewer'),
    (2, 'indoor', 'model');

INSERT INTO question_groups (id, title, display_title, is_reusable) VALUES
    (1, 'Lighting', 'Lighting conditions', 1),
    (2, 'Camera', 'Camera setup', 0);

INSERT INTO questions (id, text, display_text, type, options, default_option) VALUES
    (1, 'Is it bright?', 'Is it bright?', 'single', '[\"yes\",\"no\"]', 'yes'),
    (2, 'Is there a shadow?', 'Is there a shadow?', 'single', '[\"yes\",\"no\"]', 'no'),
    (3, 'Camera angle?', 'Camera angle?', 'single', '[\"low\",\"high\"]', NULL),
    (4, 'Describe the scene', 'Describe the scene', 'description', NULL, NULL);

INSERT INTO question_group_questions (question_group_id, question_id, display_order) VALUES
    (1, 1, 0), (1, 2, 1), (2, 3, 0), (2, 4, 1);

INSERT INTO schemas (id, name, is_archived) VALUES
    (1, 'Lighting only', 0),
    (2, 'Full', 0),
    (3, 'Retired', 1);

INSERT INTO schema_question_groups (schema_id, question_group_id, display_order) VALUES
    (1, 1, 0), (2, 1, 0), (2, 2, 1), (3, 2, 0);

INSERT INTO projects (id, name, schema_id) VALUES
    (1, 'Alpha', 2),
    (2, 'Beta', 2),
    (3, 'Gamma', 1);

INSERT INTO project_videos (project_id, video_id) VALUES
    (1, 1), (1, 2), (2, 1), (3, 2);

INSERT INTO project_user_roles (project_id, user_id, role, completed_at) VALUES
    (1, 1, 'annotator', 1000),
    (1, 2, 'reviewer', 2000),
    (2, 1, 'annotator', NULL),
    (3, 3, 'annotator', NULL);

INSERT INTO project_groups (id, name) VALUES (1, 'Batch A');
INSERT INTO project_group_projects (project_group_id, project_id) VALUES (1, 1), (1, 2);

INSERT INTO project_video_question_displays (project_id, video_id, question_id, custom_display_text) VALUES
    (1, 1, 1, 'Bright enough?'),
    (1, 2, 3, 'Angle of the camera?');

INSERT INTO annotator_answers (id, video_id, question_id, user_id, project_id, answer_value) VALUES
    (1, 1, 1, 1, 1, 'yes'),
    (2, 1, 3, 1, 1, 'low'),
    (3, 2, 1, 1, 1, 'no'),
    (4, 1, 1, 1, 2, 'yes'),
    (5, 2, 2, 3, 3, 'no');

INSERT INTO reviewer_ground_truth (video_id, question_id, project_id, reviewer_id, answer_value, original_answer_value) VALUES
    (1, 1, 1, 2, 'yes', 'yes'),
    (1, 3, 1, 2, 'low', 'low'),
    (2, 2, 3, 2, 'no', 'no');

INSERT INTO answer_reviews (answer_id, reviewer_id, status) VALUES
    (2, 2, 'approved'),
    (4, 2, 'pending');
";

pub struct Fixture {
    pub dir: TempDir,
    pub db_path: PathBuf,
}

impl Fixture {
    pub fn seeded() -> Self {
        let fixture = Self::empty();
        fixture.conn().execute_batch(SEED_SQL).unwrap();
        fixture
    }

    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("labels.db");
        drop(open_db(&db_path).unwrap());
        Self { dir, db_path }
    }

    pub fn sessions(&self) -> SessionFactory {
        SessionFactory::new(&self.db_path)
    }

    pub fn conn(&self) -> Connection {
        open_db(&self.db_path).unwrap()
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.path().join("backups")
    }

    pub fn count(&self, table: &str) -> u64 {
        count_rows(&self.conn(), table)
    }

    pub fn total_rows(&self) -> u64 {
        let conn = self.conn();
        ALL_TABLES.iter().map(|table| count_rows(&conn, table)).sum()
    }

    /// Row counts of every table, in `ALL_TABLES` order.
    pub fn snapshot(&self) -> Vec<u64> {
        let conn = self.conn();
        ALL_TABLES.iter().map(|table| count_rows(&conn, table)).collect()
    }
}

pub fn count_rows(conn: &Connection, table: &str) -> u64 {
    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })
        .unwrap();
    count as u64
}
