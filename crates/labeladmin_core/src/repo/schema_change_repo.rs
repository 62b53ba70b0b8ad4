//! Counting and applying a project schema switch.
//!
//! # Invariants
//! - Custom displays of the project are always dropped.
//! - Answers and ground truth are dropped only for questions the new schema
//!   no longer contains; reviews of dropped answers go with them.

use crate::model::deletion::TableCount;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};

/// `?1` project, `?2` current schema, `?3` new schema.
const REMOVED_QUESTION_FILTER: &str = "project_id = ?1
    AND question_id IN (
        SELECT qgq.question_id FROM schema_question_groups sqg
        JOIN question_group_questions qgq ON qgq.question_group_id = sqg.question_group_id
        WHERE sqg.schema_id = ?2)
    AND question_id NOT IN (
        SELECT qgq.question_id FROM schema_question_groups sqg
        JOIN question_group_questions qgq ON qgq.question_group_id = sqg.question_group_id
        WHERE sqg.schema_id = ?3)";

pub struct SqliteSchemaChangeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSchemaChangeRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Questions reachable from `current` but not from `new`, ordered by id.
    pub fn removed_question_ids(&self, current: i64, new: i64) -> RepoResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT qgq.question_id FROM schema_question_groups sqg
             JOIN question_group_questions qgq ON qgq.question_group_id = sqg.question_group_id
             WHERE sqg.schema_id = ?1
               AND qgq.question_id NOT IN (
                 SELECT qgq2.question_id FROM schema_question_groups sqg2
                 JOIN question_group_questions qgq2
                   ON qgq2.question_group_id = sqg2.question_group_id
                 WHERE sqg2.schema_id = ?2)
             ORDER BY qgq.question_id ASC;",
        )?;
        let rows = stmt.query_map(params![current, new], |row| row.get::<_, i64>(0))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id?);
        }
        Ok(ids)
    }

    /// Rows the switch would delete, per table. Read-only.
    pub fn count(&self, project_id: i64, current: i64, new: i64) -> RepoResult<Vec<TableCount>> {
        let reviews = self.count_where(
            "answer_reviews",
            &format!(
                "answer_id IN (SELECT id FROM annotator_answers WHERE {REMOVED_QUESTION_FILTER})"
            ),
            project_id,
            current,
            new,
        )?;
        let answers =
            self.count_where("annotator_answers", REMOVED_QUESTION_FILTER, project_id, current, new)?;
        let ground_truth = self.count_where(
            "reviewer_ground_truth",
            REMOVED_QUESTION_FILTER,
            project_id,
            current,
            new,
        )?;
        let displays: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM project_video_question_displays WHERE project_id = ?1;",
            [project_id],
            |row| row.get(0),
        )?;

        Ok(vec![
            table_count("answer_reviews", reviews),
            table_count("annotator_answers", answers),
            table_count("ground_truth", ground_truth),
            table_count("custom_displays", displays),
        ])
    }

    /// Roles of the project with a completion timestamp set.
    pub fn completed_roles(&self, project_id: i64) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM project_user_roles
             WHERE project_id = ?1 AND completed_at IS NOT NULL;",
            [project_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Deletes the dropped rows, repoints the project and clears role
    /// completion. The caller owns the transaction.
    pub fn apply(&self, project_id: i64, current: i64, new: i64) -> RepoResult<Vec<TableCount>> {
        let keys = params![project_id, current, new];
        let reviews = self.conn.execute(
            &format!(
                "DELETE FROM answer_reviews WHERE answer_id IN \
                 (SELECT id FROM annotator_answers WHERE {REMOVED_QUESTION_FILTER});"
            ),
            keys,
        )?;
        let answers = self.conn.execute(
            &format!("DELETE FROM annotator_answers WHERE {REMOVED_QUESTION_FILTER};"),
            keys,
        )?;
        let ground_truth = self.conn.execute(
            &format!("DELETE FROM reviewer_ground_truth WHERE {REMOVED_QUESTION_FILTER};"),
            keys,
        )?;
        let displays = self.conn.execute(
            "DELETE FROM project_video_question_displays WHERE project_id = ?1;",
            [project_id],
        )?;

        let updated = self.conn.execute(
            "UPDATE projects
             SET schema_id = ?2, updated_at = CAST(strftime('%s', 'now') AS INTEGER) * 1000
             WHERE id = ?1;",
            params![project_id, new],
        )?;
        if updated != 1 {
            return Err(RepoError::InvalidData(format!(
                "project {project_id} schema update touched {updated} rows"
            )));
        }
        self.conn.execute(
            "UPDATE project_user_roles SET completed_at = NULL WHERE project_id = ?1;",
            [project_id],
        )?;

        Ok(vec![
            table_count("answer_reviews", reviews as i64),
            table_count("annotator_answers", answers as i64),
            table_count("ground_truth", ground_truth as i64),
            table_count("custom_displays", displays as i64),
        ])
    }

    fn count_where(
        &self,
        table: &str,
        filter: &str,
        project_id: i64,
        current: i64,
        new: i64,
    ) -> RepoResult<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE {filter};"),
            params![project_id, current, new],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn table_count(table: &'static str, count: i64) -> TableCount {
    TableCount {
        table,
        count: count.max(0) as u64,
    }
}
