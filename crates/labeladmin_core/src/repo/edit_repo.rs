//! In-place edits of questions and question groups.
//!
//! # Responsibility
//! - Uniqueness probes for renames.
//! - Text/title updates, default options and question replacement.
//!
//! # Invariants
//! - Uniqueness probes exclude the edited row itself.
//! - Writes report affected row counts; the service decides what a zero
//!   count means.

use crate::model::deletion::TableCount;
use crate::model::records::QuestionRecord;
use crate::repo::lookup_repo::{map_question, QUESTION_SELECT_SQL};
use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension};

/// Which unique question-group column a title collides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleColumn {
    Title,
    DisplayTitle,
}

impl TitleColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::DisplayTitle => "display_title",
        }
    }
}

/// Tables whose `question_id` column is repointed by a question replacement,
/// with the label reported for each.
const REPOINTED_TABLES: &[(&str, &str)] = &[
    ("annotator_answers", "annotator_answers"),
    ("ground_truth", "reviewer_ground_truth"),
    ("custom_displays", "project_video_question_displays"),
    ("question_group_questions", "question_group_questions"),
];

pub struct SqliteEditRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEditRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Id of another question already using `text`.
    pub fn question_with_text(&self, text: &str, exclude_id: i64) -> RepoResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM questions WHERE text = ?1 AND id != ?2;",
                params![text, exclude_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// First unique column of another group that `title` would collide with.
    ///
    /// Both `title` and `display_title` are unique, so the new title is
    /// checked against each and `display_title` against each as well.
    pub fn group_title_conflict(
        &self,
        title: &str,
        display_title: &str,
        exclude_id: i64,
    ) -> RepoResult<Option<(TitleColumn, i64)>> {
        for (column, value) in [
            (TitleColumn::Title, title),
            (TitleColumn::DisplayTitle, display_title),
        ] {
            let id = self
                .conn
                .query_row(
                    &format!(
                        "SELECT id FROM question_groups WHERE {} = ?1 AND id != ?2 LIMIT 1;",
                        column.as_str()
                    ),
                    params![value, exclude_id],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if let Some(id) = id {
                return Ok(Some((column, id)));
            }
        }
        Ok(None)
    }

    pub fn update_question_text(
        &self,
        id: i64,
        text: &str,
        display_text: &str,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE questions SET text = ?2, display_text = ?3 WHERE id = ?1;",
            params![id, text, display_text],
        )?;
        Ok(changed)
    }

    pub fn update_group_titles(
        &self,
        id: i64,
        title: &str,
        display_title: &str,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE question_groups SET title = ?2, display_title = ?3 WHERE id = ?1;",
            params![id, title, display_title],
        )?;
        Ok(changed)
    }

    /// Questions with no default option, ordered by id.
    pub fn questions_without_default(&self) -> RepoResult<Vec<QuestionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{QUESTION_SELECT_SQL}
             WHERE default_option IS NULL
             ORDER BY id ASC;"
        ))?;
        let rows = stmt.query_map([], map_question)?;
        let mut questions = Vec::new();
        for question in rows {
            questions.push(question?);
        }
        Ok(questions)
    }

    pub fn set_default_option(&self, id: i64, option: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE questions SET default_option = ?2 WHERE id = ?1;",
            params![id, option],
        )?;
        Ok(changed)
    }

    /// Rows of each repointed table still referencing `question_id`.
    pub fn question_references(&self, question_id: i64) -> RepoResult<Vec<TableCount>> {
        let mut counts = Vec::with_capacity(REPOINTED_TABLES.len());
        for &(label, table) in REPOINTED_TABLES {
            let count: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE question_id = ?1;"),
                [question_id],
                |row| row.get(0),
            )?;
            counts.push(TableCount {
                table: label,
                count: count.max(0) as u64,
            });
        }
        Ok(counts)
    }

    /// Moves every reference from `old_id` to `new_id`.
    ///
    /// Rows that would collide with an existing row for `new_id` stay on
    /// `old_id` and are then deleted (reviews of dropped answers first).
    /// Returns `(moved, dropped)` per table.
    pub fn repoint_question(
        &self,
        old_id: i64,
        new_id: i64,
    ) -> RepoResult<(Vec<TableCount>, Vec<TableCount>)> {
        let mut moved = Vec::with_capacity(REPOINTED_TABLES.len());
        for &(label, table) in REPOINTED_TABLES {
            let count = self.conn.execute(
                &format!("UPDATE OR IGNORE {table} SET question_id = ?2 WHERE question_id = ?1;"),
                params![old_id, new_id],
            )?;
            moved.push(TableCount {
                table: label,
                count: count as u64,
            });
        }

        let mut dropped = Vec::with_capacity(REPOINTED_TABLES.len() + 1);
        let reviews = self.conn.execute(
            "DELETE FROM answer_reviews
             WHERE answer_id IN (SELECT id FROM annotator_answers WHERE question_id = ?1);",
            [old_id],
        )?;
        dropped.push(TableCount {
            table: "answer_reviews",
            count: reviews as u64,
        });
        for &(label, table) in REPOINTED_TABLES {
            let count = self.conn.execute(
                &format!("DELETE FROM {table} WHERE question_id = ?1;"),
                [old_id],
            )?;
            dropped.push(TableCount {
                table: label,
                count: count as u64,
            });
        }
        Ok((moved, dropped))
    }

    pub fn delete_question(&self, id: i64) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM questions WHERE id = ?1;", [id])?;
        Ok(removed)
    }
}
