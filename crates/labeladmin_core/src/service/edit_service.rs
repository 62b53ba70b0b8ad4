//! Question and question-group edits.
//!
//! # Responsibility
//! - Rename questions and question groups without breaking uniqueness.
//! - Maintain question default options.
//! - Merge one question into another (`replace_question`).
//!
//! # Invariants
//! - A rename that collides with a different record fails with `Conflict`
//!   and changes nothing.
//! - Every write commits in one transaction or not at all.

use crate::backup::OperationBackups;
use crate::console::Console;
use crate::db::{DbError, SessionFactory};
use crate::model::deletion::TableCount;
use crate::model::records::{QuestionGroupRecord, QuestionRecord};
use crate::model::target::RecordRef;
use crate::repo::edit_repo::SqliteEditRepository;
use crate::repo::lookup_repo::SqliteLookupRepository;
use crate::repo::RepoError;
use crate::service::backup_with_notice;
use crate::service::report::table_caption;
use log::info;
use rusqlite::TransactionBehavior;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type EditResult<T> = Result<T, EditError>;

#[derive(Debug)]
pub enum EditError {
    /// Record to edit does not exist.
    NotFound(String),
    /// New value is already used by a different record.
    Conflict(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EditError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for EditError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for EditError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Result of merging one question into another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaceReport {
    pub old_id: i64,
    pub new_id: i64,
    /// Rows referencing the old question before the merge, per table.
    pub references: Vec<TableCount>,
    /// Rows repointed to the new question, per table.
    pub moved: Vec<TableCount>,
    /// Rows deleted because the new question already had an equivalent row.
    pub dropped: Vec<TableCount>,
    pub backup_path: Option<PathBuf>,
}

/// Edit operations over one database.
pub struct EditService<C: Console> {
    sessions: SessionFactory,
    backups: Option<OperationBackups>,
    console: C,
}

impl<C: Console> EditService<C> {
    pub fn new(sessions: SessionFactory, console: C) -> Self {
        Self {
            sessions,
            backups: None,
            console,
        }
    }

    pub fn with_backups(mut self, backups: OperationBackups) -> Self {
        self.backups = Some(backups);
        self
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Renames the question whose text is `original_text`.
    ///
    /// The display text defaults to the new text.
    ///
    /// # Errors
    /// - `NotFound` when no question has `original_text`.
    /// - `Conflict` when another question already uses `new_text`.
    pub fn rename_question(
        &mut self,
        original_text: &str,
        new_text: &str,
        new_display_text: Option<&str>,
    ) -> EditResult<QuestionRecord> {
        let display_text = new_display_text.unwrap_or(new_text);
        let question = {
            let conn = self.sessions.open()?;
            SqliteLookupRepository::new(&conn)
                .find_question(&RecordRef::key(original_text))?
                .ok_or_else(|| EditError::NotFound(format!("question '{original_text}'")))?
        };

        self.take_backup(&format!("change_question_{}", question.id));

        let mut conn = self.sessions.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let repo = SqliteEditRepository::new(&tx);
        if let Some(other) = repo.question_with_text(new_text, question.id)? {
            return Err(EditError::Conflict(format!(
                "question text '{new_text}' is already used by question {other}"
            )));
        }
        repo.update_question_text(question.id, new_text, display_text)?;
        tx.commit()?;

        info!(
            "event=rename_question module=service status=ok question_id={}",
            question.id
        );
        self.console.say(&format!(
            "Updated question {}: '{}' -> '{new_text}' (display: '{display_text}')",
            question.id, question.text
        ));
        Ok(QuestionRecord {
            text: new_text.to_string(),
            display_text: display_text.to_string(),
            ..question
        })
    }

    /// Renames question group `group_id`.
    ///
    /// The display title defaults to the new title.
    ///
    /// # Errors
    /// - `NotFound` when the group does not exist.
    /// - `Conflict` when a different group uses either title.
    pub fn rename_question_group(
        &mut self,
        group_id: i64,
        new_title: &str,
        new_display_title: Option<&str>,
    ) -> EditResult<QuestionGroupRecord> {
        let display_title = new_display_title.unwrap_or(new_title);
        let group = {
            let conn = self.sessions.open()?;
            SqliteLookupRepository::new(&conn)
                .find_question_group(&RecordRef::Id(group_id))?
                .ok_or_else(|| EditError::NotFound(format!("question group {group_id}")))?
        };

        self.take_backup(&format!("update_qgroup_{group_id}"));

        let mut conn = self.sessions.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let repo = SqliteEditRepository::new(&tx);
        if let Some((column, other)) = repo.group_title_conflict(new_title, display_title, group_id)?
        {
            return Err(EditError::Conflict(format!(
                "question group {other} already uses that {}",
                column.as_str()
            )));
        }
        repo.update_group_titles(group_id, new_title, display_title)?;
        tx.commit()?;

        info!("event=rename_question_group module=service status=ok group_id={group_id}");
        self.console.say(&format!(
            "Updated question group {group_id}: '{}' -> '{new_title}' (display: '{display_title}')",
            group.title
        ));
        Ok(QuestionGroupRecord {
            title: new_title.to_string(),
            display_title: display_title.to_string(),
            ..group
        })
    }

    /// Lists questions without a default option and prints them.
    pub fn find_questions_without_default(&mut self) -> EditResult<Vec<QuestionRecord>> {
        let conn = self.sessions.open()?;
        let questions = SqliteEditRepository::new(&conn).questions_without_default()?;
        if questions.is_empty() {
            self.console.say("All questions have a default option.");
        } else {
            self.console.say(&format!(
                "Found {} questions without a default option:",
                questions.len()
            ));
            for question in &questions {
                self.console.say(&format!(
                    "  {} [{}] {}",
                    question.id, question.question_type, question.text
                ));
            }
        }
        Ok(questions)
    }

    /// Sets the default option of question `question_id`.
    ///
    /// Returns `false` (after printing a message) when the question does not
    /// exist.
    pub fn update_question_default(&mut self, question_id: i64, option: &str) -> EditResult<bool> {
        let conn = self.sessions.open()?;
        let Some(question) =
            SqliteLookupRepository::new(&conn).find_question(&RecordRef::Id(question_id))?
        else {
            self.console
                .say(&format!("Question with ID {question_id} not found"));
            return Ok(false);
        };
        SqliteEditRepository::new(&conn).set_default_option(question_id, option)?;

        info!("event=update_question_default module=service status=ok question_id={question_id}");
        self.console.say(&format!(
            "Updated question {question_id} default option: {} -> {option}",
            question.default_option.as_deref().unwrap_or("<none>")
        ));
        Ok(true)
    }

    /// Moves every reference of `old_id` to `new_id`, then deletes `old_id`.
    ///
    /// # Errors
    /// - `NotFound` when either question is missing.
    /// - `Conflict` when both ids are the same question.
    pub fn replace_question(&mut self, old_id: i64, new_id: i64) -> EditResult<ReplaceReport> {
        if old_id == new_id {
            return Err(EditError::Conflict(format!(
                "question {old_id} cannot replace itself"
            )));
        }
        let references = {
            let conn = self.sessions.open()?;
            let lookup = SqliteLookupRepository::new(&conn);
            for id in [old_id, new_id] {
                if lookup.find_question(&RecordRef::Id(id))?.is_none() {
                    return Err(EditError::NotFound(format!("question {id}")));
                }
            }
            SqliteEditRepository::new(&conn).question_references(old_id)?
        };
        self.console
            .say(&format!("Question {old_id} references to move to {new_id}:"));
        for entry in &references {
            self.console
                .say(&format!("  {}: {}", table_caption(entry.table), entry.count));
        }

        let backup_path = self.take_backup(&format!("replace_question_{old_id}_{new_id}"));

        let mut conn = self.sessions.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let repo = SqliteEditRepository::new(&tx);
        let (moved, dropped) = repo.repoint_question(old_id, new_id)?;
        if repo.delete_question(old_id)? != 1 {
            return Err(EditError::NotFound(format!("question {old_id}")));
        }
        tx.commit()?;

        info!("event=replace_question module=service status=ok old_id={old_id} new_id={new_id}");
        self.console.say(&format!(
            "Replaced question {old_id} with {new_id} and deleted the original"
        ));
        Ok(ReplaceReport {
            old_id,
            new_id,
            references,
            moved,
            dropped,
            backup_path,
        })
    }

    fn take_backup(&mut self, operation: &str) -> Option<PathBuf> {
        backup_with_notice(self.backups.as_ref(), &mut self.console, operation)
    }
}
