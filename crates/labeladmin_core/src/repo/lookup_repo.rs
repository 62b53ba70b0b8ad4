//! Key resolution for deletion targets.
//!
//! # Responsibility
//! - Map `RecordRef`s and compound keys to concrete rows.
//! - Return read models (`TargetRecord`) for previews.
//!
//! # Invariants
//! - Compound targets given by numeric id are looked up on the link row
//!   alone; parents are not required to exist, so orphaned rows stay
//!   reachable.

use crate::model::records::{
    AnnotatorAnswerRecord, CustomDisplayRecord, GroundTruthRecord, NamedRecord,
    ProjectGroupRecord, ProjectRecord, ProjectUserRoleRecord, QuestionGroupRecord,
    QuestionRecord, SchemaRecord, TargetRecord, UserRecord, VideoRecord, VideoTagRecord,
};
use crate::model::target::{DeletionTarget, EntityKind, ProjectRole, RecordRef};
use crate::repo::RepoResult;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT id, user_id_str, email, user_type, is_archived FROM users";
const VIDEO_SELECT_SQL: &str = "SELECT id, video_uid, url, is_archived FROM videos";
const QUESTION_GROUP_SELECT_SQL: &str =
    "SELECT id, title, display_title, is_reusable, is_archived FROM question_groups";
pub(crate) const QUESTION_SELECT_SQL: &str =
    "SELECT id, text, display_text, type, default_option, is_archived FROM questions";
const SCHEMA_SELECT_SQL: &str = "SELECT id, name, is_archived FROM schemas";
const PROJECT_SELECT_SQL: &str = "SELECT id, name, schema_id, is_archived FROM projects";
const PROJECT_GROUP_SELECT_SQL: &str = "SELECT id, name, is_archived FROM project_groups";

/// SQLite-backed key resolver.
pub struct SqliteLookupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLookupRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Resolves a deletion target to its root row.
    pub fn resolve(&self, target: &DeletionTarget) -> RepoResult<Option<TargetRecord>> {
        let record = match target {
            DeletionTarget::User(key) => self.find_user(key)?.map(TargetRecord::User),
            DeletionTarget::Video(key) => self.find_video(key)?.map(TargetRecord::Video),
            DeletionTarget::VideoTag { video, tag } => self
                .find_video_tag(video, tag)?
                .map(TargetRecord::VideoTag),
            DeletionTarget::QuestionGroup(key) => self
                .find_question_group(key)?
                .map(TargetRecord::QuestionGroup),
            DeletionTarget::Question(key) => self.find_question(key)?.map(TargetRecord::Question),
            DeletionTarget::Schema(key) => self.find_schema(key)?.map(TargetRecord::Schema),
            DeletionTarget::Project(key) => self.find_project(key)?.map(TargetRecord::Project),
            DeletionTarget::ProjectUserRole {
                project,
                user,
                role,
            } => self
                .find_project_role(project, user, *role)?
                .map(TargetRecord::ProjectUserRole),
            DeletionTarget::ProjectGroup(key) => self
                .find_project_group(key)?
                .map(TargetRecord::ProjectGroup),
            DeletionTarget::CustomDisplay {
                project,
                video,
                question,
            } => self
                .find_custom_display(project, video, question)?
                .map(TargetRecord::CustomDisplay),
            DeletionTarget::AnnotatorAnswer {
                video,
                question,
                user,
                project,
            } => self
                .find_annotator_answer(video, question, user, project)?
                .map(TargetRecord::AnnotatorAnswer),
            DeletionTarget::GroundTruth {
                video,
                question,
                project,
            } => self
                .find_ground_truth(video, question, project)?
                .map(TargetRecord::GroundTruth),
        };
        Ok(record)
    }

    pub fn find_user(&self, key: &RecordRef) -> RepoResult<Option<UserRecord>> {
        self.find_by_ref(USER_SELECT_SQL, "user_id_str", key, |row| {
            Ok(UserRecord {
                id: row.get("id")?,
                user_id_str: row.get("user_id_str")?,
                email: row.get("email")?,
                user_type: row.get("user_type")?,
                is_archived: row.get("is_archived")?,
            })
        })
    }

    pub fn find_video(&self, key: &RecordRef) -> RepoResult<Option<VideoRecord>> {
        self.find_by_ref(VIDEO_SELECT_SQL, "video_uid", key, |row| {
            Ok(VideoRecord {
                id: row.get("id")?,
                video_uid: row.get("video_uid")?,
                url: row.get("url")?,
                is_archived: row.get("is_archived")?,
            })
        })
    }

    pub fn find_question_group(&self, key: &RecordRef) -> RepoResult<Option<QuestionGroupRecord>> {
        self.find_by_ref(QUESTION_GROUP_SELECT_SQL, "title", key, |row| {
            Ok(QuestionGroupRecord {
                id: row.get("id")?,
                title: row.get("title")?,
                display_title: row.get("display_title")?,
                is_reusable: row.get("is_reusable")?,
                is_archived: row.get("is_archived")?,
            })
        })
    }

    pub fn find_question(&self, key: &RecordRef) -> RepoResult<Option<QuestionRecord>> {
        self.find_by_ref(QUESTION_SELECT_SQL, "text", key, map_question)
    }

    pub fn find_schema(&self, key: &RecordRef) -> RepoResult<Option<SchemaRecord>> {
        self.find_by_ref(SCHEMA_SELECT_SQL, "name", key, |row| {
            Ok(SchemaRecord {
                id: row.get("id")?,
                name: row.get("name")?,
                is_archived: row.get("is_archived")?,
            })
        })
    }

    pub fn find_project(&self, key: &RecordRef) -> RepoResult<Option<ProjectRecord>> {
        self.find_by_ref(PROJECT_SELECT_SQL, "name", key, |row| {
            Ok(ProjectRecord {
                id: row.get("id")?,
                name: row.get("name")?,
                schema_id: row.get("schema_id")?,
                is_archived: row.get("is_archived")?,
            })
        })
    }

    pub fn find_project_group(&self, key: &RecordRef) -> RepoResult<Option<ProjectGroupRecord>> {
        self.find_by_ref(PROJECT_GROUP_SELECT_SQL, "name", key, |row| {
            Ok(ProjectGroupRecord {
                id: row.get("id")?,
                name: row.get("name")?,
                is_archived: row.get("is_archived")?,
            })
        })
    }

    pub fn find_video_tag(
        &self,
        video: &RecordRef,
        tag: &str,
    ) -> RepoResult<Option<VideoTagRecord>> {
        let Some(video_id) = self.id_for(EntityKind::Video, video)? else {
            return Ok(None);
        };
        let record = self
            .conn
            .query_row(
                "SELECT vt.video_id, COALESCE(v.video_uid, '') AS video_uid, vt.tag, vt.tag_source
                 FROM video_tags vt
                 LEFT JOIN videos v ON v.id = vt.video_id
                 WHERE vt.video_id = ?1 AND vt.tag = ?2;",
                params![video_id, tag],
                |row| {
                    Ok(VideoTagRecord {
                        video_id: row.get("video_id")?,
                        video_uid: row.get("video_uid")?,
                        tag: row.get("tag")?,
                        tag_source: row.get("tag_source")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn find_project_role(
        &self,
        project: &RecordRef,
        user: &RecordRef,
        role: ProjectRole,
    ) -> RepoResult<Option<ProjectUserRoleRecord>> {
        let (Some(project_id), Some(user_id)) = (
            self.id_for(EntityKind::Project, project)?,
            self.id_for(EntityKind::User, user)?,
        ) else {
            return Ok(None);
        };
        let record = self
            .conn
            .query_row(
                "SELECT project_id, user_id, role, is_archived
                 FROM project_user_roles
                 WHERE project_id = ?1 AND user_id = ?2 AND role = ?3;",
                params![project_id, user_id, role.as_str()],
                |row| {
                    Ok(ProjectUserRoleRecord {
                        project_id: row.get("project_id")?,
                        user_id: row.get("user_id")?,
                        role: row.get("role")?,
                        is_archived: row.get("is_archived")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn find_custom_display(
        &self,
        project: &RecordRef,
        video: &RecordRef,
        question: &RecordRef,
    ) -> RepoResult<Option<CustomDisplayRecord>> {
        let (Some(project_id), Some(video_id), Some(question_id)) = (
            self.id_for(EntityKind::Project, project)?,
            self.id_for(EntityKind::Video, video)?,
            self.id_for(EntityKind::Question, question)?,
        ) else {
            return Ok(None);
        };
        let record = self
            .conn
            .query_row(
                "SELECT project_id, video_id, question_id, custom_display_text
                 FROM project_video_question_displays
                 WHERE project_id = ?1 AND video_id = ?2 AND question_id = ?3;",
                params![project_id, video_id, question_id],
                |row| {
                    Ok(CustomDisplayRecord {
                        project_id: row.get("project_id")?,
                        video_id: row.get("video_id")?,
                        question_id: row.get("question_id")?,
                        custom_display_text: row.get("custom_display_text")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn find_annotator_answer(
        &self,
        video: &RecordRef,
        question: &RecordRef,
        user: &RecordRef,
        project: &RecordRef,
    ) -> RepoResult<Option<AnnotatorAnswerRecord>> {
        let (Some(video_id), Some(question_id), Some(user_id), Some(project_id)) = (
            self.id_for(EntityKind::Video, video)?,
            self.id_for(EntityKind::Question, question)?,
            self.id_for(EntityKind::User, user)?,
            self.id_for(EntityKind::Project, project)?,
        ) else {
            return Ok(None);
        };
        let record = self
            .conn
            .query_row(
                "SELECT id, video_id, question_id, user_id, project_id, answer_value
                 FROM annotator_answers
                 WHERE video_id = ?1 AND question_id = ?2 AND user_id = ?3 AND project_id = ?4;",
                params![video_id, question_id, user_id, project_id],
                |row| {
                    Ok(AnnotatorAnswerRecord {
                        id: row.get("id")?,
                        video_id: row.get("video_id")?,
                        question_id: row.get("question_id")?,
                        user_id: row.get("user_id")?,
                        project_id: row.get("project_id")?,
                        answer_value: row.get("answer_value")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub fn find_ground_truth(
        &self,
        video: &RecordRef,
        question: &RecordRef,
        project: &RecordRef,
    ) -> RepoResult<Option<GroundTruthRecord>> {
        let (Some(video_id), Some(question_id), Some(project_id)) = (
            self.id_for(EntityKind::Video, video)?,
            self.id_for(EntityKind::Question, question)?,
            self.id_for(EntityKind::Project, project)?,
        ) else {
            return Ok(None);
        };
        let record = self
            .conn
            .query_row(
                "SELECT video_id, question_id, project_id, reviewer_id, answer_value
                 FROM reviewer_ground_truth
                 WHERE video_id = ?1 AND question_id = ?2 AND project_id = ?3;",
                params![video_id, question_id, project_id],
                |row| {
                    Ok(GroundTruthRecord {
                        video_id: row.get("video_id")?,
                        question_id: row.get("question_id")?,
                        project_id: row.get("project_id")?,
                        reviewer_id: row.get("reviewer_id")?,
                        answer_value: row.get("answer_value")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Projects whose schema is `schema_id`, ordered by id.
    pub fn projects_using_schema(&self, schema_id: i64) -> RepoResult<Vec<NamedRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM projects WHERE schema_id = ?1 ORDER BY id ASC;")?;
        let rows = stmt.query_map([schema_id], |row| {
            Ok(NamedRecord {
                id: row.get("id")?,
                name: row.get("name")?,
            })
        })?;
        let mut projects = Vec::new();
        for project in rows {
            projects.push(project?);
        }
        Ok(projects)
    }

    /// Resolves a reference to a primary key.
    ///
    /// Numeric references are returned as-is without an existence check.
    pub fn id_for(&self, kind: EntityKind, key: &RecordRef) -> RepoResult<Option<i64>> {
        let value = match key {
            RecordRef::Id(id) => return Ok(Some(*id)),
            RecordRef::Key(value) => value,
        };
        let Some((table, column)) = natural_key_column(kind) else {
            return Ok(None);
        };
        let id = self
            .conn
            .query_row(
                &format!("SELECT id FROM {table} WHERE {column} = ?1;"),
                [value],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id)
    }

    fn find_by_ref<T>(
        &self,
        select_sql: &str,
        natural_column: &str,
        key: &RecordRef,
        map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> RepoResult<Option<T>> {
        let record = match key {
            RecordRef::Id(id) => self
                .conn
                .query_row(&format!("{select_sql} WHERE id = ?1;"), [id], map),
            RecordRef::Key(value) => self.conn.query_row(
                &format!("{select_sql} WHERE {natural_column} = ?1;"),
                [value],
                map,
            ),
        }
        .optional()?;
        Ok(record)
    }
}

pub(crate) fn map_question(row: &Row<'_>) -> rusqlite::Result<QuestionRecord> {
    Ok(QuestionRecord {
        id: row.get("id")?,
        text: row.get("text")?,
        display_text: row.get("display_text")?,
        question_type: row.get("type")?,
        default_option: row.get("default_option")?,
        is_archived: row.get("is_archived")?,
    })
}

/// `(table, unique column)` used for natural-key lookups.
fn natural_key_column(kind: EntityKind) -> Option<(&'static str, &'static str)> {
    match kind {
        EntityKind::User => Some(("users", "user_id_str")),
        EntityKind::Video => Some(("videos", "video_uid")),
        EntityKind::QuestionGroup => Some(("question_groups", "title")),
        EntityKind::Question => Some(("questions", "text")),
        EntityKind::Schema => Some(("schemas", "name")),
        EntityKind::Project => Some(("projects", "name")),
        EntityKind::ProjectGroup => Some(("project_groups", "name")),
        EntityKind::VideoTag
        | EntityKind::ProjectUserRole
        | EntityKind::CustomDisplay
        | EntityKind::AnnotatorAnswer
        | EntityKind::GroundTruth => None,
    }
}
