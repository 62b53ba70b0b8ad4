//! Row summaries shown in previews and returned to callers.
//!
//! Only the columns an operator needs to recognise a record are carried;
//! these are read models, never written back.

use crate::model::target::{EntityKind, ProjectRole};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub user_id_str: String,
    pub email: Option<String>,
    pub user_type: String,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    pub id: i64,
    pub video_uid: String,
    pub url: Option<String>,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoTagRecord {
    pub video_id: i64,
    pub video_uid: String,
    pub tag: String,
    pub tag_source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionGroupRecord {
    pub id: i64,
    pub title: String,
    pub display_title: String,
    pub is_reusable: bool,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub text: String,
    pub display_text: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub default_option: Option<String>,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaRecord {
    pub id: i64,
    pub name: String,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub schema_id: i64,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectUserRoleRecord {
    pub project_id: i64,
    pub user_id: i64,
    pub role: ProjectRole,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectGroupRecord {
    pub id: i64,
    pub name: String,
    pub is_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomDisplayRecord {
    pub project_id: i64,
    pub video_id: i64,
    pub question_id: i64,
    pub custom_display_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatorAnswerRecord {
    pub id: i64,
    pub video_id: i64,
    pub question_id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub answer_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroundTruthRecord {
    pub video_id: i64,
    pub question_id: i64,
    pub project_id: i64,
    pub reviewer_id: i64,
    pub answer_value: String,
}

/// `(id, name)` pair for records listed alongside a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRecord {
    pub id: i64,
    pub name: String,
}

/// A resolved deletion root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetRecord {
    User(UserRecord),
    Video(VideoRecord),
    VideoTag(VideoTagRecord),
    QuestionGroup(QuestionGroupRecord),
    Question(QuestionRecord),
    Schema(SchemaRecord),
    Project(ProjectRecord),
    ProjectUserRole(ProjectUserRoleRecord),
    ProjectGroup(ProjectGroupRecord),
    CustomDisplay(CustomDisplayRecord),
    AnnotatorAnswer(AnnotatorAnswerRecord),
    GroundTruth(GroundTruthRecord),
}

impl TargetRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Video(_) => EntityKind::Video,
            Self::VideoTag(_) => EntityKind::VideoTag,
            Self::QuestionGroup(_) => EntityKind::QuestionGroup,
            Self::Question(_) => EntityKind::Question,
            Self::Schema(_) => EntityKind::Schema,
            Self::Project(_) => EntityKind::Project,
            Self::ProjectUserRole(_) => EntityKind::ProjectUserRole,
            Self::ProjectGroup(_) => EntityKind::ProjectGroup,
            Self::CustomDisplay(_) => EntityKind::CustomDisplay,
            Self::AnnotatorAnswer(_) => EntityKind::AnnotatorAnswer,
            Self::GroundTruth(_) => EntityKind::GroundTruth,
        }
    }

    /// Key portion of the record, joined with `_`, for headings and backup
    /// file names (`12`, `5_3_annotator`, ...).
    pub fn key_slug(&self) -> String {
        match self {
            Self::User(r) => r.id.to_string(),
            Self::Video(r) => r.id.to_string(),
            Self::VideoTag(r) => format!("{}_{}", r.video_id, r.tag),
            Self::QuestionGroup(r) => r.id.to_string(),
            Self::Question(r) => r.id.to_string(),
            Self::Schema(r) => r.id.to_string(),
            Self::Project(r) => r.id.to_string(),
            Self::ProjectUserRole(r) => format!("{}_{}_{}", r.project_id, r.user_id, r.role),
            Self::ProjectGroup(r) => r.id.to_string(),
            Self::CustomDisplay(r) => {
                format!("{}_{}_{}", r.project_id, r.video_id, r.question_id)
            }
            Self::AnnotatorAnswer(r) => r.id.to_string(),
            Self::GroundTruth(r) => format!("{}_{}_{}", r.video_id, r.question_id, r.project_id),
        }
    }

    /// Operator-facing name, when the table has one.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::User(r) => Some(&r.user_id_str),
            Self::Video(r) => Some(&r.video_uid),
            Self::VideoTag(r) => Some(&r.tag),
            Self::QuestionGroup(r) => Some(&r.title),
            Self::Schema(r) => Some(&r.name),
            Self::Project(r) => Some(&r.name),
            Self::ProjectGroup(r) => Some(&r.name),
            Self::Question(_)
            | Self::ProjectUserRole(_)
            | Self::CustomDisplay(_)
            | Self::AnnotatorAnswer(_)
            | Self::GroundTruth(_) => None,
        }
    }

    /// `project 3 'Alpha'`, `question 4`, ...
    pub fn subject(&self) -> String {
        let base = format!("{} {}", self.kind().label(), self.key_slug());
        match self.display_name() {
            Some(name) => format!("{base} '{name}'"),
            None => base,
        }
    }

    /// Labelled fields printed at the top of a preview.
    pub fn detail_lines(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::User(r) => vec![
                ("User", r.user_id_str.clone()),
                ("Email", r.email.clone().unwrap_or_else(|| "-".to_string())),
                ("Type", r.user_type.clone()),
                ("Archived", r.is_archived.to_string()),
            ],
            Self::Video(r) => vec![
                ("Video", r.video_uid.clone()),
                ("URL", r.url.clone().unwrap_or_else(|| "-".to_string())),
                ("Archived", r.is_archived.to_string()),
            ],
            Self::VideoTag(r) => vec![
                ("Video", format!("{} ({})", r.video_uid, r.video_id)),
                ("Tag", r.tag.clone()),
                ("Source", r.tag_source.clone()),
            ],
            Self::QuestionGroup(r) => vec![
                ("Question Group", r.title.clone()),
                ("Display Title", r.display_title.clone()),
                ("Is Reusable", r.is_reusable.to_string()),
                ("Is Archived", r.is_archived.to_string()),
            ],
            Self::Question(r) => vec![
                ("Question", r.text.clone()),
                ("Display Text", r.display_text.clone()),
                ("Type", r.question_type.clone()),
                ("Is Archived", r.is_archived.to_string()),
            ],
            Self::Schema(r) => vec![
                ("Schema", r.name.clone()),
                ("Archived", r.is_archived.to_string()),
            ],
            Self::Project(r) => vec![
                ("Project", r.name.clone()),
                ("Schema ID", r.schema_id.to_string()),
                ("Archived", r.is_archived.to_string()),
            ],
            Self::ProjectUserRole(r) => vec![
                ("Project ID", r.project_id.to_string()),
                ("User ID", r.user_id.to_string()),
                ("Role", r.role.to_string()),
                ("Archived", r.is_archived.to_string()),
            ],
            Self::ProjectGroup(r) => vec![
                ("Project Group", r.name.clone()),
                ("Archived", r.is_archived.to_string()),
            ],
            Self::CustomDisplay(r) => vec![
                ("Project ID", r.project_id.to_string()),
                ("Video ID", r.video_id.to_string()),
                ("Question ID", r.question_id.to_string()),
                (
                    "Display Text",
                    r.custom_display_text
                        .clone()
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ],
            Self::AnnotatorAnswer(r) => vec![
                ("Answer ID", r.id.to_string()),
                ("Project ID", r.project_id.to_string()),
                ("Video ID", r.video_id.to_string()),
                ("Question ID", r.question_id.to_string()),
                ("User ID", r.user_id.to_string()),
                ("Answer", r.answer_value.clone()),
            ],
            Self::GroundTruth(r) => vec![
                ("Project ID", r.project_id.to_string()),
                ("Video ID", r.video_id.to_string()),
                ("Question ID", r.question_id.to_string()),
                ("Reviewer ID", r.reviewer_id.to_string()),
                ("Answer", r.answer_value.clone()),
            ],
        }
    }
}
