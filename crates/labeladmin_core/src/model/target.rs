//! Deletion targets and the entity kinds they name.
//!
//! # Invariants
//! - Every `DeletionTarget` maps to exactly one `EntityKind`.
//! - Compound targets identify at most one row.

use crate::console::Confirmation;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Reference to a row by primary key or by its unique natural key
/// (user handle, video uid, title, text or name depending on the table).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordRef {
    Id(i64),
    Key(String),
}

impl RecordRef {
    /// Parses command-line input: `#12` selects by id, anything else is
    /// taken as the natural key verbatim, so a video uid `2` stays a key.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('#').and_then(parse_digits) {
            Some(id) => Self::Id(id),
            None => Self::Key(raw.to_string()),
        }
    }

    /// Forces a natural-key lookup, even for digit-only input.
    pub fn key(value: impl Into<String>) -> Self {
        Self::Key(value.into())
    }
}

/// Digit-only text as an id; signs and whitespace are rejected.
pub fn parse_digits(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl From<i64> for RecordRef {
    fn from(value: i64) -> Self {
        Self::Id(value)
    }
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{id}"),
            Self::Key(key) => write!(f, "'{key}'"),
        }
    }
}

/// Role a user holds inside one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Annotator,
    Reviewer,
    Admin,
    Model,
}

impl ProjectRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Annotator => "annotator",
            Self::Reviewer => "reviewer",
            Self::Admin => "admin",
            Self::Model => "model",
        }
    }
}

impl FromStr for ProjectRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "annotator" => Ok(Self::Annotator),
            "reviewer" => Ok(Self::Reviewer),
            "admin" => Ok(Self::Admin),
            "model" => Ok(Self::Model),
            other => Err(format!(
                "unknown project role `{other}`; expected annotator|reviewer|admin|model"
            )),
        }
    }
}

impl FromSql for ProjectRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

impl Display for ProjectRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tables this crate knows how to delete from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Video,
    VideoTag,
    QuestionGroup,
    Question,
    Schema,
    Project,
    ProjectUserRole,
    ProjectGroup,
    CustomDisplay,
    AnnotatorAnswer,
    GroundTruth,
}

impl EntityKind {
    pub const ALL: [EntityKind; 12] = [
        Self::User,
        Self::Video,
        Self::VideoTag,
        Self::QuestionGroup,
        Self::Question,
        Self::Schema,
        Self::Project,
        Self::ProjectUserRole,
        Self::ProjectGroup,
        Self::CustomDisplay,
        Self::AnnotatorAnswer,
        Self::GroundTruth,
    ];

    /// Human label used in prompts and summaries.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Video => "video",
            Self::VideoTag => "video tag",
            Self::QuestionGroup => "question group",
            Self::Question => "question",
            Self::Schema => "schema",
            Self::Project => "project",
            Self::ProjectUserRole => "project role",
            Self::ProjectGroup => "project group",
            Self::CustomDisplay => "custom display",
            Self::AnnotatorAnswer => "annotator answer",
            Self::GroundTruth => "ground truth",
        }
    }

    /// Stable identifier used on the command line and in backup names.
    pub fn slug(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Video => "video",
            Self::VideoTag => "video-tag",
            Self::QuestionGroup => "question-group",
            Self::Question => "question",
            Self::Schema => "schema",
            Self::Project => "project",
            Self::ProjectUserRole => "role",
            Self::ProjectGroup => "project-group",
            Self::CustomDisplay => "display",
            Self::AnnotatorAnswer => "answer",
            Self::GroundTruth => "ground-truth",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// Whether deleting one row of this kind removes rows in other tables.
    pub fn is_cascading(self) -> bool {
        !matches!(
            self,
            Self::VideoTag
                | Self::ProjectUserRole
                | Self::CustomDisplay
                | Self::AnnotatorAnswer
                | Self::GroundTruth
        )
    }

    /// Typed confirmation required before deleting this kind.
    ///
    /// Cascading deletes require the exact word `DELETE`; single-row deletes
    /// take a case-insensitive yes.
    pub fn confirmation(self) -> Confirmation {
        if self.is_cascading() {
            Confirmation::Exact("DELETE")
        } else {
            Confirmation::YesNo
        }
    }

    /// What the warning banner says will disappear.
    pub fn warning(self) -> &'static str {
        match self {
            Self::User => {
                "the user, their project roles, answers, reviews and authored ground truth"
            }
            Self::Video => {
                "the video, its tags, project links, custom displays, answers and ground truth"
            }
            Self::QuestionGroup => "the question group and its schema/question links",
            Self::Question => {
                "the question and all answers, ground truth and custom displays across all projects"
            }
            Self::Schema => "the schema and ALL projects using it, with their answers and ground truth",
            Self::Project => {
                "all answers, ground truth, user assignments, video links and the project itself"
            }
            Self::ProjectGroup => "the project group and its memberships",
            Self::VideoTag => "the video tag",
            Self::ProjectUserRole => "the project role assignment",
            Self::CustomDisplay => "the custom display override",
            Self::AnnotatorAnswer => "the annotator answer and its review",
            Self::GroundTruth => "the ground truth answer",
        }
    }

    /// Extra line printed under the preview, when the cascade stops short of
    /// something an operator might expect to go.
    pub fn preview_note(self) -> Option<&'static str> {
        match self {
            Self::QuestionGroup => Some(
                "NOTE: Questions, schemas and project data are kept; only the group and its links go.",
            ),
            Self::ProjectGroup => Some("NOTE: Projects in the group are kept."),
            _ => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What to delete, keyed the way operators name records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionTarget {
    User(RecordRef),
    Video(RecordRef),
    VideoTag {
        video: RecordRef,
        tag: String,
    },
    QuestionGroup(RecordRef),
    Question(RecordRef),
    Schema(RecordRef),
    Project(RecordRef),
    ProjectUserRole {
        project: RecordRef,
        user: RecordRef,
        role: ProjectRole,
    },
    ProjectGroup(RecordRef),
    CustomDisplay {
        project: RecordRef,
        video: RecordRef,
        question: RecordRef,
    },
    AnnotatorAnswer {
        video: RecordRef,
        question: RecordRef,
        user: RecordRef,
        project: RecordRef,
    },
    GroundTruth {
        video: RecordRef,
        question: RecordRef,
        project: RecordRef,
    },
}

impl DeletionTarget {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Video(_) => EntityKind::Video,
            Self::VideoTag { .. } => EntityKind::VideoTag,
            Self::QuestionGroup(_) => EntityKind::QuestionGroup,
            Self::Question(_) => EntityKind::Question,
            Self::Schema(_) => EntityKind::Schema,
            Self::Project(_) => EntityKind::Project,
            Self::ProjectUserRole { .. } => EntityKind::ProjectUserRole,
            Self::ProjectGroup(_) => EntityKind::ProjectGroup,
            Self::CustomDisplay { .. } => EntityKind::CustomDisplay,
            Self::AnnotatorAnswer { .. } => EntityKind::AnnotatorAnswer,
            Self::GroundTruth { .. } => EntityKind::GroundTruth,
        }
    }

    /// Builds a target from a kind and its positional keys.
    ///
    /// # Errors
    /// Returns a message naming the expected keys when the arity is wrong or
    /// a role is unknown.
    pub fn from_keys(kind: EntityKind, keys: &[String]) -> Result<Self, String> {
        let usage = || format!("{} expects: {}", kind.slug(), key_usage(kind));
        let key = |idx: usize| RecordRef::parse(&keys[idx]);

        let expected = match kind {
            EntityKind::VideoTag => 2,
            EntityKind::ProjectUserRole
            | EntityKind::CustomDisplay
            | EntityKind::GroundTruth => 3,
            EntityKind::AnnotatorAnswer => 4,
            _ => 1,
        };
        if keys.len() != expected {
            return Err(usage());
        }

        let target = match kind {
            EntityKind::User => Self::User(key(0)),
            EntityKind::Video => Self::Video(key(0)),
            EntityKind::VideoTag => Self::VideoTag {
                video: key(0),
                tag: keys[1].clone(),
            },
            EntityKind::QuestionGroup => Self::QuestionGroup(key(0)),
            EntityKind::Question => Self::Question(key(0)),
            EntityKind::Schema => Self::Schema(key(0)),
            EntityKind::Project => Self::Project(key(0)),
            EntityKind::ProjectUserRole => Self::ProjectUserRole {
                project: key(0),
                user: key(1),
                role: keys[2].parse()?,
            },
            EntityKind::ProjectGroup => Self::ProjectGroup(key(0)),
            EntityKind::CustomDisplay => Self::CustomDisplay {
                project: key(0),
                video: key(1),
                question: key(2),
            },
            EntityKind::AnnotatorAnswer => Self::AnnotatorAnswer {
                video: key(0),
                question: key(1),
                user: key(2),
                project: key(3),
            },
            EntityKind::GroundTruth => Self::GroundTruth {
                video: key(0),
                question: key(1),
                project: key(2),
            },
        };
        Ok(target)
    }
}

impl Display for DeletionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(key)
            | Self::Video(key)
            | Self::QuestionGroup(key)
            | Self::Question(key)
            | Self::Schema(key)
            | Self::Project(key)
            | Self::ProjectGroup(key) => write!(f, "{} {key}", self.kind()),
            Self::VideoTag { video, tag } => write!(f, "video tag '{tag}' on video {video}"),
            Self::ProjectUserRole {
                project,
                user,
                role,
            } => write!(f, "{role} role of user {user} in project {project}"),
            Self::CustomDisplay {
                project,
                video,
                question,
            } => write!(
                f,
                "custom display for question {question} on video {video} in project {project}"
            ),
            Self::AnnotatorAnswer {
                video,
                question,
                user,
                project,
            } => write!(
                f,
                "answer of user {user} to question {question} on video {video} in project {project}"
            ),
            Self::GroundTruth {
                video,
                question,
                project,
            } => write!(
                f,
                "ground truth for question {question} on video {video} in project {project}"
            ),
        }
    }
}

/// Positional key names for each kind, as shown in usage messages.
pub fn key_usage(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "<id|user_id_str>",
        EntityKind::Video => "<id|video_uid>",
        EntityKind::VideoTag => "<video> <tag>",
        EntityKind::QuestionGroup => "<id|title>",
        EntityKind::Question => "<id|text>",
        EntityKind::Schema | EntityKind::Project | EntityKind::ProjectGroup => "<id|name>",
        EntityKind::ProjectUserRole => "<project> <user> <role>",
        EntityKind::CustomDisplay => "<project> <video> <question>",
        EntityKind::AnnotatorAnswer => "<video> <question> <user> <project>",
        EntityKind::GroundTruth => "<video> <question> <project>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ref_parses_ids_and_keys() {
        assert_eq!(RecordRef::parse("#7"), RecordRef::Id(7));
        assert_eq!(RecordRef::parse("42"), RecordRef::Key("42".to_string()));
        assert_eq!(RecordRef::parse("2024"), RecordRef::Key("2024".to_string()));
        assert_eq!(
            RecordRef::parse("Is the sky visible?"),
            RecordRef::Key("Is the sky visible?".to_string())
        );
        assert_eq!(RecordRef::parse("-3"), RecordRef::Key("-3".to_string()));
        assert_eq!(RecordRef::parse("#"), RecordRef::Key("#".to_string()));
        assert_eq!(RecordRef::parse("#-3"), RecordRef::Key("#-3".to_string()));
    }

    #[test]
    fn slugs_round_trip_for_every_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_slug(kind.slug()), Some(kind));
        }
        assert_eq!(EntityKind::from_slug("answers"), None);
    }

    #[test]
    fn cascading_kinds_require_exact_delete_word() {
        assert_eq!(
            EntityKind::Schema.confirmation(),
            Confirmation::Exact("DELETE")
        );
        assert_eq!(EntityKind::GroundTruth.confirmation(), Confirmation::YesNo);
    }

    #[test]
    fn from_keys_checks_arity_and_role() {
        let keys = |values: &[&str]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();

        let target =
            DeletionTarget::from_keys(EntityKind::ProjectUserRole, &keys(&["#3", "alice", "Reviewer"]))
                .unwrap();
        assert_eq!(
            target,
            DeletionTarget::ProjectUserRole {
                project: RecordRef::Id(3),
                user: RecordRef::Key("alice".to_string()),
                role: ProjectRole::Reviewer,
            }
        );

        let err = DeletionTarget::from_keys(EntityKind::AnnotatorAnswer, &keys(&["1", "2"]))
            .unwrap_err();
        assert!(err.contains("<video> <question> <user> <project>"));

        let err = DeletionTarget::from_keys(EntityKind::ProjectUserRole, &keys(&["1", "2", "owner"]))
            .unwrap_err();
        assert!(err.contains("unknown project role"));
    }
}
