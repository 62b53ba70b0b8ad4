//! Cascade plans: which rows disappear with a deletion root, and in which
//! order they are removed.
//!
//! # Responsibility
//! - Describe each cascade as an ordered list of table filters.
//! - Count a plan without touching data, and execute it inside a transaction.
//!
//! # Invariants
//! - Counting and deleting run the same filter with the same parameters, so
//!   a preview taken in the deleting transaction matches what is removed.
//! - Dependent rows are removed before the rows they reference; the root
//!   row goes last.
//! - Only single-key roots have dependent steps; every dependent filter
//!   binds `?1` alone.

use crate::model::deletion::TableCount;
use crate::model::records::TargetRecord;
use crate::model::target::EntityKind;
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// One table touched by a cascade.
///
/// `filter` is a static `WHERE` body whose `?N` placeholders bind to the
/// plan's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeStep {
    pub label: &'static str,
    pub table: &'static str,
    pub filter: &'static str,
}

const fn step(label: &'static str, table: &'static str, filter: &'static str) -> CascadeStep {
    CascadeStep {
        label,
        table,
        filter,
    }
}

const USER_STEPS: &[CascadeStep] = &[
    step(
        "answer_reviews",
        "answer_reviews",
        "answer_id IN (SELECT id FROM annotator_answers WHERE user_id = ?1) OR reviewer_id = ?1",
    ),
    step("annotator_answers", "annotator_answers", "user_id = ?1"),
    step("ground_truth", "reviewer_ground_truth", "reviewer_id = ?1"),
    step("project_user_roles", "project_user_roles", "user_id = ?1"),
];

const VIDEO_STEPS: &[CascadeStep] = &[
    step(
        "answer_reviews",
        "answer_reviews",
        "answer_id IN (SELECT id FROM annotator_answers WHERE video_id = ?1)",
    ),
    step("annotator_answers", "annotator_answers", "video_id = ?1"),
    step("ground_truth", "reviewer_ground_truth", "video_id = ?1"),
    step(
        "custom_displays",
        "project_video_question_displays",
        "video_id = ?1",
    ),
    step("video_tags", "video_tags", "video_id = ?1"),
    step("project_videos", "project_videos", "video_id = ?1"),
];

const QUESTION_GROUP_STEPS: &[CascadeStep] = &[
    step(
        "schema_question_groups",
        "schema_question_groups",
        "question_group_id = ?1",
    ),
    step(
        "question_group_questions",
        "question_group_questions",
        "question_group_id = ?1",
    ),
];

const QUESTION_STEPS: &[CascadeStep] = &[
    step(
        "answer_reviews",
        "answer_reviews",
        "answer_id IN (SELECT id FROM annotator_answers WHERE question_id = ?1)",
    ),
    step("annotator_answers", "annotator_answers", "question_id = ?1"),
    step("ground_truth", "reviewer_ground_truth", "question_id = ?1"),
    step(
        "custom_displays",
        "project_video_question_displays",
        "question_id = ?1",
    ),
    step(
        "question_group_questions",
        "question_group_questions",
        "question_id = ?1",
    ),
];

const SCHEMA_STEPS: &[CascadeStep] = &[
    step(
        "answer_reviews",
        "answer_reviews",
        "answer_id IN (SELECT id FROM annotator_answers WHERE project_id IN \
         (SELECT id FROM projects WHERE schema_id = ?1))",
    ),
    step(
        "annotator_answers",
        "annotator_answers",
        "project_id IN (SELECT id FROM projects WHERE schema_id = ?1)",
    ),
    step(
        "ground_truth",
        "reviewer_ground_truth",
        "project_id IN (SELECT id FROM projects WHERE schema_id = ?1)",
    ),
    step(
        "custom_displays",
        "project_video_question_displays",
        "project_id IN (SELECT id FROM projects WHERE schema_id = ?1)",
    ),
    step(
        "project_user_roles",
        "project_user_roles",
        "project_id IN (SELECT id FROM projects WHERE schema_id = ?1)",
    ),
    step(
        "project_videos",
        "project_videos",
        "project_id IN (SELECT id FROM projects WHERE schema_id = ?1)",
    ),
    step(
        "project_group_associations",
        "project_group_projects",
        "project_id IN (SELECT id FROM projects WHERE schema_id = ?1)",
    ),
    step("projects", "projects", "schema_id = ?1"),
    step("schema_question_groups", "schema_question_groups", "schema_id = ?1"),
];

const PROJECT_STEPS: &[CascadeStep] = &[
    step(
        "answer_reviews",
        "answer_reviews",
        "answer_id IN (SELECT id FROM annotator_answers WHERE project_id = ?1)",
    ),
    step("annotator_answers", "annotator_answers", "project_id = ?1"),
    step("ground_truth", "reviewer_ground_truth", "project_id = ?1"),
    step(
        "custom_displays",
        "project_video_question_displays",
        "project_id = ?1",
    ),
    step("project_user_roles", "project_user_roles", "project_id = ?1"),
    step("project_videos", "project_videos", "project_id = ?1"),
    step(
        "project_group_associations",
        "project_group_projects",
        "project_id = ?1",
    ),
];

const PROJECT_GROUP_STEPS: &[CascadeStep] = &[step(
    "project_group_associations",
    "project_group_projects",
    "project_group_id = ?1",
)];

const ANNOTATOR_ANSWER_STEPS: &[CascadeStep] =
    &[step("answer_reviews", "answer_reviews", "answer_id = ?1")];

/// Dependent steps for a kind, in deletion order. The root row is not
/// included.
pub fn dependent_steps(kind: EntityKind) -> &'static [CascadeStep] {
    match kind {
        EntityKind::User => USER_STEPS,
        EntityKind::Video => VIDEO_STEPS,
        EntityKind::QuestionGroup => QUESTION_GROUP_STEPS,
        EntityKind::Question => QUESTION_STEPS,
        EntityKind::Schema => SCHEMA_STEPS,
        EntityKind::Project => PROJECT_STEPS,
        EntityKind::ProjectGroup => PROJECT_GROUP_STEPS,
        EntityKind::AnnotatorAnswer => ANNOTATOR_ANSWER_STEPS,
        EntityKind::VideoTag
        | EntityKind::ProjectUserRole
        | EntityKind::CustomDisplay
        | EntityKind::GroundTruth => &[],
    }
}

/// Step removing the root row itself.
pub fn root_step(kind: EntityKind) -> CascadeStep {
    match kind {
        EntityKind::User => step("users", "users", "id = ?1"),
        EntityKind::Video => step("videos", "videos", "id = ?1"),
        EntityKind::VideoTag => step("video_tags", "video_tags", "video_id = ?1 AND tag = ?2"),
        EntityKind::QuestionGroup => step("question_groups", "question_groups", "id = ?1"),
        EntityKind::Question => step("questions", "questions", "id = ?1"),
        EntityKind::Schema => step("schemas", "schemas", "id = ?1"),
        EntityKind::Project => step("projects", "projects", "id = ?1"),
        EntityKind::ProjectUserRole => step(
            "project_user_roles",
            "project_user_roles",
            "project_id = ?1 AND user_id = ?2 AND role = ?3",
        ),
        EntityKind::ProjectGroup => step("project_groups", "project_groups", "id = ?1"),
        EntityKind::CustomDisplay => step(
            "custom_displays",
            "project_video_question_displays",
            "project_id = ?1 AND video_id = ?2 AND question_id = ?3",
        ),
        EntityKind::AnnotatorAnswer => {
            step("annotator_answers", "annotator_answers", "id = ?1")
        }
        EntityKind::GroundTruth => step(
            "ground_truth",
            "reviewer_ground_truth",
            "video_id = ?1 AND question_id = ?2 AND project_id = ?3",
        ),
    }
}

/// Ordered deletion plan for one resolved root row.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePlan {
    pub kind: EntityKind,
    pub steps: &'static [CascadeStep],
    pub root: CascadeStep,
    pub params: Vec<Value>,
}

impl CascadePlan {
    pub fn for_record(record: &TargetRecord) -> Self {
        let kind = record.kind();
        Self {
            kind,
            steps: dependent_steps(kind),
            root: root_step(kind),
            params: key_params(record),
        }
    }
}

fn key_params(record: &TargetRecord) -> Vec<Value> {
    match record {
        TargetRecord::User(r) => vec![Value::Integer(r.id)],
        TargetRecord::Video(r) => vec![Value::Integer(r.id)],
        TargetRecord::VideoTag(r) => vec![Value::Integer(r.video_id), Value::Text(r.tag.clone())],
        TargetRecord::QuestionGroup(r) => vec![Value::Integer(r.id)],
        TargetRecord::Question(r) => vec![Value::Integer(r.id)],
        TargetRecord::Schema(r) => vec![Value::Integer(r.id)],
        TargetRecord::Project(r) => vec![Value::Integer(r.id)],
        TargetRecord::ProjectUserRole(r) => vec![
            Value::Integer(r.project_id),
            Value::Integer(r.user_id),
            Value::Text(r.role.as_str().to_string()),
        ],
        TargetRecord::ProjectGroup(r) => vec![Value::Integer(r.id)],
        TargetRecord::CustomDisplay(r) => vec![
            Value::Integer(r.project_id),
            Value::Integer(r.video_id),
            Value::Integer(r.question_id),
        ],
        TargetRecord::AnnotatorAnswer(r) => vec![Value::Integer(r.id)],
        TargetRecord::GroundTruth(r) => vec![
            Value::Integer(r.video_id),
            Value::Integer(r.question_id),
            Value::Integer(r.project_id),
        ],
    }
}

/// Counts and deletes along cascade plans.
pub struct SqliteCascadeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCascadeRepository<'conn> {
    /// Binds to a connection or an open transaction (via deref).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Rows each dependent step would remove. Read-only.
    pub fn count(&self, plan: &CascadePlan) -> RepoResult<Vec<TableCount>> {
        let mut counts = Vec::with_capacity(plan.steps.len());
        for step in plan.steps {
            let count: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE {};", step.table, step.filter),
                params_from_iter(plan.params.iter()),
                |row| row.get(0),
            )?;
            counts.push(TableCount {
                table: step.label,
                count: count.max(0) as u64,
            });
        }
        Ok(counts)
    }

    /// Deletes every step in order, root last.
    ///
    /// Returns the rows removed per step, root included. The caller owns the
    /// transaction and decides whether to commit.
    ///
    /// # Errors
    /// - `InvalidData` when the root step removes anything other than one row.
    pub fn execute(&self, plan: &CascadePlan) -> RepoResult<Vec<TableCount>> {
        let mut deleted = Vec::with_capacity(plan.steps.len() + 1);
        for step in plan.steps.iter().chain(std::iter::once(&plan.root)) {
            let count = self.conn.execute(
                &format!("DELETE FROM {} WHERE {};", step.table, step.filter),
                params_from_iter(plan.params.iter()),
            )?;
            deleted.push(TableCount {
                table: step.label,
                count: count as u64,
            });
        }

        let root_removed = deleted.last().map(|entry| entry.count).unwrap_or_default();
        if root_removed != 1 {
            return Err(RepoError::InvalidData(format!(
                "{} root delete removed {root_removed} rows, expected 1",
                plan.kind
            )));
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::records::{ProjectRecord, ProjectUserRoleRecord};
    use crate::model::target::ProjectRole;

    #[test]
    fn every_kind_has_a_root_step() {
        for kind in EntityKind::ALL {
            let root = root_step(kind);
            assert!(!root.filter.is_empty(), "{kind} root filter");
            assert!(
                dependent_steps(kind)
                    .iter()
                    .all(|step| step.table != root.table),
                "{kind} must not delete its own table as a dependency"
            );
        }
    }

    #[test]
    fn single_row_kinds_have_no_dependents() {
        for kind in EntityKind::ALL {
            if !kind.is_cascading() && kind != EntityKind::AnnotatorAnswer {
                assert!(dependent_steps(kind).is_empty(), "{kind}");
            }
        }
    }

    #[test]
    fn reviews_are_removed_before_answers() {
        for kind in [
            EntityKind::User,
            EntityKind::Video,
            EntityKind::Question,
            EntityKind::Schema,
            EntityKind::Project,
        ] {
            let labels: Vec<_> = dependent_steps(kind).iter().map(|s| s.label).collect();
            let reviews = labels.iter().position(|l| *l == "answer_reviews");
            let answers = labels.iter().position(|l| *l == "annotator_answers");
            assert!(reviews < answers, "{kind}: {labels:?}");
        }
    }

    #[test]
    fn plan_binds_compound_keys_in_filter_order() {
        let plan = CascadePlan::for_record(&TargetRecord::ProjectUserRole(
            ProjectUserRoleRecord {
                project_id: 4,
                user_id: 9,
                role: ProjectRole::Annotator,
                is_archived: false,
            },
        ));
        assert_eq!(
            plan.params,
            vec![
                Value::Integer(4),
                Value::Integer(9),
                Value::Text("annotator".to_string())
            ]
        );

        let plan = CascadePlan::for_record(&TargetRecord::Project(ProjectRecord {
            id: 3,
            name: "Alpha".to_string(),
            schema_id: 1,
            is_archived: false,
        }));
        assert_eq!(plan.params, vec![Value::Integer(3)]);
        assert_eq!(plan.root.table, "projects");
    }
}
