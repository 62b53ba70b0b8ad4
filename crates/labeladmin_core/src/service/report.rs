//! Plain-text summaries printed before and after maintenance operations.

use crate::model::deletion::{DeletionPreview, DeletionReport, TableCount};
use crate::model::schema_change::SchemaChangePreview;

/// `answer_reviews` -> `Answer reviews`.
pub fn table_caption(label: &str) -> String {
    let spaced = label.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn count_lines(counts: &[TableCount]) -> impl Iterator<Item = String> + '_ {
    counts
        .iter()
        .map(|entry| format!("  {}: {}", table_caption(entry.table), entry.count))
}

pub fn render_preview(preview: &DeletionPreview) -> Vec<String> {
    let kind = preview.target.kind();
    let mut lines = vec![format!(
        "=== {} {} DATA OVERVIEW ===",
        kind.label().to_uppercase(),
        preview.target.key_slug()
    )];
    lines.extend(
        preview
            .target
            .detail_lines()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}")),
    );
    lines.push(String::new());

    lines.push("DATA TO BE DELETED:".to_string());
    lines.extend(count_lines(&preview.data_counts));
    lines.push(format!("  {} record: 1", table_caption(kind.label())));
    lines.push(String::new());
    lines.push(format!("TOTAL RECORDS: {}", preview.total_records));

    if !preview.affected_projects.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "AFFECTED PROJECTS ({}):",
            preview.affected_projects.len()
        ));
        lines.extend(
            preview
                .affected_projects
                .iter()
                .map(|project| format!("  - {} (ID: {})", project.name, project.id)),
        );
    }
    if let Some(note) = kind.preview_note() {
        lines.push(String::new());
        lines.push(note.to_string());
    }
    lines
}

pub fn render_deletion(report: &DeletionReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Deleted {} records for {}",
        report.deleted_records,
        report.preview.target.subject()
    )];
    lines.extend(
        count_lines(&report.deleted)
            .filter(|line| !line.ends_with(": 0")),
    );
    if let Some(path) = &report.backup_path {
        lines.push(format!("Backup: {}", path.display()));
    }
    lines
}

pub fn render_schema_change(preview: &SchemaChangePreview) -> Vec<String> {
    let mut lines = vec![
        format!("=== PROJECT {} SCHEMA CHANGE ===", preview.project.id),
        format!("Project: {}", preview.project.name),
        format!("Current schema ID: {}", preview.project.schema_id),
        format!(
            "New schema: {} (ID: {})",
            preview.new_schema.name, preview.new_schema.id
        ),
        String::new(),
    ];
    if preview.removed_question_ids.is_empty() {
        lines.push("Removed questions: none".to_string());
    } else {
        let ids: Vec<String> = preview
            .removed_question_ids
            .iter()
            .map(i64::to_string)
            .collect();
        lines.push(format!(
            "Removed questions ({}): {}",
            ids.len(),
            ids.join(", ")
        ));
    }
    lines.push(String::new());
    lines.push("DATA TO BE DELETED:".to_string());
    lines.extend(count_lines(&preview.data_counts));
    lines.push(String::new());
    lines.push(format!("TOTAL RECORDS: {}", preview.total_records()));
    lines.push(format!(
        "Completion reset for {} project roles",
        preview.roles_reset
    ));
    lines
}
