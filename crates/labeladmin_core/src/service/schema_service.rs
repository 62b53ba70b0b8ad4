//! Moving a project onto another schema.
//!
//! # Invariants
//! - Archived schemas are never assigned.
//! - The switch runs in one immediate transaction together with the data
//!   cleanup it implies.

use crate::console::{confirm, Confirmation, Console};
use crate::model::deletion::DeleteOptions;
use crate::model::schema_change::{SchemaChangeOutcome, SchemaChangePreview, SchemaChangeReport};
use crate::model::target::RecordRef;
use crate::repo::lookup_repo::SqliteLookupRepository;
use crate::repo::schema_change_repo::SqliteSchemaChangeRepository;
use crate::service::maintenance_service::{MaintenanceError, MaintenanceResult, MaintenanceService};
use crate::service::report::render_schema_change;
use log::info;
use rusqlite::{Connection, TransactionBehavior};

impl<C: Console> MaintenanceService<C> {
    /// Previews switching `project` to `schema` and prints the summary.
    ///
    /// Returns `None` when either side does not resolve.
    ///
    /// # Errors
    /// - `InvalidRequest` when the target schema is archived.
    pub fn check_schema_change(
        &mut self,
        project: &RecordRef,
        schema: &RecordRef,
    ) -> MaintenanceResult<Option<SchemaChangePreview>> {
        let conn = self.sessions.open()?;
        match preview_schema_change(&conn, project, schema)? {
            Ok(preview) => {
                self.say_lines(render_schema_change(&preview));
                Ok(Some(preview))
            }
            Err(missing) => {
                self.console.say(&format!("Not found: {missing}"));
                Ok(None)
            }
        }
    }

    /// Switches `project` to `schema`.
    ///
    /// Drops every custom display of the project, drops answers and ground
    /// truth for questions the new schema lacks, and clears `completed_at`
    /// on the project's roles.
    pub fn change_project_schema(
        &mut self,
        project: &RecordRef,
        schema: &RecordRef,
        options: DeleteOptions,
    ) -> MaintenanceResult<SchemaChangeOutcome> {
        let Some(preview) = self.check_schema_change(project, schema)? else {
            return Ok(SchemaChangeOutcome::NotFound);
        };
        if preview.is_noop() {
            self.console.say(&format!(
                "Project '{}' already uses schema {}.",
                preview.project.name, preview.new_schema.id
            ));
            return Ok(SchemaChangeOutcome::Unchanged);
        }

        if options.confirm {
            let question = format!(
                "Switch project '{}' to schema '{}'",
                preview.project.name, preview.new_schema.name
            );
            if !confirm(&mut self.console, &question, Confirmation::YesNo)? {
                self.console.say("Schema change cancelled.");
                return Ok(SchemaChangeOutcome::Cancelled);
            }
        }

        let backup_path = if options.backup {
            self.take_backup(&format!("change_project_schema_{}", preview.project.id))
        } else {
            None
        };

        let mut conn = self.sessions.open()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = SqliteLookupRepository::new(&tx)
            .find_project(&RecordRef::Id(preview.project.id))?
            .map(|project| project.schema_id);
        let Some(current) = current else {
            self.console
                .say(&format!("Not found: project {}", preview.project.id));
            return Ok(SchemaChangeOutcome::NotFound);
        };
        let deleted = SqliteSchemaChangeRepository::new(&tx).apply(
            preview.project.id,
            current,
            preview.new_schema.id,
        )?;
        tx.commit()?;

        info!(
            "event=schema_change module=service status=ok project_id={} from_schema={current} to_schema={} deleted={}",
            preview.project.id,
            preview.new_schema.id,
            deleted.iter().map(|entry| entry.count).sum::<u64>()
        );
        self.console.say(&format!(
            "Updated project '{}' to schema {}",
            preview.project.name, preview.new_schema.id
        ));
        Ok(SchemaChangeOutcome::Changed(SchemaChangeReport {
            preview,
            deleted,
            backup_path,
        }))
    }
}

/// Builds the preview, or names the side that did not resolve.
fn preview_schema_change(
    conn: &Connection,
    project: &RecordRef,
    schema: &RecordRef,
) -> MaintenanceResult<Result<SchemaChangePreview, String>> {
    let lookup = SqliteLookupRepository::new(conn);
    let Some(project) = lookup.find_project(project)? else {
        return Ok(Err(format!("project {project}")));
    };
    let Some(new_schema) = lookup.find_schema(schema)? else {
        return Ok(Err(format!("schema {schema}")));
    };
    if new_schema.is_archived {
        return Err(MaintenanceError::InvalidRequest(format!(
            "schema {} '{}' is archived",
            new_schema.id, new_schema.name
        )));
    }

    let repo = SqliteSchemaChangeRepository::new(conn);
    let removed_question_ids = repo.removed_question_ids(project.schema_id, new_schema.id)?;
    let data_counts = repo.count(project.id, project.schema_id, new_schema.id)?;
    let roles_reset = repo.completed_roles(project.id)?;
    Ok(Ok(SchemaChangePreview {
        project,
        new_schema,
        removed_question_ids,
        data_counts,
        roles_reset,
    }))
}
