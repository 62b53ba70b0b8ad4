//! `labeladmin` operator entry point.
//!
//! # Responsibility
//! - Parse the command line and load configuration from the environment.
//! - Run one maintenance operation against the configured database; only
//!   `init` may create or migrate it.
//! - Map outcomes to exit codes: 0 success, 1 operation failed or declined,
//!   2 usage or configuration error.

mod args;

use args::{parse_args, Command, USAGE};
use labeladmin_core::model::deletion::DeleteOptions;
use labeladmin_core::{
    core_version, init_logging, AdminConfig, DeletionOutcome, EditError, EditService,
    MaintenanceService, OperationBackups, SchemaChangeOutcome, SessionFactory, StdConsole,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&raw) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    if command == Command::Version {
        println!("labeladmin {}", core_version());
        return ExitCode::SUCCESS;
    }

    let config = match AdminConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Some(log_dir) = &config.log_dir {
        let log_dir = std::path::absolute(log_dir).unwrap_or_else(|_| log_dir.clone());
        if let Err(err) = init_logging(&config.log_level, &log_dir.to_string_lossy()) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(command, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            log::error!("event=cli_run module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::from(1)
        }
    }
}

/// Runs one command; `Ok(false)` means nothing was changed (not found,
/// cancelled, conflict).
fn run(command: Command, config: &AdminConfig) -> Result<bool, String> {
    let sessions = SessionFactory::new(&config.database_path);
    let backups = || {
        config
            .backups_enabled
            .then(|| OperationBackups::from_config(config))
    };
    let maintenance = || {
        let service = MaintenanceService::new(sessions.clone(), StdConsole);
        match backups() {
            Some(backups) => service.with_backups(backups),
            None => service,
        }
    };
    let edits = || {
        let service = EditService::new(sessions.clone(), StdConsole);
        match backups() {
            Some(backups) => service.with_backups(backups),
            None => service,
        }
    };

    match command {
        Command::Init => {
            sessions.initialize().map_err(|err| err.to_string())?;
            println!("Database ready at {}", config.database_path.display());
            Ok(true)
        }
        Command::Check(target) => {
            let preview = maintenance().check(&target).map_err(|err| err.to_string())?;
            match preview {
                Some(preview) => {
                    print_json(&preview)?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        Command::Delete {
            target,
            confirm,
            backup,
        } => {
            let options = DeleteOptions { confirm, backup };
            let outcome = maintenance()
                .delete(&target, options)
                .map_err(|err| err.to_string())?;
            Ok(matches!(outcome, DeletionOutcome::Deleted(_)))
        }
        Command::DeleteMany {
            targets,
            confirm_each,
        } => {
            let report = maintenance()
                .delete_many(&targets, confirm_each)
                .map_err(|err| err.to_string())?;
            Ok(!report.cancelled && report.failed == 0 && report.succeeded > 0)
        }
        Command::RenameQuestion {
            original,
            new_text,
            display,
        } => edit_status(edits().rename_question(&original, &new_text, display.as_deref())),
        Command::RenameGroup {
            group_id,
            title,
            display,
        } => edit_status(edits().rename_question_group(group_id, &title, display.as_deref())),
        Command::SchemaChange {
            project,
            schema,
            apply,
        } => {
            let mut service = maintenance();
            if !apply {
                let preview = service
                    .check_schema_change(&project, &schema)
                    .map_err(|err| err.to_string())?;
                return Ok(preview.is_some());
            }
            let outcome = service
                .change_project_schema(&project, &schema, DeleteOptions::default())
                .map_err(|err| err.to_string())?;
            Ok(matches!(
                outcome,
                SchemaChangeOutcome::Changed(_) | SchemaChangeOutcome::Unchanged
            ))
        }
        Command::Defaults { set } => {
            let mut service = edits();
            match set {
                Some((question_id, option)) => service
                    .update_question_default(question_id, &option)
                    .map_err(|err| err.to_string()),
                None => service
                    .find_questions_without_default()
                    .map(|_| true)
                    .map_err(|err| err.to_string()),
            }
        }
        Command::ReplaceQuestion { old_id, new_id } => {
            edit_status(edits().replace_question(old_id, new_id))
        }
        Command::Version => Ok(true),
    }
}

/// Missing records and conflicts are printed and reported as `Ok(false)`.
fn edit_status<T>(result: Result<T, EditError>) -> Result<bool, String> {
    match result {
        Ok(_) => Ok(true),
        Err(err @ (EditError::NotFound(_) | EditError::Conflict(_))) => {
            eprintln!("error: {err}");
            Ok(false)
        }
        Err(err) => Err(err.to_string()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}
