mod common;

use common::Fixture;
use labeladmin_core::{DeletionOutcome, DeletionTarget, MaintenanceService, RecordRef, ScriptedConsole};

fn service(fixture: &Fixture, answers: &[&str]) -> MaintenanceService<ScriptedConsole> {
    MaintenanceService::new(
        fixture.sessions(),
        ScriptedConsole::new(answers.iter().copied()),
    )
}

fn projects(keys: &[&str]) -> Vec<DeletionTarget> {
    keys.iter()
        .map(|key| DeletionTarget::Project(RecordRef::parse(key)))
        .collect()
}

#[test]
fn batch_skips_missing_targets_and_asks_once() {
    let fixture = Fixture::seeded();
    let before = fixture.total_rows();
    let mut service = service(&fixture, &["DELETE_ALL"]);

    let report = service
        .delete_many(&projects(&["Alpha", "Missing", "#3"]), false)
        .unwrap();

    assert_eq!(report.skipped, vec!["project 'Missing'".to_string()]);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 0);
    assert!(!report.cancelled);
    assert_eq!(
        service.console().prompts(),
        ["\nDelete all 2 targets listed above? (DELETE_ALL/no): ".to_string()]
    );
    assert_eq!(fixture.count("projects"), 1);
    assert_eq!(before - fixture.total_rows(), report.previewed_records);
    assert!(report
        .items
        .iter()
        .all(|item| matches!(item.outcome, Some(DeletionOutcome::Deleted(_)))));
}

#[test]
fn batch_confirmation_requires_delete_all() {
    let fixture = Fixture::seeded();
    let before = fixture.snapshot();
    let mut service = service(&fixture, &["DELETE"]);

    let report = service
        .delete_many(&projects(&["Alpha", "Beta"]), false)
        .unwrap();

    assert!(report.cancelled);
    assert!(report.items.is_empty());
    assert_eq!(fixture.snapshot(), before);
    assert!(service.console().printed("Batch deletion cancelled."));
}

#[test]
fn confirm_each_prompts_per_target() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture, &["DELETE", "no"]);

    let report = service
        .delete_many(&projects(&["Alpha", "Beta"]), true)
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.items.len(), 2);
    assert_eq!(report.items[1].outcome, Some(DeletionOutcome::Cancelled));
    assert_eq!(service.console().prompts().len(), 2);
    assert_eq!(fixture.count("projects"), 2);
}

#[test]
fn batch_with_nothing_found_does_not_prompt() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture, &["DELETE_ALL"]);

    let report = service
        .delete_many(&projects(&["#100", "#101"]), false)
        .unwrap();

    assert_eq!(report.skipped.len(), 2);
    assert!(report.items.is_empty());
    assert!(service.console().prompts().is_empty());
    assert!(service.console().printed("Nothing to delete."));
}
