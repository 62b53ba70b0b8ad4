mod common;

use common::Fixture;
use labeladmin_core::{EditError, EditService, OperationBackups, ScriptedConsole, SqliteBackup};
use rusqlite::OptionalExtension;

fn service(fixture: &Fixture) -> EditService<ScriptedConsole> {
    EditService::new(fixture.sessions(), ScriptedConsole::default())
}

fn question_text(fixture: &Fixture, id: i64) -> Option<(String, String)> {
    fixture
        .conn()
        .query_row(
            "SELECT text, display_text FROM questions WHERE id = ?1;",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .unwrap()
}

#[test]
fn rename_question_defaults_display_text_to_new_text() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture);

    let renamed = service
        .rename_question("Is it bright?", "Is the scene bright?", None)
        .unwrap();

    assert_eq!(renamed.id, 1);
    assert_eq!(
        question_text(&fixture, 1),
        Some((
            "Is the scene bright?".to_string(),
            "Is the scene bright?".to_string()
        ))
    );
}

#[test]
fn rename_question_keeps_explicit_display_text() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture);

    service
        .rename_question("Camera angle?", "Camera angle (v2)?", Some("Camera angle?"))
        .unwrap();

    assert_eq!(
        question_text(&fixture, 3),
        Some((
            "Camera angle (v2)?".to_string(),
            "Camera angle?".to_string()
        ))
    );
}

#[test]
fn rename_question_to_existing_text_is_a_conflict() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture);

    let err = service
        .rename_question("Is it bright?", "Is there a shadow?", None)
        .unwrap_err();

    assert!(matches!(err, EditError::Conflict(_)), "{err}");
    assert_eq!(question_text(&fixture, 1).unwrap().0, "Is it bright?");
}

#[test]
fn rename_question_to_its_own_text_is_allowed() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture);

    service
        .rename_question("Is it bright?", "Is it bright?", Some("Bright?"))
        .unwrap();

    assert_eq!(question_text(&fixture, 1).unwrap().1, "Bright?");
}

#[test]
fn rename_missing_question_is_not_found() {
    let fixture = Fixture::seeded();
    let err = service(&fixture)
        .rename_question("No such question", "Anything", None)
        .unwrap_err();
    assert!(matches!(err, EditError::NotFound(_)));
}

#[test]
fn rename_group_checks_both_titles_against_other_groups() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture);

    let err = service
        .rename_question_group(1, "Camera", None)
        .unwrap_err();
    assert!(matches!(err, EditError::Conflict(ref message) if message.contains("title")));

    let err = service
        .rename_question_group(1, "Light", Some("Camera setup"))
        .unwrap_err();
    assert!(matches!(err, EditError::Conflict(ref message) if message.contains("display_title")));

    let renamed = service
        .rename_question_group(1, "Light", Some("Lighting conditions"))
        .unwrap();
    assert_eq!(renamed.title, "Light");
    assert_eq!(renamed.display_title, "Lighting conditions");
}

#[test]
fn rename_takes_a_backup_first() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture).with_backups(OperationBackups::new(
        Box::new(SqliteBackup::new(&fixture.db_path)),
        fixture.backup_dir(),
        10,
        false,
    ));

    service.rename_question_group(2, "Camera rig", None).unwrap();

    let backups: Vec<_> = std::fs::read_dir(fixture.backup_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(backups.len(), 1);
    assert!(backups[0].starts_with("backup_before_update_qgroup_2_"));
}

#[test]
fn questions_without_default_are_listed_and_updated() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture);

    let missing = service.find_questions_without_default().unwrap();
    let ids: Vec<_> = missing.iter().map(|question| question.id).collect();
    assert_eq!(ids, vec![3, 4]);

    assert!(service.update_question_default(3, "low").unwrap());
    assert!(!service.update_question_default(99, "low").unwrap());
    assert!(service
        .console()
        .printed("Question with ID 99 not found"));

    let missing = service.find_questions_without_default().unwrap();
    assert_eq!(missing.len(), 1);
}

#[test]
fn replace_question_repoints_references_and_drops_duplicates() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture);

    // Answer 5 and the Gamma ground truth move over; the Lighting group link
    // already exists for question 1 and is dropped.
    let report = service.replace_question(2, 1).unwrap();

    assert_eq!(report.old_id, 2);
    let moved: u64 = report.moved.iter().map(|entry| entry.count).sum();
    assert_eq!(moved, 2);
    let dropped: u64 = report.dropped.iter().map(|entry| entry.count).sum();
    assert_eq!(dropped, 1, "{:?}", report.dropped);
    let referenced: u64 = report.references.iter().map(|entry| entry.count).sum();
    assert_eq!(referenced, moved + dropped);
    assert!(service
        .console()
        .printed("Question 2 references to move to 1:"));

    assert!(question_text(&fixture, 2).is_none());
    assert_eq!(fixture.count("annotator_answers"), 5);
    assert_eq!(fixture.count("question_group_questions"), 3);
}

#[test]
fn replace_question_requires_both_questions() {
    let fixture = Fixture::seeded();
    let mut service = service(&fixture);

    assert!(matches!(
        service.replace_question(2, 42),
        Err(EditError::NotFound(_))
    ));
    assert!(matches!(
        service.replace_question(2, 2),
        Err(EditError::Conflict(_))
    ));
    assert!(question_text(&fixture, 2).is_some());
}
