//! Command-line parsing for `labeladmin`.

use labeladmin_core::model::target::parse_digits;
use labeladmin_core::{DeletionTarget, EntityKind, RecordRef};

pub const USAGE: &str = "\
usage:
  labeladmin init
  labeladmin check  <kind> <key...>
  labeladmin delete <kind> <key...> [--yes] [--no-backup]
  labeladmin delete-many <kind> <key> [<key> ...] [--confirm-each]
  labeladmin rename-question <original-text> <new-text> [--display <text>]
  labeladmin rename-group <group-id> <new-title> [--display <title>]
  labeladmin schema-change <project> <schema> [--apply]
  labeladmin defaults [--set <question-id> <option>]
  labeladmin replace-question <old-id> <new-id>
  labeladmin version

kinds: user video video-tag question-group question schema project role
       project-group display answer ground-truth
keys:  #<n> selects by id, anything else by name/text/uid (`12` is a key)
       delete-many compound keys are comma-separated; write `\\,` for a
       literal comma and `\\\\` for a backslash
       `--` ends flag parsing, so later arguments may start with `--`";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Check(DeletionTarget),
    Delete {
        target: DeletionTarget,
        confirm: bool,
        backup: bool,
    },
    DeleteMany {
        targets: Vec<DeletionTarget>,
        confirm_each: bool,
    },
    RenameQuestion {
        original: String,
        new_text: String,
        display: Option<String>,
    },
    RenameGroup {
        group_id: i64,
        title: String,
        display: Option<String>,
    },
    SchemaChange {
        project: RecordRef,
        schema: RecordRef,
        apply: bool,
    },
    Defaults {
        set: Option<(i64, String)>,
    },
    ReplaceQuestion {
        old_id: i64,
        new_id: i64,
    },
    Version,
}

/// Parses arguments after the program name.
///
/// # Errors
/// Returns a message suitable for printing above the usage text.
pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some((command, rest)) = args.split_first() else {
        return Err("missing command".to_string());
    };
    let (positional, flags) = split_flags(rest);

    match command.as_str() {
        "init" => {
            expect_flags(&flags, &[])?;
            if !positional.is_empty() {
                return Err("init takes no arguments".to_string());
            }
            Ok(Command::Init)
        }
        "check" => {
            expect_flags(&flags, &[])?;
            Ok(Command::Check(target_from(&positional)?))
        }
        "delete" => {
            expect_flags(&flags, &["--yes", "--no-backup"])?;
            Ok(Command::Delete {
                target: target_from(&positional)?,
                confirm: !has_flag(&flags, "--yes"),
                backup: !has_flag(&flags, "--no-backup"),
            })
        }
        "delete-many" => {
            expect_flags(&flags, &["--confirm-each"])?;
            let (kind, keys) = kind_and_keys(&positional)?;
            if keys.is_empty() {
                return Err(format!("delete-many {} needs at least one key", kind.slug()));
            }
            // Compound kinds take one comma-separated key group per target.
            let targets = keys
                .iter()
                .map(|group| DeletionTarget::from_keys(kind, &split_group(group, kind)?))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::DeleteMany {
                targets,
                confirm_each: has_flag(&flags, "--confirm-each"),
            })
        }
        "rename-question" => {
            expect_flags(&flags, &["--display"])?;
            let [original, new_text] = exact::<2>(&positional, "rename-question")?;
            Ok(Command::RenameQuestion {
                original,
                new_text,
                display: flag_value(&flags, "--display"),
            })
        }
        "rename-group" => {
            expect_flags(&flags, &["--display"])?;
            let [group_id, title] = exact::<2>(&positional, "rename-group")?;
            Ok(Command::RenameGroup {
                group_id: parse_id(&group_id)?,
                title,
                display: flag_value(&flags, "--display"),
            })
        }
        "schema-change" => {
            expect_flags(&flags, &["--apply"])?;
            let [project, schema] = exact::<2>(&positional, "schema-change")?;
            Ok(Command::SchemaChange {
                project: RecordRef::parse(&project),
                schema: RecordRef::parse(&schema),
                apply: has_flag(&flags, "--apply"),
            })
        }
        "defaults" => {
            expect_flags(&flags, &["--set"])?;
            if !positional.is_empty() {
                return Err("defaults takes no positional arguments".to_string());
            }
            let set = match flags.iter().find(|flag| flag.name == "--set") {
                Some(flag) => match flag.values.as_slice() {
                    [id, option] => Some((parse_id(id)?, option.clone())),
                    _ => return Err("--set expects <question-id> <option>".to_string()),
                },
                None => None,
            };
            Ok(Command::Defaults { set })
        }
        "replace-question" => {
            expect_flags(&flags, &[])?;
            let [old_id, new_id] = exact::<2>(&positional, "replace-question")?;
            Ok(Command::ReplaceQuestion {
                old_id: parse_id(&old_id)?,
                new_id: parse_id(&new_id)?,
            })
        }
        "version" | "--version" | "-V" => Ok(Command::Version),
        other => Err(format!("unknown command `{other}`")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Flag {
    name: String,
    values: Vec<String>,
}

/// Number of values each flag consumes.
fn flag_arity(name: &str) -> usize {
    match name {
        "--display" => 1,
        "--set" => 2,
        _ => 0,
    }
}

fn split_flags(args: &[String]) -> (Vec<String>, Vec<Flag>) {
    let mut positional = Vec::new();
    let mut flags = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            positional.extend(iter.by_ref().cloned());
        } else if arg.starts_with("--") {
            let values = iter.by_ref().take(flag_arity(arg)).cloned().collect();
            flags.push(Flag {
                name: arg.clone(),
                values,
            });
        } else {
            positional.push(arg.clone());
        }
    }
    (positional, flags)
}

fn expect_flags(flags: &[Flag], allowed: &[&str]) -> Result<(), String> {
    for flag in flags {
        if !allowed.contains(&flag.name.as_str()) {
            return Err(format!("unknown flag `{}`", flag.name));
        }
        if flag.values.len() != flag_arity(&flag.name) {
            return Err(format!("flag `{}` is missing its value", flag.name));
        }
    }
    Ok(())
}

fn has_flag(flags: &[Flag], name: &str) -> bool {
    flags.iter().any(|flag| flag.name == name)
}

fn flag_value(flags: &[Flag], name: &str) -> Option<String> {
    flags
        .iter()
        .find(|flag| flag.name == name)
        .and_then(|flag| flag.values.first().cloned())
}

fn kind_and_keys(positional: &[String]) -> Result<(EntityKind, &[String]), String> {
    let Some((kind, keys)) = positional.split_first() else {
        return Err("missing <kind>".to_string());
    };
    let kind = EntityKind::from_slug(kind).ok_or_else(|| format!("unknown kind `{kind}`"))?;
    Ok((kind, keys))
}

fn target_from(positional: &[String]) -> Result<DeletionTarget, String> {
    let (kind, keys) = kind_and_keys(positional)?;
    DeletionTarget::from_keys(kind, keys)
}

/// Splits a compound key group on unescaped commas; `\,` and `\\` unescape.
fn split_group(group: &str, kind: EntityKind) -> Result<Vec<String>, String> {
    if kind.is_cascading() {
        return Ok(vec![group.to_string()]);
    }
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = group.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(escaped @ (',' | '\\')) => current.push(escaped),
                _ => return Err(format!("dangling escape in `{group}`")),
            },
            ',' => parts.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    parts.push(current);
    Ok(parts)
}

fn exact<const N: usize>(positional: &[String], command: &str) -> Result<[String; N], String> {
    <[String; N]>::try_from(positional.to_vec())
        .map_err(|_| format!("{command} expects {N} arguments"))
}

/// Id-only arguments accept `12` as well as `#12`.
fn parse_id(raw: &str) -> Result<i64, String> {
    parse_digits(raw.strip_prefix('#').unwrap_or(raw))
        .ok_or_else(|| format!("expected a numeric id, got `{raw}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use labeladmin_core::ProjectRole;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn delete_flags_toggle_confirm_and_backup() {
        let command = parse_args(&args(&["delete", "project", "#3", "--yes", "--no-backup"])).unwrap();
        assert_eq!(
            command,
            Command::Delete {
                target: DeletionTarget::Project(RecordRef::Id(3)),
                confirm: false,
                backup: false,
            }
        );
    }

    #[test]
    fn compound_targets_take_positional_keys() {
        let command = parse_args(&args(&["check", "role", "Alpha", "alice", "reviewer"])).unwrap();
        assert_eq!(
            command,
            Command::Check(DeletionTarget::ProjectUserRole {
                project: RecordRef::Key("Alpha".to_string()),
                user: RecordRef::Key("alice".to_string()),
                role: ProjectRole::Reviewer,
            })
        );
    }

    #[test]
    fn delete_many_splits_compound_groups_on_commas() {
        let command = parse_args(&args(&[
            "delete-many",
            "video-tag",
            "v1,outdoor",
            "v2,night",
        ]))
        .unwrap();
        let Command::DeleteMany { targets, confirm_each } = command else {
            panic!("expected delete-many");
        };
        assert!(!confirm_each);
        assert_eq!(targets.len(), 2);
        assert_eq!(
            targets[1],
            DeletionTarget::VideoTag {
                video: RecordRef::Key("v2".to_string()),
                tag: "night".to_string(),
            }
        );

        let command = parse_args(&args(&["delete-many", "project", "#1", "Beta", "--confirm-each"]))
            .unwrap();
        assert_eq!(
            command,
            Command::DeleteMany {
                targets: vec![
                    DeletionTarget::Project(RecordRef::Id(1)),
                    DeletionTarget::Project(RecordRef::Key("Beta".to_string())),
                ],
                confirm_each: true,
            }
        );
    }

    #[test]
    fn rename_and_defaults_parse_flag_values() {
        assert_eq!(
            parse_args(&args(&["rename-question", "Old?", "New?", "--display", "Shown?"])).unwrap(),
            Command::RenameQuestion {
                original: "Old?".to_string(),
                new_text: "New?".to_string(),
                display: Some("Shown?".to_string()),
            }
        );
        assert_eq!(
            parse_args(&args(&["defaults", "--set", "6", "yes"])).unwrap(),
            Command::Defaults {
                set: Some((6, "yes".to_string()))
            }
        );
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse_args(&[]).unwrap_err().contains("missing command"));
        assert!(parse_args(&args(&["purge"])).unwrap_err().contains("unknown command"));
        assert!(parse_args(&args(&["check", "planet", "1"]))
            .unwrap_err()
            .contains("unknown kind"));
        assert!(parse_args(&args(&["delete", "user", "1", "--force"]))
            .unwrap_err()
            .contains("unknown flag"));
        assert!(parse_args(&args(&["rename-group", "abc", "Title"]))
            .unwrap_err()
            .contains("numeric id"));
        assert!(parse_args(&args(&["defaults", "--set", "6"]))
            .unwrap_err()
            .contains("missing its value"));
        assert!(parse_args(&args(&["delete-many", "video-tag", "v1,bad\\"]))
            .unwrap_err()
            .contains("dangling escape"));
    }

    #[test]
    fn only_hash_prefixed_keys_select_by_id() {
        assert_eq!(
            parse_args(&args(&["delete", "video", "2"])).unwrap(),
            Command::Delete {
                target: DeletionTarget::Video(RecordRef::Key("2".to_string())),
                confirm: true,
                backup: true,
            }
        );
        assert_eq!(
            parse_args(&args(&["check", "video", "#2"])).unwrap(),
            Command::Check(DeletionTarget::Video(RecordRef::Id(2)))
        );
        assert_eq!(
            parse_args(&args(&["replace-question", "#4", "3"])).unwrap(),
            Command::ReplaceQuestion {
                old_id: 4,
                new_id: 3
            }
        );
    }

    #[test]
    fn escaped_commas_and_end_of_flags_reach_keys() {
        let command = parse_args(&args(&[
            "delete-many",
            "video-tag",
            "v1,night\\, rainy",
            "--",
            "--weird,tag\\\\x",
        ]))
        .unwrap();
        assert_eq!(
            command,
            Command::DeleteMany {
                targets: vec![
                    DeletionTarget::VideoTag {
                        video: RecordRef::Key("v1".to_string()),
                        tag: "night, rainy".to_string(),
                    },
                    DeletionTarget::VideoTag {
                        video: RecordRef::Key("--weird".to_string()),
                        tag: "tag\\x".to_string(),
                    },
                ],
                confirm_each: false,
            }
        );

        assert_eq!(
            parse_args(&args(&["rename-question", "--", "--old?", "New?"])).unwrap(),
            Command::RenameQuestion {
                original: "--old?".to_string(),
                new_text: "New?".to_string(),
                display: None,
            }
        );
        assert_eq!(parse_args(&args(&["init"])).unwrap(), Command::Init);
    }
}
