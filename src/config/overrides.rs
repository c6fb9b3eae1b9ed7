// src/config/overrides.rs

//! Process-wide override properties.
//!
//! Two key shapes are recognised, both rooted at a namespace `<ns>`:
//!
//! - `<ns>.task.<name>.<field>`: sets one field of task `<name>`. Every key
//!   under `<ns>.task.` must have exactly these four segments.
//! - `<ns>.<name>.workerCount`: worker-count override for `<name>`.
//!
//! Keys outside the namespace, or other shapes inside it, belong to other
//! subsystems and are ignored. Field names may be camelCase or snake_case;
//! they are stored in snake_case so they line up with document keys.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::errors::{Result, TaskherdError};

pub const DEFAULT_NAMESPACE: &str = "taskherd";

/// Fields a task override may set. Anything else is kept but warned about.
pub const KNOWN_FIELDS: &[&str] = &["command", "interval", "min_idle", "run_once", "worker_count"];

/// One parsed override key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideKey {
    TaskField { task: String, field: String },
    WorkerCount { task: String },
}

/// Classify `key`.
///
/// Returns `Ok(None)` for keys that are not task overrides and
/// `Err(InvalidConfig)` for keys under `<ns>.task.` with the wrong shape.
pub fn parse_key(namespace: &str, key: &str) -> Result<Option<OverrideKey>> {
    // The namespace may itself contain dots; only the part after it is split.
    let Some(rest) = key
        .strip_prefix(namespace)
        .and_then(|r| r.strip_prefix('.'))
    else {
        return Ok(None);
    };
    let segments: Vec<&str> = rest.split('.').collect();

    if rest.starts_with("task.") {
        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(TaskherdError::InvalidConfig(format!(
                "override key '{key}' must have the form {namespace}.task.<name>.<property>"
            )));
        }
        return Ok(Some(OverrideKey::TaskField {
            task: segments[1].to_string(),
            field: snake_case(segments[2]),
        }));
    }

    if segments.len() == 2 && !segments[0].is_empty() && snake_case(segments[1]) == "worker_count" {
        return Ok(Some(OverrideKey::WorkerCount {
            task: segments[0].to_string(),
        }));
    }

    Ok(None)
}

/// Validated overrides, grouped by task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSet {
    /// task name -> field (snake_case) -> raw value
    pub fields: BTreeMap<String, BTreeMap<String, String>>,
    /// task name -> raw worker count
    pub worker_counts: BTreeMap<String, String>,
}

impl OverrideSet {
    /// Parse every property, failing on the first malformed task key.
    pub fn parse<I, K, V>(namespace: &str, properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut set = OverrideSet::default();

        for (key, value) in properties {
            let key = key.as_ref();
            match parse_key(namespace, key)? {
                Some(OverrideKey::TaskField { task, field }) => {
                    if !KNOWN_FIELDS.contains(&field.as_str()) {
                        warn!(key, field = %field, "unknown task property in override");
                    }
                    set.fields
                        .entry(task)
                        .or_default()
                        .insert(field, value.into());
                }
                Some(OverrideKey::WorkerCount { task }) => {
                    set.worker_counts.insert(task, value.into());
                }
                None => debug!(key, "ignoring property outside the task namespace"),
            }
        }

        Ok(set)
    }

    pub fn worker_count(&self, task: &str) -> Option<&str> {
        self.worker_counts.get(task).map(String::as_str)
    }
}

/// Split a `key=value` assignment (CLI `--set`).
pub fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("invalid property assignment: {s} (expected KEY=VALUE)")),
    }
}

fn snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for (i, ch) in field.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_segment_task_key_is_a_field_override() {
        let key = parse_key("app", "app.task.adhoc.minIdle").unwrap();
        assert_eq!(
            key,
            Some(OverrideKey::TaskField {
                task: "adhoc".to_string(),
                field: "min_idle".to_string(),
            })
        );
    }

    #[test]
    fn wrong_shape_under_task_namespace_names_the_key() {
        for bad in ["app.task.adhoc", "app.task.a.b.c", "app.task..command"] {
            match parse_key("app", bad) {
                Err(TaskherdError::InvalidConfig(msg)) => assert!(msg.contains(bad), "{msg}"),
                other => panic!("expected InvalidConfig for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn worker_count_key_has_three_segments() {
        assert_eq!(
            parse_key("app", "app.daily.workerCount").unwrap(),
            Some(OverrideKey::WorkerCount {
                task: "daily".to_string()
            })
        );
        assert_eq!(parse_key("app", "app.daily.colour").unwrap(), None);
        assert_eq!(parse_key("app", "other.task.x.y.z").unwrap(), None);
    }

    #[test]
    fn dotted_namespace_is_stripped_before_splitting() {
        assert_eq!(
            parse_key("my.app", "my.app.task.adhoc.command").unwrap(),
            Some(OverrideKey::TaskField {
                task: "adhoc".to_string(),
                field: "command".to_string(),
            })
        );
        assert_eq!(
            parse_key("my.app", "my.app.daily.workerCount").unwrap(),
            Some(OverrideKey::WorkerCount {
                task: "daily".to_string()
            })
        );
        assert!(parse_key("my.app", "my.app.task.adhoc").is_err());
        assert_eq!(parse_key("my.app", "my.application.daily.workerCount").unwrap(), None);
    }

    #[test]
    fn overrides_group_by_task() {
        let set = OverrideSet::parse(
            "app",
            [
                ("app.task.adhoc.command", "X"),
                ("app.task.adhoc.runOnce", "true"),
                ("app.daily.workerCount", "3"),
                ("unrelated.key", "1"),
            ],
        )
        .unwrap();

        assert_eq!(set.fields["adhoc"]["command"], "X");
        assert_eq!(set.fields["adhoc"]["run_once"], "true");
        assert_eq!(set.worker_count("daily"), Some("3"));
        assert_eq!(set.worker_count("adhoc"), None);
    }

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(
            parse_assignment("a.b=c=d"),
            Ok(("a.b".to_string(), "c=d".to_string()))
        );
        assert!(parse_assignment("novalue").is_err());
    }
}
