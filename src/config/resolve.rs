// src/config/resolve.rs

//! Turns the document plus overrides into one [`TaskConfig`] per worker.
//!
//! Order of operations:
//! 1. merge override fields into each task's settings bag,
//! 2. resolve the worker count per task,
//! 3. expand each task into `name-0 .. name-(N-1)`.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::model::{
    DEFAULT_INTERVAL_SECS, DEFAULT_WORKER_COUNT, SettingsBag, TaskConfig, TaskDocument,
};
use crate::config::overrides::OverrideSet;

/// Merge override fields into the document's task bags.
///
/// Overrides patch individual fields; tasks that only exist as overrides
/// get a fresh bag.
pub fn merge_settings(
    document: &TaskDocument,
    overrides: &OverrideSet,
) -> BTreeMap<String, SettingsBag> {
    let mut merged = document.task.clone();

    for (task, fields) in &overrides.fields {
        let bag = merged.entry(task.clone()).or_default();
        for (field, value) in fields {
            bag.insert(field.clone(), toml::Value::String(value.clone()));
        }
    }

    merged
}

/// Worker count for `task`: override, then document `worker_count`, then 1.
///
/// Never fails; malformed values are logged and skipped.
pub fn resolve_worker_count(task: &str, bag: &SettingsBag, overrides: &OverrideSet) -> i64 {
    if let Some(raw) = overrides.worker_count(task) {
        match raw.trim().parse::<i64>() {
            Ok(n) => return n,
            Err(e) => warn!(
                task,
                value = raw,
                error = %e,
                "worker count override is not an integer; ignoring it"
            ),
        }
    }

    if let Some(value) = bag.get("worker_count") {
        match integer_of(value) {
            Some(n) if n > -1 => return n,
            _ => warn!(
                task,
                value = %value,
                "worker_count must be a non-negative integer; using default"
            ),
        }
    }

    DEFAULT_WORKER_COUNT
}

/// Build the per-worker configs of one task.
///
/// `min_capacity` is the pool's configured floor; it provides the default
/// `min_idle` and bounds it.
pub fn expand_task(
    task: &str,
    bag: &SettingsBag,
    worker_count: i64,
    min_capacity: usize,
) -> Vec<TaskConfig> {
    if worker_count <= 0 {
        info!(task, worker_count, "no worker started for task");
        return Vec::new();
    }

    let command = match bag.get("command").map(string_of) {
        Some(cmd) => cmd,
        None => {
            warn!(task, "task has no command; the pool will receive an empty one");
            String::new()
        }
    };

    let interval = match bag.get("interval") {
        None => DEFAULT_INTERVAL_SECS,
        Some(v) => match integer_of(v) {
            Some(n) if n >= 0 => n as u64,
            _ => {
                warn!(task, value = %v, "interval must be a non-negative integer; using default");
                DEFAULT_INTERVAL_SECS
            }
        },
    };

    let requested_min_idle = match bag.get("min_idle") {
        None => min_capacity as i64,
        Some(v) => integer_of(v).unwrap_or_else(|| {
            warn!(task, value = %v, "min_idle must be an integer; using pool minimum");
            min_capacity as i64
        }),
    };
    let min_idle = clamp_min_idle(requested_min_idle, min_capacity);

    let run_once = match bag.get("run_once") {
        None => false,
        Some(v) => bool_of(v).unwrap_or_else(|| {
            warn!(task, value = %v, "run_once must be a boolean; assuming false");
            false
        }),
    };

    let count = worker_count as usize;
    (0..count)
        .map(|index| TaskConfig {
            name: format!("{task}-{index}"),
            task_name: task.to_string(),
            index,
            command: command.clone(),
            interval,
            min_idle,
            run_once,
            worker_count: count,
        })
        .collect()
}

/// Resolve every task of the merged configuration.
pub fn resolve_task_configs(
    document: &TaskDocument,
    overrides: &OverrideSet,
    min_capacity: usize,
) -> Vec<TaskConfig> {
    merge_settings(document, overrides)
        .iter()
        .flat_map(|(task, bag)| {
            let count = resolve_worker_count(task, bag, overrides);
            expand_task(task, bag, count, min_capacity)
        })
        .collect()
}

/// `min_idle` is kept within `[1, min_capacity]` (a floor of 1 when the
/// pool reports no minimum).
pub fn clamp_min_idle(requested: i64, min_capacity: usize) -> usize {
    let upper = min_capacity.max(1) as i64;
    requested.max(1).min(upper) as usize
}

fn integer_of(value: &toml::Value) -> Option<i64> {
    match value {
        toml::Value::Integer(n) => Some(*n),
        toml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bool_of(value: &toml::Value) -> Option<bool> {
    match value {
        toml::Value::Boolean(b) => Some(*b),
        toml::Value::String(s) => s.trim().to_lowercase().parse().ok(),
        _ => None,
    }
}

fn string_of(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
