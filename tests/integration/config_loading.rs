// tests/integration/config_loading.rs

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};
use taskherd::config::{load_from_path, parse_document};
use taskherd::errors::TaskherdError;
use taskherd::exec::ShellPool;
use taskherd::{ScheduledTasks, TaskState};
use taskherd_test_utils::{init_tracing, wait_until};

#[test]
fn document_on_disk_is_loaded_with_scheduler_section() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[scheduler]
backoff_secs = 30
jitter_min_ms = 10
jitter_max_ms = 20
verbose = true

[task.daily]
command = "echo daily"
interval = 86400
worker_count = 2
"#
    )
    .unwrap();

    let doc = load_from_path(file.path()).unwrap();
    let timing = doc.scheduler.timing();
    assert_eq!(timing.backoff, Duration::from_secs(30));
    assert_eq!(timing.jitter_ms, 10..20);
    assert!(timing.verbose);
    assert!(doc.task.contains_key("daily"));
}

#[test]
fn scheduler_section_defaults_when_absent() {
    let doc = parse_document("[task.a]\ncommand = \"x\"\n").unwrap();
    let timing = doc.scheduler.timing();
    assert_eq!(timing.backoff, Duration::from_secs(120));
    assert_eq!(timing.jitter_ms, 500..16_000);
    assert!(!timing.verbose);
}

#[test]
fn missing_file_is_config_not_found() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Taskherd.toml");

    match load_from_path(&path) {
        Err(TaskherdError::ConfigNotFound(p)) => assert!(p.contains("Taskherd.toml")),
        other => panic!("expected ConfigNotFound, got {other:?}"),
    }
}

#[test]
fn directory_is_not_a_document() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load_from_path(dir.path()),
        Err(TaskherdError::ConfigNotFound(_))
    ));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[task.a\ncommand = ").unwrap();

    assert!(matches!(
        load_from_path(file.path()),
        Err(TaskherdError::TomlError(_))
    ));
}

#[test]
fn inverted_jitter_window_is_rejected() {
    let result = parse_document("[scheduler]\njitter_min_ms = 900\njitter_max_ms = 100\n");
    match result {
        Err(TaskherdError::InvalidConfig(msg)) => assert!(msg.contains("jitter")),
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[tokio::test]
async fn run_once_shell_task_runs_a_real_command() {
    init_tracing();

    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("ran.txt");
    let doc_path = dir.path().join("Taskherd.toml");
    std::fs::write(
        &doc_path,
        format!(
            "[scheduler]\njitter_min_ms = 0\njitter_max_ms = 0\n\n\
             [task.once]\ncommand = \"echo ran >> '{}'\"\ninterval = 1\nrun_once = true\n",
            marker.display()
        ),
    )
    .unwrap();

    let mut registry = ScheduledTasks::new(&doc_path, Arc::new(ShellPool::new(2, 1)));
    assert_eq!(registry.launch().unwrap(), 1);

    let disabled = wait_until(50, || registry.tasks()[0].state() == TaskState::Disabled).await;
    assert!(disabled, "run-once task did not finish");

    let contents = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(contents.trim(), "ran");

    registry.shutdown().await;
    assert!(registry.tasks().is_empty());
}
