use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use taskherd::config::overrides::{OverrideKey, parse_key};
use taskherd::config::{OverrideSet, parse_document, resolve_task_configs};
use taskherd::errors::TaskherdError;
use taskherd_test_utils::builders::{DocumentBuilder, TaskSpec};

const NS: &str = "taskherd";

fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,7}"
}

// Task name -> document worker count. Negative counts are included on purpose.
fn task_table() -> impl Strategy<Value = BTreeMap<String, i64>> {
    proptest::collection::btree_map("[a-z]{1,6}", -2i64..5, 0..6)
}

proptest! {
    #[test]
    fn task_keys_of_the_wrong_length_are_rejected(
        tail in proptest::collection::vec(segment(), 0..6)
            .prop_filter("exactly two segments is the valid shape", |v| v.len() != 2)
    ) {
        let key = if tail.is_empty() {
            format!("{NS}.task.")
        } else {
            format!("{NS}.task.{}", tail.join("."))
        };

        match parse_key(NS, &key) {
            Err(TaskherdError::InvalidConfig(msg)) => prop_assert!(msg.contains(&key)),
            other => prop_assert!(false, "expected InvalidConfig for {key}, got {other:?}"),
        }
    }

    #[test]
    fn well_formed_task_keys_always_parse(task in segment(), field in segment()) {
        let key = format!("{NS}.task.{task}.{field}");
        let parsed = parse_key(NS, &key).unwrap();
        let is_task_field = matches!(parsed, Some(OverrideKey::TaskField { task: ref t, .. }) if *t == task);
        prop_assert!(is_task_field);
    }

    #[test]
    fn keys_outside_the_namespace_are_ignored(tail in proptest::collection::vec(segment(), 1..6)) {
        let key = format!("elsewhere.{}", tail.join("."));
        prop_assert_eq!(parse_key(NS, &key).unwrap(), None);
    }

    #[test]
    fn resolved_worker_names_are_unique_and_counted(table in task_table(), min_cap in 0usize..4) {
        let mut builder = DocumentBuilder::new();
        for (name, count) in &table {
            builder = builder.with_task(name, TaskSpec::new("noop").worker_count(*count));
        }
        let doc = parse_document(&builder.to_toml()).unwrap();

        let configs = resolve_task_configs(&doc, &OverrideSet::default(), min_cap);

        // Negative document counts fall back to one worker; zero means none.
        let expected: usize = table
            .values()
            .map(|&n| if n < 0 { 1 } else { n as usize })
            .sum();
        prop_assert_eq!(configs.len(), expected);

        let names: HashSet<_> = configs.iter().map(|c| c.name.as_str()).collect();
        prop_assert_eq!(names.len(), configs.len());

        for cfg in &configs {
            prop_assert!(cfg.min_idle >= 1 && cfg.min_idle <= min_cap.max(1));
            prop_assert_eq!(&cfg.name, &format!("{}-{}", cfg.task_name, cfg.index));
        }
    }

    #[test]
    fn worker_count_override_wins_when_numeric(count in -3i64..6, doc_count in 0i64..4) {
        let doc = parse_document(
            &DocumentBuilder::new()
                .with_task("job", TaskSpec::new("noop").worker_count(doc_count))
                .to_toml(),
        )
        .unwrap();
        let overrides = OverrideSet::parse(NS, [(format!("{NS}.job.workerCount"), count.to_string())]).unwrap();

        let configs = resolve_task_configs(&doc, &overrides, 1);
        prop_assert_eq!(configs.len(), count.max(0) as usize);
    }
}
