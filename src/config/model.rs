// src/config/model.rs

use std::collections::BTreeMap;
use std::ops::Range;
use std::time::Duration;

use serde::Deserialize;

/// Untyped per-task settings, as read from the document and then patched
/// by override properties. Typed values are only extracted once every
/// layer has been merged (see [`crate::config::resolve`]).
pub type SettingsBag = BTreeMap<String, toml::Value>;

/// Default seconds between two iterations of a worker.
pub const DEFAULT_INTERVAL_SECS: u64 = 100;

/// Default worker count when neither an override nor the document sets one.
pub const DEFAULT_WORKER_COUNT: i64 = 1;

/// Top-level scheduling document as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// backoff_secs = 120
///
/// [task.daily]
/// command = "echo daily"
/// interval = 3600
/// worker_count = 2
/// ```
///
/// Every section is optional; an empty file describes zero tasks.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTaskDocument {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Keys are the logical task names.
    #[serde(default)]
    pub task: BTreeMap<String, SettingsBag>,
}

/// Validated document. Construct through `TryFrom<RawTaskDocument>`.
#[derive(Debug, Clone, Default)]
pub struct TaskDocument {
    pub scheduler: SchedulerSection,
    pub task: BTreeMap<String, SettingsBag>,
}

impl TaskDocument {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        task: BTreeMap<String, SettingsBag>,
    ) -> Self {
        Self { scheduler, task }
    }
}

/// `[scheduler]` section: knobs shared by every worker.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Fixed pause after a failed iteration.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Inclusive lower bound of the start-up jitter.
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,

    /// Exclusive upper bound of the start-up jitter.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,

    /// Log timing for every iteration.
    #[serde(default)]
    pub verbose: bool,
}

fn default_backoff_secs() -> u64 {
    120
}

fn default_jitter_min_ms() -> u64 {
    500
}

fn default_jitter_max_ms() -> u64 {
    16_000
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            backoff_secs: default_backoff_secs(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            verbose: false,
        }
    }
}

impl SchedulerSection {
    pub fn timing(&self) -> WorkerTiming {
        WorkerTiming {
            jitter_ms: self.jitter_min_ms..self.jitter_max_ms,
            backoff: Duration::from_secs(self.backoff_secs),
            verbose: self.verbose,
        }
    }
}

/// Timing parameters handed to every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerTiming {
    /// Start-up jitter range in milliseconds; an empty range means no jitter.
    pub jitter_ms: Range<u64>,
    pub backoff: Duration,
    pub verbose: bool,
}

impl Default for WorkerTiming {
    fn default() -> Self {
        SchedulerSection::default().timing()
    }
}

/// Scheduling parameters of one worker instance.
///
/// Built once by the resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    /// Worker name, `"<task_name>-<index>"`.
    pub name: String,
    /// Logical task name shared by all workers of the task.
    pub task_name: String,
    pub index: usize,
    /// Opaque to the scheduler; interpreted by the execution pool.
    pub command: String,
    /// Seconds to sleep between iterations.
    pub interval: u64,
    /// Idle pool capacity required before an iteration may start.
    pub min_idle: usize,
    pub run_once: bool,
    /// Resolved number of workers for `task_name`.
    pub worker_count: usize,
}

impl TaskConfig {
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}
