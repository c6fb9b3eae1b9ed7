use std::fmt::Write as _;
use std::path::Path;

use taskherd::fs::mock::MockFileSystem;

/// Builder for a task document (TOML text) to simplify test setup.
///
/// The `[scheduler]` section defaults to no start-up jitter and a one
/// second backoff so tests do not wait on production timings.
pub struct DocumentBuilder {
    backoff_secs: u64,
    jitter_ms: (u64, u64),
    verbose: bool,
    tasks: Vec<(String, TaskSpec)>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            backoff_secs: 1,
            jitter_ms: (0, 0),
            verbose: false,
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskSpec) -> Self {
        self.tasks.push((name.to_string(), task));
        self
    }

    pub fn backoff_secs(mut self, secs: u64) -> Self {
        self.backoff_secs = secs;
        self
    }

    pub fn jitter_ms(mut self, min: u64, max: u64) -> Self {
        self.jitter_ms = (min, max);
        self
    }

    pub fn verbose(mut self, val: bool) -> Self {
        self.verbose = val;
        self
    }

    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[scheduler]");
        let _ = writeln!(out, "backoff_secs = {}", self.backoff_secs);
        let _ = writeln!(out, "jitter_min_ms = {}", self.jitter_ms.0);
        let _ = writeln!(out, "jitter_max_ms = {}", self.jitter_ms.1);
        let _ = writeln!(out, "verbose = {}", self.verbose);

        for (name, task) in &self.tasks {
            let _ = writeln!(out, "\n[task.{name}]");
            for line in task.lines() {
                let _ = writeln!(out, "{line}");
            }
        }
        out
    }

    /// Write the document into a mock filesystem at `path`.
    pub fn install(&self, fs: &MockFileSystem, path: impl AsRef<Path>) {
        fs.add_file(path, self.to_toml());
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[task.<name>]` table. Unset fields are left out so the
/// resolver's defaults apply.
#[derive(Debug, Clone, Default)]
pub struct TaskSpec {
    command: Option<String>,
    interval: Option<i64>,
    min_idle: Option<i64>,
    run_once: Option<bool>,
    worker_count: Option<String>,
}

impl TaskSpec {
    pub fn new(command: &str) -> Self {
        Self {
            command: Some(command.to_string()),
            ..Self::default()
        }
    }

    pub fn interval(mut self, secs: i64) -> Self {
        self.interval = Some(secs);
        self
    }

    pub fn min_idle(mut self, n: i64) -> Self {
        self.min_idle = Some(n);
        self
    }

    pub fn run_once(mut self, val: bool) -> Self {
        self.run_once = Some(val);
        self
    }

    pub fn worker_count(mut self, n: i64) -> Self {
        self.worker_count = Some(n.to_string());
        self
    }

    /// Raw TOML value, e.g. `"\"lots\""` for a malformed count.
    pub fn worker_count_raw(mut self, raw: &str) -> Self {
        self.worker_count = Some(raw.to_string());
        self
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(cmd) = &self.command {
            lines.push(format!("command = {cmd:?}"));
        }
        if let Some(v) = self.interval {
            lines.push(format!("interval = {v}"));
        }
        if let Some(v) = self.min_idle {
            lines.push(format!("min_idle = {v}"));
        }
        if let Some(v) = self.run_once {
            lines.push(format!("run_once = {v}"));
        }
        if let Some(v) = &self.worker_count {
            lines.push(format!("worker_count = {v}"));
        }
        lines
    }
}
