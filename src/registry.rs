// src/registry.rs

//! `ScheduledTasks`: the registry that owns every worker.
//!
//! It resolves configuration (document + override properties), starts one
//! `PeriodicalTask` per resolved `TaskConfig`, and broadcasts
//! enable/disable/shutdown to the workers it tracks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{
    OverrideSet, TaskConfig, WorkerTiming, DEFAULT_NAMESPACE, load_document, resolve_task_configs,
};
use crate::errors::Result;
use crate::exec::ExecutionPool;
use crate::fs::{FileSystem, RealFileSystem};
use crate::task::{
    DESTROY_TIMEOUT, FatalHandler, PeriodicalTask, TaskState, WorkerEnv, exit_process_handler,
};

/// Environment variable that, when truthy, acts as the kill switch.
pub const NO_BACKGROUND_JOBS_ENV: &str = "TASKHERD_NO_BACKGROUND_JOBS";

/// Process-wide launch switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Root of every override property key.
    pub namespace: String,
    /// Kill switch: when set, `launch()` starts nothing and returns 0.
    pub no_background_jobs: bool,
    /// Force iteration instrumentation on, whatever the document says.
    pub verbose: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            no_background_jobs: false,
            verbose: false,
        }
    }
}

impl LaunchOptions {
    /// Defaults, with the kill switch read from [`NO_BACKGROUND_JOBS_ENV`].
    pub fn from_env() -> Self {
        let no_background_jobs = std::env::var(NO_BACKGROUND_JOBS_ENV)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            no_background_jobs,
            ..Self::default()
        }
    }
}

/// Output of configuration resolution, before anything is started.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub configs: Vec<TaskConfig>,
    pub timing: WorkerTiming,
}

pub struct ScheduledTasks {
    config_path: PathBuf,
    fs: Arc<dyn FileSystem>,
    properties: Vec<(String, String)>,
    options: LaunchOptions,
    pool: Arc<dyn ExecutionPool>,
    fatal: FatalHandler,
    tasks: Vec<PeriodicalTask>,
    enabled: bool,
}

impl std::fmt::Debug for ScheduledTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTasks")
            .field("config_path", &self.config_path)
            .field("options", &self.options)
            .field("tasks", &self.tasks)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl ScheduledTasks {
    pub fn new(config_path: impl AsRef<Path>, pool: Arc<dyn ExecutionPool>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            fs: Arc::new(RealFileSystem),
            properties: Vec::new(),
            options: LaunchOptions::default(),
            pool,
            fatal: exit_process_handler(),
            tasks: Vec::new(),
            enabled: false,
        }
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Override properties (`<ns>.task.<name>.<field>`, `<ns>.<name>.workerCount`).
    pub fn with_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_options(mut self, options: LaunchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fatal_handler(mut self, fatal: FatalHandler) -> Self {
        self.fatal = fatal;
        self
    }

    /// Load and merge configuration without starting anything.
    pub fn resolve(&self) -> Result<Resolved> {
        let overrides = OverrideSet::parse(
            &self.options.namespace,
            self.properties.iter().map(|(k, v)| (k.as_str(), v.clone())),
        )?;
        let document = load_document(self.fs.as_ref(), &self.config_path)?;

        let configs = resolve_task_configs(&document, &overrides, self.pool.min_capacity());
        debug!(workers = configs.len(), "resolved worker configs");

        let mut timing = document.scheduler.timing();
        timing.verbose |= self.options.verbose;

        Ok(Resolved { configs, timing })
    }

    /// Resolve configuration and start every worker. Returns the number of
    /// workers started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch(&mut self) -> Result<usize> {
        if self.background_jobs_disabled() {
            info!("background jobs are disabled; no worker started");
            return Ok(0);
        }

        if !self.tasks.is_empty() {
            warn!(
                workers = self.tasks.len(),
                "scheduler already launched; shut it down before launching again"
            );
            return Ok(self.tasks.len());
        }

        let Resolved { configs, timing } = self.resolve()?;
        let env = WorkerEnv::new(Arc::clone(&self.pool), timing)
            .with_fatal_handler(Arc::clone(&self.fatal));

        self.tasks = configs
            .into_iter()
            .map(|cfg| PeriodicalTask::spawn(cfg, env.clone()))
            .collect();
        self.enabled = true;

        info!(workers = self.tasks.len(), "scheduler launched");
        Ok(self.tasks.len())
    }

    /// Destroy every worker and forget about them. Safe to call repeatedly.
    pub async fn shutdown(&mut self) {
        if self.tasks.is_empty() {
            self.enabled = false;
            return;
        }

        info!(workers = self.tasks.len(), "shutting down scheduler");

        // Cancel everything first; the waits below share one deadline.
        for task in &self.tasks {
            task.request_stop();
        }

        let deadline = Instant::now() + DESTROY_TIMEOUT;
        let mut clean = 0usize;
        for task in &self.tasks {
            if task.wait_stopped(deadline).await {
                clean += 1;
            }
        }

        info!(
            stopped_cleanly = clean,
            total = self.tasks.len(),
            "scheduler shut down"
        );
        self.tasks.clear();
        self.enabled = false;
    }

    pub fn enable_all(&mut self) {
        for task in &self.tasks {
            task.enable();
        }
        self.enabled = true;
        info!(workers = self.tasks.len(), "all workers enabled");
    }

    pub fn disable_all(&mut self) {
        for task in &self.tasks {
            task.disable();
        }
        self.enabled = false;
        info!(workers = self.tasks.len(), "all workers disabled");
    }

    /// Whether the kill switch is on.
    pub fn background_jobs_disabled(&self) -> bool {
        self.options.no_background_jobs
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Live workers. Do not hold on to them past `shutdown()`.
    pub fn tasks(&self) -> &[PeriodicalTask] {
        &self.tasks
    }

    /// `(worker name, state)` snapshot of every tracked worker.
    pub fn status(&self) -> Vec<(String, TaskState)> {
        self.tasks
            .iter()
            .map(|t| (t.name().to_string(), t.state()))
            .collect()
    }
}
