// src/errors.rs

//! Crate-wide error types.
//!
//! - [`TaskherdError`] covers configuration and setup failures; these are
//!   fatal to `ScheduledTasks::launch`.
//! - [`JobError`] is what the execution layer reports for a single job
//!   iteration. Workers recover from `Failed`, treat `StopRequested` as a
//!   clean stop and escalate `Fatal`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskherdError {
    #[error("Configuration not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Outcome of a failed job iteration, as classified by the execution pool.
#[derive(Error, Debug)]
pub enum JobError {
    /// The command failed in an expected way (bad exit status, pool not
    /// ready, ...). The worker backs off and retries.
    #[error("job failed: {0:#}")]
    Failed(#[source] anyhow::Error),

    /// The job noticed its worker is being halted and gave up.
    #[error("stop requested")]
    StopRequested,

    /// Something the scheduler has no recovery story for.
    #[error("unexpected failure: {0}")]
    Fatal(String),
}

impl JobError {
    pub fn failed(msg: impl std::fmt::Display) -> Self {
        JobError::Failed(anyhow::anyhow!("{msg}"))
    }
}

pub type Result<T> = std::result::Result<T, TaskherdError>;
