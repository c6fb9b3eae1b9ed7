// src/exec/pool.rs

//! Execution pool abstraction.
//!
//! The scheduler never runs a command itself. It asks an [`ExecutionPool`]
//! how much capacity is idle, borrows one [`ExecutionContext`], hands it the
//! command and returns it afterwards.
//!
//! - [`ShellPool`](crate::exec::ShellPool) is the production pool, running
//!   commands through the platform shell.
//! - Tests provide their own pool that records commands and scripts
//!   outcomes without spawning processes.

use std::future::Future;
use std::pin::Pin;

use crate::errors::JobError;

/// Future returned by [`ExecutionContext::run`]: the command's output.
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = Result<String, JobError>> + Send + 'a>>;

/// One execution slot, checked out for exclusive use by a single worker.
pub trait ExecutionContext: Send {
    /// Slot identifier within its pool.
    fn id(&self) -> usize;

    /// Execute an opaque command.
    fn run<'a>(&'a mut self, command: &'a str) -> JobFuture<'a>;
}

/// Bounded set of execution contexts shared by every worker.
///
/// Implementations must tolerate concurrent `borrow`/`release` from any
/// worker. `idle_capacity` is only an admission hint; a pool that needs a
/// hard ceiling enforces it in `borrow`.
pub trait ExecutionPool: Send + Sync {
    /// Contexts currently not checked out.
    fn idle_capacity(&self) -> usize;

    /// Configured capacity floor. Bounds every worker's `min_idle`.
    fn min_capacity(&self) -> usize;

    /// Check out a context for the worker named `label`.
    fn borrow(&self, label: &str) -> Result<Box<dyn ExecutionContext>, JobError>;

    /// Return a context. `None` (the borrow failed) is a no-op.
    fn release(&self, context: Option<Box<dyn ExecutionContext>>);
}
