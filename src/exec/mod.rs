// src/exec/mod.rs

//! Execution layer.
//!
//! - [`pool`] defines the `ExecutionPool` / `ExecutionContext` traits the
//!   workers talk to.
//! - [`shell`] provides `ShellPool`, the production pool that runs commands
//!   with `tokio::process`.

pub mod pool;
pub mod shell;

pub use pool::{ExecutionContext, ExecutionPool, JobFuture};
pub use shell::ShellPool;
