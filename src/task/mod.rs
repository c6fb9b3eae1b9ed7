// src/task/mod.rs

//! Workers and their lifecycle.
//!
//! - [`state`] holds the `TaskState` enum and its transition rules.
//! - [`worker`] implements `PeriodicalTask`, the per-worker loop.
//! - [`iteration`] runs one job on a borrowed execution context.

pub mod iteration;
pub mod state;
pub mod worker;

pub use iteration::run_iteration;
pub use state::TaskState;
pub use worker::{
    DESTROY_TIMEOUT, FATAL_EXIT_CODE, FatalHandler, PeriodicalTask, WorkerEnv,
    exit_process_handler,
};
