// src/config/mod.rs

//! Configuration loading and resolution for taskherd.
//!
//! Responsibilities:
//! - Define the TOML-backed document model (`model.rs`).
//! - Load the document through the filesystem abstraction (`loader.rs`).
//! - Validate basic invariants of the document (`validate.rs`).
//! - Parse override properties into a validated set (`overrides.rs`).
//! - Merge both layers into per-worker `TaskConfig`s (`resolve.rs`).

pub mod loader;
pub mod model;
pub mod overrides;
pub mod resolve;
pub mod validate;

pub use loader::{load_document, load_from_path, parse_document};
pub use model::{RawTaskDocument, SchedulerSection, SettingsBag, TaskConfig, TaskDocument, WorkerTiming};
pub use overrides::{DEFAULT_NAMESPACE, OverrideKey, OverrideSet};
pub use resolve::resolve_task_configs;
