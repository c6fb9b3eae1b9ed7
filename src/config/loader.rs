// src/config/loader.rs

use std::path::Path;

use tracing::debug;

use crate::config::model::{RawTaskDocument, TaskDocument};
use crate::errors::{Result, TaskherdError};
use crate::fs::{FileSystem, RealFileSystem};

/// Parse a document from TOML text and validate it.
///
/// Empty (or whitespace-only) text is a valid document with no tasks.
pub fn parse_document(contents: &str) -> Result<TaskDocument> {
    let raw: RawTaskDocument = toml::from_str(contents)?;
    TaskDocument::try_from(raw)
}

/// Load and validate the task document at `path` through `fs`.
///
/// A missing or unreadable file is reported as
/// [`TaskherdError::ConfigNotFound`]; callers are expected to treat it as
/// fatal.
pub fn load_document(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<TaskDocument> {
    let path = path.as_ref();

    if !fs.is_file(path) {
        return Err(TaskherdError::ConfigNotFound(path.display().to_string()));
    }

    let contents = fs.read_to_string(path).map_err(|e| {
        TaskherdError::ConfigNotFound(format!("{} ({e:#})", path.display()))
    })?;

    let doc = parse_document(&contents)?;
    debug!(path = %path.display(), tasks = doc.task.len(), "loaded task document");
    Ok(doc)
}

/// Load from the real filesystem.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<TaskDocument> {
    load_document(&RealFileSystem, path)
}
