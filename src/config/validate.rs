// src/config/validate.rs

use crate::config::model::{RawTaskDocument, TaskDocument};
use crate::errors::{Result, TaskherdError};

impl TryFrom<RawTaskDocument> for TaskDocument {
    type Error = crate::errors::TaskherdError;

    fn try_from(raw: RawTaskDocument) -> std::result::Result<Self, Self::Error> {
        validate_raw_document(&raw)?;
        Ok(TaskDocument::new_unchecked(raw.scheduler, raw.task))
    }
}

fn validate_raw_document(doc: &RawTaskDocument) -> Result<()> {
    validate_scheduler_section(doc)?;
    validate_task_names(doc)?;
    Ok(())
}

fn validate_scheduler_section(doc: &RawTaskDocument) -> Result<()> {
    let s = &doc.scheduler;
    if s.jitter_max_ms < s.jitter_min_ms {
        return Err(TaskherdError::InvalidConfig(format!(
            "[scheduler].jitter_max_ms ({}) must be >= jitter_min_ms ({})",
            s.jitter_max_ms, s.jitter_min_ms
        )));
    }
    Ok(())
}

fn validate_task_names(doc: &RawTaskDocument) -> Result<()> {
    for name in doc.task.keys() {
        if name.trim().is_empty() {
            return Err(TaskherdError::InvalidConfig(
                "task names must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}
