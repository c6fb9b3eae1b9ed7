// src/task/state.rs

//! Per-worker lifecycle state and its transition rules.
//!
//! The variant order matters: a worker is *eligible* for a new iteration
//! iff its state is `<= Running`. A worker that was disabled mid-run sits
//! in `Halting`, which must already read as "not eligible" while the
//! in-flight iteration finishes.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskState {
    Idle,
    Running,
    Halting,
    Disabled,
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Idle
    }
}

impl TaskState {
    pub fn is_eligible(self) -> bool {
        self <= TaskState::Running
    }

    /// State after an administrative `disable()`.
    pub fn on_disable(self) -> TaskState {
        match self {
            TaskState::Running => TaskState::Halting,
            TaskState::Idle => TaskState::Disabled,
            TaskState::Halting | TaskState::Disabled => self,
        }
    }

    /// State after an administrative `enable()`.
    ///
    /// The run-once guard lives on the worker, not here.
    pub fn on_enable(self) -> TaskState {
        match self {
            TaskState::Halting => TaskState::Running,
            TaskState::Disabled => TaskState::Idle,
            TaskState::Idle | TaskState::Running => self,
        }
    }

    /// State once the loop has finished an iteration.
    pub fn on_iteration_done(self) -> TaskState {
        match self {
            TaskState::Running => TaskState::Idle,
            TaskState::Halting => TaskState::Disabled,
            TaskState::Idle | TaskState::Disabled => self,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Idle => "IDLE",
            TaskState::Running => "RUNNING",
            TaskState::Halting => "HALTING",
            TaskState::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
