// src/exec/shell.rs

//! Production execution pool: every context runs its command through the
//! platform shell.

use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::JobError;
use crate::exec::pool::{ExecutionContext, ExecutionPool, JobFuture};

/// Fixed-size pool of shell execution slots.
#[derive(Debug)]
pub struct ShellPool {
    idle: Mutex<Vec<ShellContext>>,
    capacity: usize,
    min_capacity: usize,
}

impl ShellPool {
    /// `min_capacity` is clamped to `capacity`.
    pub fn new(capacity: usize, min_capacity: usize) -> Self {
        let idle = (0..capacity).rev().map(ShellContext::new).collect();
        info!(capacity, min_capacity, "shell execution pool ready");
        Self {
            idle: Mutex::new(idle),
            capacity,
            min_capacity: min_capacity.min(capacity),
        }
    }
}

impl ExecutionPool for ShellPool {
    fn idle_capacity(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn min_capacity(&self) -> usize {
        self.min_capacity
    }

    fn borrow(&self, label: &str) -> Result<Box<dyn ExecutionContext>, JobError> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        match idle.pop() {
            Some(ctx) => {
                debug!(worker = label, slot = ctx.id, "borrowed shell context");
                Ok(Box::new(ctx))
            }
            None => Err(JobError::failed(format!(
                "no idle execution context available for '{label}'"
            ))),
        }
    }

    fn release(&self, context: Option<Box<dyn ExecutionContext>>) {
        let Some(context) = context else {
            return;
        };

        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        let id = context.id();
        if id >= self.capacity || idle.iter().any(|c| c.id == id) {
            warn!(slot = id, "released context does not belong to this pool; dropping it");
            return;
        }
        idle.push(ShellContext::new(id));
        debug!(slot = id, "released shell context");
    }
}

#[derive(Debug)]
struct ShellContext {
    id: usize,
}

impl ShellContext {
    fn new(id: usize) -> Self {
        Self { id }
    }
}

impl ExecutionContext for ShellContext {
    fn id(&self) -> usize {
        self.id
    }

    fn run<'a>(&'a mut self, command: &'a str) -> JobFuture<'a> {
        Box::pin(async move { run_shell(self.id, command).await })
    }
}

async fn run_shell(slot: usize, command: &str) -> Result<String, JobError> {
    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(slot, cmd = %command, "starting command");

    let output = cmd
        .output()
        .await
        .with_context(|| format!("spawning process for command '{command}'"))
        .map_err(JobError::Failed)?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(slot, "stderr: {}", line);
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        return Err(JobError::failed(format!(
            "command '{command}' exited with status {code}"
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
