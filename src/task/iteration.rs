// src/task/iteration.rs

//! A single job iteration: borrow a context, run the command, give the
//! context back.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::errors::JobError;
use crate::exec::{ExecutionContext, ExecutionPool};

/// Returns its context to the pool when dropped, whatever happened in
/// between. A lease whose borrow failed releases `None`.
struct Lease {
    pool: Arc<dyn ExecutionPool>,
    context: Option<Box<dyn ExecutionContext>>,
}

impl Lease {
    fn new(pool: Arc<dyn ExecutionPool>) -> Self {
        Self {
            pool,
            context: None,
        }
    }

    fn acquire(&mut self, label: &str) -> Result<&mut Box<dyn ExecutionContext>, JobError> {
        let ctx = self.pool.borrow(label)?;
        Ok(self.context.insert(ctx))
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.pool.release(self.context.take());
    }
}

/// Run `command` once on a context borrowed under `label`.
///
/// With `verbose` set, the elapsed time and output size are logged; they
/// never influence the result.
pub async fn run_iteration(
    pool: Arc<dyn ExecutionPool>,
    label: String,
    command: String,
    verbose: bool,
) -> Result<String, JobError> {
    let started = Instant::now();
    let mut lease = Lease::new(pool);

    let result = match lease.acquire(&label) {
        Ok(ctx) => ctx.run(&command).await,
        Err(e) => Err(e),
    };
    drop(lease);

    if verbose {
        info!(
            task = %label,
            elapsed_ms = started.elapsed().as_millis() as u64,
            output_bytes = result.as_ref().map(|s| s.len()).unwrap_or(0),
            ok = result.is_ok(),
            "iteration finished"
        );
    }

    result
}
