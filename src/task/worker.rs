// src/task/worker.rs

//! `PeriodicalTask`: one worker instance of a configured task.
//!
//! Each worker owns a single tokio task running a sleep/poll loop:
//!
//! 1. sleep a random start-up jitter,
//! 2. if the worker is eligible and the pool reports enough idle capacity,
//!    run one iteration,
//! 3. sleep `interval` seconds and repeat.
//!
//! Workers are independent of each other; nothing serialises their
//! admission checks. Every sleep races the worker's cancellation token,
//! which is how `destroy()` stops the loop.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{TaskConfig, WorkerTiming};
use crate::errors::JobError;
use crate::exec::ExecutionPool;
use crate::task::iteration::run_iteration;
use crate::task::state::TaskState;

/// How long `destroy()` waits for the loop to notice cancellation.
pub const DESTROY_TIMEOUT: Duration = Duration::from_secs(2);

/// Exit status used by the default [`FatalHandler`].
pub const FATAL_EXIT_CODE: i32 = 70;

/// Called with `(worker name, reason)` when an iteration fails in a way the
/// scheduler cannot classify. The default terminates the process.
pub type FatalHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

pub fn exit_process_handler() -> FatalHandler {
    Arc::new(exit_on_fatal)
}

fn exit_on_fatal(worker: &str, reason: &str) {
    error!(
        task = %worker,
        reason,
        "background task hit an unexpected failure; taskherd cannot tell whether \
         it is safe to continue and will exit. Check the task's command and the \
         execution environment, then restart."
    );
    std::process::exit(FATAL_EXIT_CODE);
}

/// Collaborators shared by every worker of a registry.
#[derive(Clone)]
pub struct WorkerEnv {
    pub pool: Arc<dyn ExecutionPool>,
    pub timing: WorkerTiming,
    pub fatal: FatalHandler,
}

impl WorkerEnv {
    pub fn new(pool: Arc<dyn ExecutionPool>, timing: WorkerTiming) -> Self {
        Self {
            pool,
            timing,
            fatal: exit_process_handler(),
        }
    }

    pub fn with_fatal_handler(mut self, fatal: FatalHandler) -> Self {
        self.fatal = fatal;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WorkerStatus {
    state: TaskState,
    has_already_run: bool,
}

/// Result of an admission check.
enum Admission {
    Started,
    NotEligible,
    NoCapacity,
}

/// State shared between the worker handle and its loop.
struct Shared {
    config: TaskConfig,
    status: Mutex<WorkerStatus>,
    cancel: CancellationToken,
}

impl Shared {
    fn status(&self) -> MutexGuard<'_, WorkerStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn disable(&self) {
        let mut s = self.status();
        let next = s.state.on_disable();
        if next != s.state {
            debug!(task = %self.config.name, from = %s.state, to = %next, "disable");
        }
        s.state = next;
    }

    fn enable(&self) {
        let mut s = self.status();
        if self.config.run_once && s.has_already_run {
            info!(task = %self.config.name, "run-once task already ran; ignoring enable");
            return;
        }
        let next = s.state.on_enable();
        if next != s.state {
            debug!(task = %self.config.name, from = %s.state, to = %next, "enable");
        }
        s.state = next;
    }

    /// Check eligibility and capacity, and mark `Running` when both pass.
    fn try_begin(&self, has_capacity: impl FnOnce() -> bool) -> Admission {
        let mut s = self.status();
        if !s.state.is_eligible() {
            return Admission::NotEligible;
        }
        if !has_capacity() {
            return Admission::NoCapacity;
        }
        s.state = TaskState::Running;
        Admission::Started
    }

    fn finish_success(&self) {
        let mut s = self.status();
        s.state = s.state.on_iteration_done();
        if self.config.run_once {
            s.state = s.state.on_disable();
            s.has_already_run = true;
        }
    }

    /// Finalise a failed iteration. Returns `true` when the failure should
    /// be backed off from, `false` when the worker was halting and the
    /// failure is just the stop taking effect.
    fn finish_failure(&self) -> bool {
        let mut s = self.status();
        let halting = s.state == TaskState::Halting;
        s.state = s.state.on_iteration_done();
        !halting
    }

    fn finish_stopped(&self) {
        let mut s = self.status();
        s.state = s.state.on_iteration_done();
    }

    fn force_disabled(&self) {
        self.status().state = TaskState::Disabled;
    }
}

/// A running worker. Dropping it does not stop the loop; call
/// [`PeriodicalTask::destroy`].
pub struct PeriodicalTask {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PeriodicalTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicalTask")
            .field("name", &self.shared.config.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PeriodicalTask {
    /// Create the worker and start its loop on the current tokio runtime.
    pub fn spawn(config: TaskConfig, env: WorkerEnv) -> Self {
        let shared = Arc::new(Shared {
            config,
            status: Mutex::new(WorkerStatus::default()),
            cancel: CancellationToken::new(),
        });

        info!(
            task = %shared.config.name,
            interval = shared.config.interval,
            min_idle = shared.config.min_idle,
            run_once = shared.config.run_once,
            "starting worker"
        );

        let handle = tokio::spawn(run_loop(Arc::clone(&shared), env));

        Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &TaskConfig {
        &self.shared.config
    }

    pub fn state(&self) -> TaskState {
        self.shared.status().state
    }

    pub fn has_already_run(&self) -> bool {
        self.shared.status().has_already_run
    }

    pub fn enable(&self) {
        self.shared.enable();
    }

    pub fn disable(&self) {
        self.shared.disable();
    }

    /// True once the loop has exited (or was never started).
    pub fn is_finished(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(|h| h.is_finished())
    }

    /// Disable the worker and cancel its loop without waiting.
    pub fn request_stop(&self) {
        self.disable();
        self.shared.cancel.cancel();
    }

    /// Wait until `deadline` for the loop to exit. Returns whether it
    /// stopped cleanly; a loop that did not is aborted. Callers stopping
    /// several workers pass them one shared deadline.
    pub async fn wait_stopped(&self, deadline: Instant) -> bool {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(mut handle) = handle else {
            return true;
        };

        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(())) => {
                info!(task = %self.name(), "worker stopped");
                true
            }
            Ok(Err(e)) => {
                warn!(task = %self.name(), error = %e, "worker loop ended abnormally");
                false
            }
            Err(_) => {
                warn!(task = %self.name(), "worker did not stop in time; aborting it");
                handle.abort();
                false
            }
        }
    }

    /// `disable()`, cancel the loop and wait up to [`DESTROY_TIMEOUT`].
    pub async fn destroy(&self) -> bool {
        self.request_stop();
        self.wait_stopped(Instant::now() + DESTROY_TIMEOUT).await
    }
}

async fn run_loop(shared: Arc<Shared>, env: WorkerEnv) {
    let name = shared.config.name.clone();
    let jitter = pick_jitter(&env.timing);
    debug!(task = %name, jitter_ms = jitter.as_millis() as u64, "start-up jitter");

    if !sleep_or_cancelled(&shared.cancel, jitter).await {
        debug!(task = %name, "cancelled during start-up jitter");
        return;
    }

    loop {
        let admission = shared.try_begin(|| env.pool.idle_capacity() >= shared.config.min_idle);

        match admission {
            Admission::Started => {
                if !run_one(&shared, &env).await {
                    return;
                }
            }
            Admission::NoCapacity => {
                debug!(
                    task = %name,
                    min_idle = shared.config.min_idle,
                    "not enough idle capacity in the pool; skipping this cycle"
                );
            }
            Admission::NotEligible => {}
        }

        if !sleep_or_cancelled(&shared.cancel, shared.config.interval_duration()).await {
            break;
        }
    }

    debug!(task = %name, "worker loop exiting");
}

/// Run one iteration and settle the worker state. Returns `false` when the
/// loop must end (fatal failure, or cancellation while running or backing
/// off).
async fn run_one(shared: &Shared, env: &WorkerEnv) -> bool {
    let name = &shared.config.name;
    debug!(task = %name, "running iteration");

    let mut iteration = tokio::spawn(run_iteration(
        Arc::clone(&env.pool),
        name.clone(),
        shared.config.command.clone(),
        env.timing.verbose,
    ));

    let joined = tokio::select! {
        biased;
        joined = &mut iteration => joined,
        _ = shared.cancel.cancelled() => {
            // Aborting drops the lease, which hands the context back.
            iteration.abort();
            let _ = iteration.await;
            info!(task = %name, "iteration interrupted by shutdown");
            shared.finish_stopped();
            return false;
        }
    };

    let outcome = match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(JobError::Fatal(panic_message(e.into_panic()))),
        Err(e) => {
            debug!(task = %name, error = %e, "iteration was cancelled");
            shared.finish_stopped();
            return false;
        }
    };

    match outcome {
        Ok(_) => {
            shared.finish_success();
            true
        }
        Err(JobError::StopRequested) => {
            debug!(task = %name, "iteration stopped on request");
            shared.finish_stopped();
            true
        }
        Err(JobError::Failed(e)) => {
            if !shared.finish_failure() {
                info!(task = %name, "worker halted while its iteration was running");
                return true;
            }
            error!(
                task = %name,
                error = %format!("{e:#}"),
                backoff_secs = env.timing.backoff.as_secs(),
                "iteration failed; backing off"
            );
            sleep_or_cancelled(&shared.cancel, env.timing.backoff).await
        }
        Err(JobError::Fatal(reason)) => {
            shared.force_disabled();
            (env.fatal)(name, &reason);
            false
        }
    }
}

/// Sleep for `duration`. Returns `false` if cancelled first.
async fn sleep_or_cancelled(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn pick_jitter(timing: &WorkerTiming) -> Duration {
    if timing.jitter_ms.is_empty() {
        return Duration::ZERO;
    }
    let ms = rand::rng().random_range(timing.jitter_ms.clone());
    Duration::from_millis(ms)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with a non-string payload".to_string()
    }
}
