use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use taskherd::errors::JobError;
use taskherd::exec::{ExecutionContext, ExecutionPool, JobFuture};

/// What a fake context does when asked to run a command.
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeed,
    Fail,
    StopRequested,
    Fatal,
    Panic,
    /// Block until the notify fires, then succeed.
    WaitFor(Arc<Notify>),
    /// Block until the notify fires, then fail.
    WaitThenFail(Arc<Notify>),
}

/// One recorded `run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub worker: String,
    pub command: String,
}

struct Inner {
    capacity: usize,
    min_capacity: usize,
    idle: AtomicUsize,
    borrow_fails: AtomicBool,
    outcomes: Mutex<HashMap<String, Outcome>>,
    runs: Mutex<Vec<RunRecord>>,
    borrows: AtomicUsize,
    releases: AtomicUsize,
    empty_releases: AtomicUsize,
}

/// A pool that never spawns anything:
/// - records which commands were "run" and by which worker
/// - returns scripted outcomes per command (default: success)
/// - tracks borrow/release counts so tests can check contexts are returned.
#[derive(Clone)]
pub struct FakePool {
    inner: Arc<Inner>,
}

impl FakePool {
    pub fn new(capacity: usize, min_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                min_capacity,
                idle: AtomicUsize::new(capacity),
                borrow_fails: AtomicBool::new(false),
                outcomes: Mutex::new(HashMap::new()),
                runs: Mutex::new(Vec::new()),
                borrows: AtomicUsize::new(0),
                releases: AtomicUsize::new(0),
                empty_releases: AtomicUsize::new(0),
            }),
        }
    }

    pub fn shared(self) -> Arc<dyn ExecutionPool> {
        Arc::new(self)
    }

    pub fn script(&self, command: &str, outcome: Outcome) {
        self.inner
            .outcomes
            .lock()
            .unwrap()
            .insert(command.to_string(), outcome);
    }

    /// Pretend other users hold contexts: report `idle` no matter what.
    pub fn set_idle(&self, idle: usize) {
        self.inner.idle.store(idle, Ordering::SeqCst);
    }

    pub fn fail_borrows(&self, fail: bool) {
        self.inner.borrow_fails.store(fail, Ordering::SeqCst);
    }

    pub fn runs(&self) -> Vec<RunRecord> {
        self.inner.runs.lock().unwrap().clone()
    }

    pub fn runs_of(&self, command: &str) -> usize {
        self.runs().iter().filter(|r| r.command == command).count()
    }

    pub fn borrows(&self) -> usize {
        self.inner.borrows.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }

    pub fn empty_releases(&self) -> usize {
        self.inner.empty_releases.load(Ordering::SeqCst)
    }
}

impl ExecutionPool for FakePool {
    fn idle_capacity(&self) -> usize {
        self.inner.idle.load(Ordering::SeqCst)
    }

    fn min_capacity(&self) -> usize {
        self.inner.min_capacity
    }

    fn borrow(&self, label: &str) -> Result<Box<dyn ExecutionContext>, JobError> {
        if self.inner.borrow_fails.load(Ordering::SeqCst) {
            return Err(JobError::failed("pool not ready"));
        }
        let taken = self
            .inner
            .idle
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if taken.is_err() {
            return Err(JobError::failed("pool exhausted"));
        }
        let id = self.inner.borrows.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext {
            id,
            worker: label.to_string(),
            inner: Arc::clone(&self.inner),
        }))
    }

    fn release(&self, context: Option<Box<dyn ExecutionContext>>) {
        match context {
            Some(_) => {
                self.inner.releases.fetch_add(1, Ordering::SeqCst);
                let cap = self.inner.capacity;
                let _ = self
                    .inner
                    .idle
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        (n < cap).then_some(n + 1)
                    });
            }
            None => {
                self.inner.empty_releases.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

struct FakeContext {
    id: usize,
    worker: String,
    inner: Arc<Inner>,
}

impl ExecutionContext for FakeContext {
    fn id(&self) -> usize {
        self.id
    }

    fn run<'a>(&'a mut self, command: &'a str) -> JobFuture<'a> {
        let inner = Arc::clone(&self.inner);
        let worker = self.worker.clone();

        Box::pin(async move {
            inner.runs.lock().unwrap().push(RunRecord {
                worker,
                command: command.to_string(),
            });

            let outcome = inner
                .outcomes
                .lock()
                .unwrap()
                .get(command)
                .cloned()
                .unwrap_or(Outcome::Succeed);

            match outcome {
                Outcome::Succeed => Ok(format!("ran {command}")),
                Outcome::Fail => Err(JobError::failed(format!("{command} failed"))),
                Outcome::StopRequested => Err(JobError::StopRequested),
                Outcome::Fatal => Err(JobError::Fatal(format!("{command} broke the world"))),
                Outcome::Panic => panic!("{command} panicked"),
                Outcome::WaitFor(notify) => {
                    notify.notified().await;
                    Ok(format!("ran {command}"))
                }
                Outcome::WaitThenFail(notify) => {
                    notify.notified().await;
                    Err(JobError::failed(format!("{command} failed after waiting")))
                }
            }
        })
    }
}
