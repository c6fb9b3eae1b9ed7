#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use taskherd::ScheduledTasks;
use taskherd::fs::mock::MockFileSystem;
use taskherd::task::FatalHandler;
use taskherd_test_utils::builders::DocumentBuilder;
use taskherd_test_utils::fake_pool::FakePool;

pub use taskherd_test_utils::init_tracing;

pub const DOC: &str = "Taskherd.toml";

/// A registry wired to an in-memory document and a fake pool.
pub fn registry_for(doc: &DocumentBuilder, pool: &FakePool) -> ScheduledTasks {
    let fs = MockFileSystem::new();
    doc.install(&fs, DOC);
    ScheduledTasks::new(DOC, pool.clone().shared())
        .with_filesystem(Arc::new(fs))
        .with_fatal_handler(recording_fatal_handler().0)
}

/// Fatal handler that records `(worker, reason)` instead of exiting.
pub fn recording_fatal_handler() -> (FatalHandler, Arc<Mutex<Vec<(String, String)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: FatalHandler = Arc::new(move |worker: &str, reason: &str| {
        sink.lock()
            .unwrap()
            .push((worker.to_string(), reason.to_string()));
    });
    (handler, seen)
}
