// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod task;

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::exec::{ExecutionPool, ShellPool};
use crate::registry::{LaunchOptions, Resolved};

pub use crate::registry::ScheduledTasks;
pub use crate::task::{PeriodicalTask, TaskState};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the shell execution pool
/// - configuration resolution (document + `--set` overrides)
/// - the worker registry
/// - Ctrl-C handling and graceful shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let pool: Arc<dyn ExecutionPool> = Arc::new(ShellPool::new(args.pool_size, args.min_capacity));

    let mut options = LaunchOptions::from_env();
    options.namespace = args.namespace.clone();
    options.no_background_jobs |= args.no_background_jobs;
    options.verbose = args.verbose;

    let mut registry = ScheduledTasks::new(&args.config, pool)
        .with_properties(args.set.clone())
        .with_options(options);

    if args.dry_run {
        let report = dry_run_report(&registry)
            .with_context(|| format!("resolving configuration from {}", args.config))?;
        print!("{report}");
        debug!("dry-run complete (nothing started)");
        return Ok(());
    }

    let started = registry
        .launch()
        .with_context(|| format!("launching tasks from {}", args.config))?;

    if started == 0 {
        info!("no worker to run; exiting");
        return Ok(());
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Ctrl+C received; stopping workers");

    registry.shutdown().await;
    Ok(())
}

/// Dry-run output: one block per worker `launch()` would start.
fn dry_run_report(registry: &ScheduledTasks) -> crate::errors::Result<String> {
    let mut out = String::from("taskherd dry-run\n");

    if registry.background_jobs_disabled() {
        out.push_str("\nworkers (0): background jobs disabled\n");
        return Ok(out);
    }

    let Resolved { configs, timing } = registry.resolve()?;
    let _ = writeln!(
        out,
        "  backoff = {}s, jitter = [{}, {}) ms, verbose = {}",
        timing.backoff.as_secs(),
        timing.jitter_ms.start,
        timing.jitter_ms.end,
        timing.verbose
    );

    let _ = writeln!(out, "\nworkers ({}):", configs.len());
    for cfg in &configs {
        let _ = writeln!(out, "  - {}", cfg.name);
        let _ = writeln!(out, "      command: {}", cfg.command);
        let _ = writeln!(out, "      interval: {}s", cfg.interval);
        let _ = writeln!(out, "      min_idle: {}", cfg.min_idle);
        if cfg.run_once {
            let _ = writeln!(out, "      run_once: true");
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn registry(options: LaunchOptions) -> ScheduledTasks {
        let fs = MockFileSystem::new();
        fs.add_file("Taskherd.toml", "[task.daily]\ncommand = \"echo hi\"\nworker_count = 2\n");
        ScheduledTasks::new("Taskherd.toml", Arc::new(ShellPool::new(2, 1)))
            .with_filesystem(Arc::new(fs))
            .with_options(options)
    }

    #[test]
    fn dry_run_lists_resolved_workers() {
        let report = dry_run_report(&registry(LaunchOptions::default())).unwrap();
        assert!(report.contains("workers (2):"));
        assert!(report.contains("daily-0"));
        assert!(report.contains("daily-1"));
    }

    #[test]
    fn dry_run_honours_the_kill_switch() {
        let options = LaunchOptions {
            no_background_jobs: true,
            ..LaunchOptions::default()
        };
        let report = dry_run_report(&registry(options)).unwrap();
        assert!(report.contains("workers (0): background jobs disabled"));
        assert!(!report.contains("daily-0"));
    }
}
