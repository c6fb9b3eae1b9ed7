// src/logging.rs

//! Tracing subscriber for the `taskherd` binary.
//!
//! The filter comes from the first of:
//! 1. `--log-level`, applied to every target,
//! 2. `TASKHERD_LOG`, read as full `EnvFilter` directives
//!    (`info,taskherd::task=debug`),
//! 3. `info`.
//!
//! Output goes to stderr; stdout carries the `--dry-run` report.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "TASKHERD_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("could not install the log subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(directive(level));
    }

    match env.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => EnvFilter::try_new(raw).unwrap_or_else(|e| {
            eprintln!("taskherd: ignoring {LOG_ENV}={raw:?}: {e}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
