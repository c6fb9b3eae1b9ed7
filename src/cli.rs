// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::overrides::parse_assignment;

/// Command-line arguments for `taskherd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskherd",
    version,
    about = "Run configured commands periodically inside a bounded execution pool.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the task document (TOML).
    #[arg(long, value_name = "PATH", default_value = "Taskherd.toml")]
    pub config: String,

    /// Root of override property keys.
    #[arg(long, value_name = "NS", default_value = crate::config::DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Override property, e.g. `taskherd.task.daily.interval=60` or
    /// `taskherd.daily.workerCount=3`. May be repeated.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Number of execution contexts in the shell pool.
    #[arg(long, value_name = "N", default_value_t = 4)]
    pub pool_size: usize,

    /// Capacity floor of the pool; bounds every worker's `min_idle`.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub min_capacity: usize,

    /// Start no background job at all.
    #[arg(long)]
    pub no_background_jobs: bool,

    /// Log timing for every iteration.
    #[arg(long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKHERD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve configuration and print the workers, but start nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
