// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `tierflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tierflow",
    version,
    about = "Run a dependency graph of pipeline projects tier by tier.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Tierflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Tierflow.toml")]
    pub config: String,

    /// Maximum number of concurrently running jobs (overrides `[config]`).
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Skip every project in a lower tier (overrides `[config]`).
    #[arg(long, value_name = "TIER")]
    pub starting_tier: Option<usize>,

    /// Include the `apply_feedback` step in mastering and categorization
    /// pipelines.
    #[arg(long)]
    pub train: bool,

    /// Write a JSON snapshot of the plan to this directory after every round.
    #[arg(long, value_name = "DIR")]
    pub save_state: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TIERFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the plan, but don't start any jobs.
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
