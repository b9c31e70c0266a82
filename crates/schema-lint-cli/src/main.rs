//! schema-lint CLI tool.
//!
//! Usage:
//! ```bash
//! schema-lint check [OPTIONS] [PATH]
//! schema-lint watch [PATH]
//! schema-lint init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Validates JSON documents against the schema found next to them
#[derive(Parser)]
#[command(name = "schema-lint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SCHEMA_LINT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every JSON document under a directory
    Check {
        /// Path to check (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Re-validate documents as they change
    Watch {
        /// Path to watch (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Event batching window in milliseconds (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-diagnostic compact format.
    Compact,
    /// Source excerpts with the offending line highlighted.
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            exclude,
        } => {
            let resolved = config_resolver::resolve(&path, cli.config.as_deref())?;
            commands::check::run(resolved, format, exclude)
        }
        Commands::Watch { path, debounce_ms } => {
            let resolved = config_resolver::resolve(&path, cli.config.as_deref())?;
            commands::watch::run(resolved, debounce_ms)
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
