//! # freezer CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use freezer_cli::check::{run_check, CheckArgs};
use freezer_cli::fingerprint::{run_fingerprint, FingerprintArgs};
use freezer_cli::normalize::{run_normalize, NormalizeArgs};
use freezer_cli::resolve_config;

/// Canonical views of JSON and YAML documents.
///
/// Deep-freezes a document into an order-independent canonical value, then
/// fingerprints it, re-emits it, or compares it with another document.
#[derive(Parser, Debug)]
#[command(name = "freezer", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Maximum nesting depth. Overrides FREEZER_MAX_DEPTH.
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the sha256 fingerprint of a document's frozen form.
    Fingerprint(FingerprintArgs),

    /// Re-emit a document from its frozen form.
    Normalize(NormalizeArgs),

    /// Exit 0 if two documents freeze to the same value, 1 otherwise.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = resolve_config(cli.max_depth).and_then(|config| {
        tracing::debug!(max_depth = config.max_depth, "freeze configuration");
        match &cli.command {
            Commands::Fingerprint(args) => run_fingerprint(args, &config),
            Commands::Normalize(args) => run_normalize(args, &config),
            Commands::Check(args) => run_check(args, &config),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
