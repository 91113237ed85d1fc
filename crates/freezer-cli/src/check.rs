//! # Check Subcommand
//!
//! Compares two documents by their frozen form. Mapping key order and the
//! source format are irrelevant; sequence order is not.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use freezer_core::FreezeConfig;

use crate::load::load_frozen;

/// Arguments for the `freezer check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// First document.
    #[arg(value_name = "LEFT")]
    pub left: PathBuf,

    /// Second document.
    #[arg(value_name = "RIGHT")]
    pub right: PathBuf,
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 if the documents are equivalent, 1 if they differ.
pub fn run_check(args: &CheckArgs, config: &FreezeConfig) -> Result<u8> {
    let left = load_frozen(&args.left, config)?;
    let right = load_frozen(&args.right, config)?;

    if left == right {
        tracing::info!(fingerprint = %left.fingerprint(), "documents are equivalent");
        println!("OK: documents are equivalent");
        Ok(0)
    } else {
        tracing::warn!(
            left = %left.fingerprint(),
            right = %right.fingerprint(),
            "documents differ"
        );
        println!(
            "DIFFERENT: {} != {}",
            args.left.display(),
            args.right.display()
        );
        Ok(1)
    }
}
