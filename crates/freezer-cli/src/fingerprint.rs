//! # Fingerprint Subcommand
//!
//! Prints the `sha256:<hex>` fingerprint of a document's frozen form. Two
//! documents that differ only in mapping key order print the same line.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use freezer_core::{Fingerprint, FreezeConfig};

use crate::load::load_frozen;

/// Arguments for the `freezer fingerprint` subcommand.
#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// JSON or YAML document.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Compute the fingerprint of the document at `args.file`.
pub fn fingerprint_file(args: &FingerprintArgs, config: &FreezeConfig) -> Result<Fingerprint> {
    let frozen = load_frozen(&args.file, config)?;
    Ok(frozen.fingerprint())
}

/// Execute the fingerprint subcommand.
///
/// Returns exit code: 0 on success.
pub fn run_fingerprint(args: &FingerprintArgs, config: &FreezeConfig) -> Result<u8> {
    let fingerprint = fingerprint_file(args, config)?;
    tracing::info!(file = %args.file.display(), "fingerprinted document");
    println!("{fingerprint}");
    Ok(0)
}
