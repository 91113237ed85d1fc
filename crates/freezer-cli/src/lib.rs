//! # freezer-cli: Canonical Views of Configuration Files
//!
//! Provides the `freezer` command-line interface over `freezer-core`.
//!
//! ## Subcommands
//!
//! - `freezer fingerprint`: Stable `sha256:` digest of a document.
//! - `freezer normalize`: Re-emit a document from its frozen form.
//! - `freezer check`: Compare two documents ignoring mapping order.
//!
//! ```bash
//! freezer fingerprint deploy/prod.yaml
//! freezer normalize settings.json --format canonical-json --out settings.jcs
//! freezer check a.yaml b.json
//! ```
//!
//! Exit codes: 0 on success, 1 when `check` finds a difference, 2 on any
//! operational error.

pub mod check;
pub mod fingerprint;
pub mod load;
pub mod normalize;

use anyhow::{bail, Result};
use freezer_core::FreezeConfig;

/// Build the freeze configuration for a run.
///
/// An explicit `--max-depth` wins over `FREEZER_MAX_DEPTH`; the environment
/// is not consulted at all in that case.
pub fn resolve_config(max_depth: Option<usize>) -> Result<FreezeConfig> {
    match max_depth {
        Some(0) => bail!("--max-depth must be a positive integer"),
        Some(depth) => Ok(FreezeConfig::default().with_max_depth(depth)),
        None => Ok(FreezeConfig::from_env()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_depth_overrides_environment() {
        let config = resolve_config(Some(12)).unwrap();
        assert_eq!(config.max_depth, 12);
    }

    #[test]
    fn zero_depth_is_rejected() {
        assert!(resolve_config(Some(0)).is_err());
    }
}
