//! Engine configuration.
//!
//! Defaults suit trusted configuration data. Override via environment
//! variables or explicit construction when the input depth is untrusted.

use crate::error::ConfigError;

/// Maximum container nesting accepted when no override is given.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Environment variable overriding [`FreezeConfig::max_depth`].
pub const MAX_DEPTH_ENV: &str = "FREEZER_MAX_DEPTH";

/// Limits applied by `deepfreeze` and `serializable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezeConfig {
    /// Maximum number of nested containers on any path from the root.
    /// The root container counts as depth 1.
    pub max_depth: usize,
}

impl Default for FreezeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FreezeConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `FREEZER_MAX_DEPTH` (default: 1024)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMaxDepth` if the variable is set but is
    /// not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(MAX_DEPTH_ENV).ok();
        Ok(Self {
            max_depth: parse_max_depth(raw.as_deref())?,
        })
    }

    /// Replace the depth limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn parse_max_depth(raw: Option<&str>) -> Result<usize, ConfigError> {
    match raw {
        None => Ok(DEFAULT_MAX_DEPTH),
        Some(s) => match s.trim().parse::<usize>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidMaxDepth(s.to_string())),
            Ok(depth) => Ok(depth),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_uses_default() {
        assert_eq!(parse_max_depth(None), Ok(DEFAULT_MAX_DEPTH));
    }

    #[test]
    fn parses_positive_integer() {
        assert_eq!(parse_max_depth(Some(" 64 ")), Ok(64));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert_eq!(
            parse_max_depth(Some("0")),
            Err(ConfigError::InvalidMaxDepth("0".to_string()))
        );
        assert!(parse_max_depth(Some("deep")).is_err());
        assert!(parse_max_depth(Some("-3")).is_err());
    }

    #[test]
    fn builder_overrides_limit() {
        assert_eq!(FreezeConfig::default().with_max_depth(8).max_depth, 8);
    }
}
