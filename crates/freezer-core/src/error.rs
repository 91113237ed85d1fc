//! # Error Types
//!
//! Every failure the engine can report. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Errors are raised at the point of detection and carry the offending
//!   type name so the caller can tell which part of the tree was rejected.
//! - A failing conversion never yields a partial result.

use std::convert::Infallible;

use thiserror::Error;

/// Failure of a freeze, serialize, or lookup operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FreezeError {
    /// A value cannot be placed in the hashable domain.
    #[error("{type_name} is not hashable: {reason}")]
    NotHashable {
        /// Name of the rejected type.
        type_name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Lookup miss on a required key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The walk met a type outside the supported dispatch set.
    #[error("unsupported type {type_name}: {context}")]
    UnsupportedType {
        /// Name of the rejected type.
        type_name: String,
        /// Which operation rejected it.
        context: String,
    },

    /// A container was reached again through its own descendants.
    #[error("cyclic structure: {type_name} contains itself at depth {depth}")]
    CyclicStructure {
        /// Name of the container type that closed the cycle.
        type_name: String,
        /// Nesting depth at which the cycle was closed.
        depth: usize,
    },

    /// Nesting exceeded the configured maximum depth.
    #[error("maximum nesting depth of {limit} exceeded")]
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
}

impl FreezeError {
    pub(crate) fn not_hashable(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotHashable {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(type_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            context: context.into(),
        }
    }
}

// Lets `FrozenMap::new` accept values that convert infallibly.
impl From<Infallible> for FreezeError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Error while loading [`FreezeConfig`](crate::config::FreezeConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `FREEZER_MAX_DEPTH` is not a positive integer.
    #[error("invalid maximum depth {0:?}: expected a positive integer")]
    InvalidMaxDepth(String),
}
