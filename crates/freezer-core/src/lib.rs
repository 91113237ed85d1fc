//! # freezer-core: Deep-Freeze Canonicalization
//!
//! Turns arbitrary nested data (mappings, sequences, sets, scalars, opaque
//! application objects) into a single canonical, immutable, hashable
//! value, and converts canonical values back into plain trees that any
//! serde serializer can write.
//!
//! The typical use is caching: a configuration tree is deep-frozen and the
//! result keys a memo table, so two configurations that differ only in
//! mapping order hit the same entry.
//!
//! ## Key Design Principles
//!
//! 1. **Closed value domains.** [`Value`] is everything a caller may hand
//!    in, [`Canonical`] is everything a freeze can produce, and [`Plain`]
//!    is everything a serialization can produce. Exhaustive `match` on
//!    each of them keeps the conversions total.
//!
//! 2. **Order-independent identity.** [`FrozenMap`] and [`FrozenSet`]
//!    compare and hash without regard to insertion order. Their hash is
//!    computed once at construction.
//!
//! 3. **No recursion on input depth.** [`deepfreeze`] and [`serializable`]
//!    walk with an explicit stack. Depth is bounded by
//!    [`FreezeConfig::max_depth`] and cycles are reported as errors.
//!
//! 4. **Stable fingerprints flow through [`CanonicalBytes`].** Process-local
//!    `Hash` values are fine for in-memory tables; anything persisted uses
//!    [`sha256_fingerprint`], which accepts only canonical bytes.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod cache;
pub mod canonical;
pub mod config;
pub mod digest;
pub mod error;
pub mod freeze;
pub mod frozen_map;
pub mod frozen_set;
pub mod scalar;
pub mod serial;
pub mod value;
mod walk;

// Re-export primary types for ergonomic imports.
pub use cache::FreezeCache;
pub use canonical::{Canonical, Opaque, OpaqueAtom};
pub use config::{FreezeConfig, DEFAULT_MAX_DEPTH, MAX_DEPTH_ENV};
pub use digest::{sha256_fingerprint, CanonicalBytes, Fingerprint};
pub use error::{ConfigError, FreezeError};
pub use freeze::{deepfreeze, deepfreeze_with};
pub use frozen_map::FrozenMap;
pub use frozen_set::FrozenSet;
pub use scalar::Scalar;
pub use serial::{serializable, serializable_with, Plain};
pub use value::{Dict, Shared, Value, ValueSeed};
