//! # FreezeCache: Results Keyed by Deep-Frozen Inputs
//!
//! Memoizes a computation over arbitrary nested configuration data. The
//! input is deep-frozen into a [`Canonical`] key, so two configurations
//! that differ only in mapping order share one entry.
//!
//! The table is guarded by a `parking_lot::RwLock`, which never poisons,
//! and the lock is never held while the caller's closure runs. Two threads
//! missing on the same key may both compute; the first insert wins.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::canonical::Canonical;
use crate::config::FreezeConfig;
use crate::error::FreezeError;
use crate::freeze::deepfreeze_with;
use crate::value::Value;

/// Thread-safe memo table keyed by canonical values.
#[derive(Debug)]
pub struct FreezeCache<T> {
    config: FreezeConfig,
    entries: RwLock<HashMap<Canonical, Arc<T>>>,
}

impl<T> Default for FreezeCache<T> {
    fn default() -> Self {
        Self::new(FreezeConfig::default())
    }
}

impl<T> FreezeCache<T> {
    /// An empty cache freezing keys under `config`.
    pub fn new(config: FreezeConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached result for `input`, computing and storing it on a
    /// miss.
    ///
    /// # Errors
    ///
    /// Propagates the error if `input` cannot be deep-frozen. Nothing is
    /// cached in that case.
    pub fn get_or_insert_with<F>(&self, input: &Value, compute: F) -> Result<Arc<T>, FreezeError>
    where
        F: FnOnce() -> T,
    {
        let key = deepfreeze_with(input, &self.config)?;
        if let Some(hit) = self.entries.read().get(&key) {
            tracing::trace!(fingerprint = %key.fingerprint(), "freeze cache hit");
            return Ok(Arc::clone(hit));
        }

        let computed = Arc::new(compute());
        let mut entries = self.entries.write();
        let stored = entries.entry(key).or_insert(computed);
        Ok(Arc::clone(stored))
    }

    /// Look up a result without computing.
    ///
    /// # Errors
    ///
    /// Propagates the error if `input` cannot be deep-frozen.
    pub fn get(&self, input: &Value) -> Result<Option<Arc<T>>, FreezeError> {
        let key = deepfreeze_with(input, &self.config)?;
        Ok(self.entries.read().get(&key).cloned())
    }

    /// Store a result, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Propagates the error if `input` cannot be deep-frozen.
    pub fn insert(&self, input: &Value, result: T) -> Result<Option<Arc<T>>, FreezeError> {
        let key = deepfreeze_with(input, &self.config)?;
        Ok(self.entries.write().insert(key, Arc::new(result)))
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
