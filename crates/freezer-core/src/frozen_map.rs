//! # FrozenMap: Immutable Hashable Mapping
//!
//! An order-preserving key/value container that can never change after
//! construction and can therefore be used as a key itself.
//!
//! ## Invariants
//!
//! - Keys are unique. When a key is supplied more than once, the **last
//!   value wins** and the key keeps the **position of its first
//!   occurrence**.
//! - Every value is hashable. Construction from a fallible value type
//!   rejects unhashable values up front with
//!   [`FreezeError::NotHashable`]; nothing is checked lazily.
//! - Equality is order-independent: two maps are equal iff they map the
//!   same keys to the same values.
//! - The hash is consistent with equality. Per-pair hashes are combined
//!   with wrapping addition, computed once and cached.

use std::borrow::Borrow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::FreezeError;

/// An immutable, hashable, order-preserving mapping.
///
/// Cloning is cheap: the entries are shared behind an `Arc`.
pub struct FrozenMap<K, V> {
    inner: Arc<Inner<K, V>>,
}

struct Inner<K, V> {
    entries: IndexMap<K, V>,
    hash: u64,
}

impl<K, V> FrozenMap<K, V>
where
    K: Hash + Eq,
    V: Hash + Eq,
{
    /// Build a map from key/value pairs whose values may need converting
    /// into the hashable value type first.
    ///
    /// # Errors
    ///
    /// Returns [`FreezeError::NotHashable`] (or whatever the conversion
    /// reports) if any value cannot be converted. No map is built in that
    /// case.
    pub fn new<I, W>(pairs: I) -> Result<Self, FreezeError>
    where
        I: IntoIterator<Item = (K, W)>,
        W: TryInto<V>,
        FreezeError: From<W::Error>,
    {
        let mut entries = IndexMap::new();
        for (key, value) in pairs {
            insert_entry(&mut entries, key, value.try_into()?);
        }
        Ok(Self::from_index_map(entries))
    }

    /// Build a map from pairs that are already hashable.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut entries = IndexMap::new();
        for (key, value) in pairs {
            insert_entry(&mut entries, key, value);
        }
        Self::from_index_map(entries)
    }

    fn from_index_map(entries: IndexMap<K, V>) -> Self {
        let hash = entries
            .iter()
            .map(|(k, v)| pair_hash(k, v))
            .fold(0u64, u64::wrapping_add);
        Self {
            inner: Arc::new(Inner { entries, hash }),
        }
    }

    /// Return the value for `key`, or `None` on a miss.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.entries.get(key)
    }

    /// Return the value for `key`, or `default` on a miss.
    pub fn get_or<'a, Q>(&'a self, key: &Q, default: &'a V) -> &'a V
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).unwrap_or(default)
    }

    /// Return the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`FreezeError::KeyNotFound`] on a miss.
    pub fn index<Q>(&self, key: &Q) -> Result<&V, FreezeError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        self.get(key)
            .ok_or_else(|| FreezeError::KeyNotFound(format!("{key:?}")))
    }

    /// Membership test on keys.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.entries.contains_key(key)
    }
}

impl<K, V> FrozenMap<K, V> {
    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn items(&self) -> indexmap::map::Iter<'_, K, V> {
        self.inner.entries.iter()
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, K, V> {
        self.inner.entries.keys()
    }

    /// Iterate over values in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, K, V> {
        self.inner.entries.values()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// The cached, order-independent hash of all entries.
    pub fn hash_value(&self) -> u64 {
        self.inner.hash
    }
}

// `IndexMap::insert` replaces the value in place, so a repeated key keeps
// its first position.
fn insert_entry<K: Hash + Eq, V>(entries: &mut IndexMap<K, V>, key: K, value: V) {
    if let (position, Some(_)) = entries.insert_full(key, value) {
        tracing::trace!(position, "duplicate key in frozen map; keeping last value");
    }
}

fn pair_hash<K: Hash, V: Hash>(key: &K, value: &V) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

impl<K, V> Clone for FrozenMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for FrozenMap<K, V>
where
    K: Hash + Eq,
    V: Hash + Eq,
{
    fn default() -> Self {
        Self::from_index_map(IndexMap::new())
    }
}

impl<K, V> PartialEq for FrozenMap<K, V>
where
    K: Hash + Eq,
    V: Hash + Eq,
{
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.inner.hash == other.inner.hash && self.inner.entries == other.inner.entries
    }
}

impl<K, V> Eq for FrozenMap<K, V>
where
    K: Hash + Eq,
    V: Hash + Eq,
{
}

impl<K, V> Hash for FrozenMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        state.write_u64(self.inner.hash);
    }
}

impl<K, V> FromIterator<(K, V)> for FrozenMap<K, V>
where
    K: Hash + Eq,
    V: Hash + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl<K, V> From<IndexMap<K, V>> for FrozenMap<K, V>
where
    K: Hash + Eq,
    V: Hash + Eq,
{
    fn from(entries: IndexMap<K, V>) -> Self {
        Self::from_index_map(entries)
    }
}

impl<K, V> From<FrozenMap<K, V>> for IndexMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn from(map: FrozenMap<K, V>) -> Self {
        match Arc::try_unwrap(map.inner) {
            Ok(inner) => inner.entries,
            Err(shared) => shared.entries.clone(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a FrozenMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = indexmap::map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for FrozenMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.items()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for FrozenMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FrozenMap({")?;
        for (i, (key, value)) in self.items().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("})")
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Reversing construction order never changes equality or hash.
        #[test]
        fn order_independent(entries in prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..12)) {
            let forward: FrozenMap<String, i64> = entries.clone().into_iter().collect();
            let backward: FrozenMap<String, i64> = entries.into_iter().rev().collect();
            prop_assert_eq!(&forward, &backward);
            prop_assert_eq!(forward.hash_value(), backward.hash_value());
        }
    }
}
