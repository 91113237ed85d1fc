//! # FrozenSet
//!
//! Immutable, hashable set. Iteration follows first insertion; equality
//! and hash ignore it.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexSet;

/// An immutable set of unique hashable elements.
pub struct FrozenSet<T> {
    inner: Arc<SetInner<T>>,
}

struct SetInner<T> {
    members: IndexSet<T>,
    hash: u64,
}

impl<T> FrozenSet<T>
where
    T: Hash + Eq,
{
    /// Build a set, dropping repeated elements.
    pub fn from_elements<I: IntoIterator<Item = T>>(elements: I) -> Self {
        let members: IndexSet<T> = elements.into_iter().collect();
        let hash = members
            .iter()
            .map(element_hash)
            .fold(0u64, u64::wrapping_add);
        Self {
            inner: Arc::new(SetInner { members, hash }),
        }
    }

    /// Membership test.
    pub fn contains(&self, element: &T) -> bool {
        self.inner.members.contains(element)
    }
}

impl<T> FrozenSet<T> {
    /// Iterate in first-insertion order.
    pub fn iter(&self) -> indexmap::set::Iter<'_, T> {
        self.inner.members.iter()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.members.len()
    }

    /// Returns true if the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.members.is_empty()
    }
}

fn element_hash<T: Hash>(element: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    element.hash(&mut hasher);
    hasher.finish()
}

impl<T> Clone for FrozenSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Hash + Eq> PartialEq for FrozenSet<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.hash == other.inner.hash && self.inner.members == other.inner.members)
    }
}

impl<T: Hash + Eq> Eq for FrozenSet<T> {}

impl<T> Hash for FrozenSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        state.write_u64(self.inner.hash);
    }
}

impl<T: Hash + Eq> FromIterator<T> for FrozenSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_elements(iter)
    }
}

impl<'a, T> IntoIterator for &'a FrozenSet<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for FrozenSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for FrozenSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("frozenset({")?;
        for (i, element) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{element}")?;
        }
        f.write_str("})")
    }
}
