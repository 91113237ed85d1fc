//! # Canonical Values: The Frozen Domain
//!
//! `Canonical` is the closed set of immutable, hashable shapes produced by
//! [`deepfreeze`](crate::freeze::deepfreeze). Every variant implements
//! `Eq + Hash`, so any canonical value can key a `HashMap` or be stored in
//! a [`FrozenSet`] or as a [`FrozenMap`] value.
//!
//! ## Opaque values
//!
//! Values the engine does not know structurally enter through the
//! [`Opaque`] trait. Only hashable, non-container opaque values can be
//! frozen; they are captured as an [`OpaqueAtom`] whose equality and hash
//! are defined by the type name and identity bytes reported when the
//! atom is created.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::FreezeError;
use crate::frozen_map::FrozenMap;
use crate::frozen_set::FrozenSet;
use crate::scalar::Scalar;

/// A user-defined value the engine treats as a black box.
pub trait Opaque: fmt::Debug + Send + Sync {
    /// Name used in error messages and in canonical equality.
    fn type_name(&self) -> &str;

    /// Stable identity bytes, or `None` if the value is not hashable.
    ///
    /// Two opaque values with the same type name and identity are equal in
    /// the canonical domain.
    fn identity(&self) -> Option<Vec<u8>>;

    /// Whether the value answers membership tests, i.e. behaves like a
    /// collection. Hashable collections of unknown shape cannot be frozen.
    fn supports_membership(&self) -> bool {
        false
    }
}

/// A hashable, atomic opaque value admitted to the canonical domain.
#[derive(Clone)]
pub struct OpaqueAtom {
    type_name: Arc<str>,
    identity: Arc<[u8]>,
    object: Arc<dyn Opaque>,
}

impl OpaqueAtom {
    /// Admit an opaque value to the canonical domain.
    ///
    /// Only hashability is checked here. `deepfreeze` separately refuses
    /// hashable containers of unknown shape.
    ///
    /// # Errors
    ///
    /// [`FreezeError::NotHashable`] if the value reports no identity.
    pub fn new(object: &Arc<dyn Opaque>) -> Result<Self, FreezeError> {
        let identity = object.identity().ok_or_else(|| {
            FreezeError::not_hashable(object.type_name(), "opaque value reports no identity")
        })?;
        Ok(Self {
            type_name: Arc::from(object.type_name()),
            identity: Arc::from(identity),
            object: Arc::clone(object),
        })
    }

    /// Type name reported at capture time.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Identity bytes reported at capture time.
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    /// The captured object.
    pub fn object(&self) -> &Arc<dyn Opaque> {
        &self.object
    }
}

impl PartialEq for OpaqueAtom {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.identity == other.identity
    }
}

impl Eq for OpaqueAtom {}

impl Hash for OpaqueAtom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
        self.identity.hash(state);
    }
}

impl fmt::Debug for OpaqueAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueAtom").field(&self.object).finish()
    }
}

/// An immutable, hashable value: the output domain of `deepfreeze`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Canonical {
    /// Atomic leaf.
    Scalar(Scalar),
    /// Unordered set of canonical values.
    Set(FrozenSet<Canonical>),
    /// Fixed-length ordered sequence.
    Tuple(Arc<[Canonical]>),
    /// Frozen mapping.
    Map(FrozenMap<Canonical, Canonical>),
    /// Hashable atom of a type unknown to the engine.
    Opaque(OpaqueAtom),
}

impl Canonical {
    /// The absent value.
    pub const NONE: Canonical = Canonical::Scalar(Scalar::None);

    /// Build a tuple.
    pub fn tuple<I: IntoIterator<Item = Canonical>>(items: I) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// Build a frozen set.
    pub fn set<I: IntoIterator<Item = Canonical>>(items: I) -> Self {
        Self::Set(items.into_iter().collect())
    }

    /// Build a frozen map from already-canonical pairs.
    pub fn map<I: IntoIterator<Item = (Canonical, Canonical)>>(pairs: I) -> Self {
        Self::Map(pairs.into_iter().collect())
    }

    /// Name used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Scalar(s) => s.type_name(),
            Self::Set(_) => "frozenset",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "FrozenMap",
            Self::Opaque(atom) => atom.type_name(),
        }
    }

    /// Returns the scalar if this is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the frozen map if this is one.
    pub fn as_map(&self) -> Option<&FrozenMap<Canonical, Canonical>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the tuple members if this is a tuple.
    pub fn as_tuple(&self) -> Option<&[Canonical]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the frozen set if this is one.
    pub fn as_set(&self) -> Option<&FrozenSet<Canonical>> {
        match self {
            Self::Set(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Canonical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Set(s) => write!(f, "{s}"),
            Self::Map(m) => write!(f, "{m}"),
            Self::Opaque(atom) => write!(f, "<{}>", atom.type_name()),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<Scalar> for Canonical {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<FrozenMap<Canonical, Canonical>> for Canonical {
    fn from(m: FrozenMap<Canonical, Canonical>) -> Self {
        Self::Map(m)
    }
}

impl From<FrozenSet<Canonical>> for Canonical {
    fn from(s: FrozenSet<Canonical>) -> Self {
        Self::Set(s)
    }
}

impl From<bool> for Canonical {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Canonical {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<i32> for Canonical {
    fn from(i: i32) -> Self {
        Self::Scalar(Scalar::from(i))
    }
}

impl From<f64> for Canonical {
    fn from(x: f64) -> Self {
        Self::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Canonical {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::from(s))
    }
}

impl From<String> for Canonical {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::Text(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug)]
    struct Token(&'static str);

    impl Opaque for Token {
        fn type_name(&self) -> &str {
            "Token"
        }
        fn identity(&self) -> Option<Vec<u8>> {
            Some(self.0.as_bytes().to_vec())
        }
    }

    #[derive(Debug)]
    struct Scratch;

    impl Opaque for Scratch {
        fn type_name(&self) -> &str {
            "Scratch"
        }
        fn identity(&self) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn opaque_atoms_compare_by_identity() {
        let a: Arc<dyn Opaque> = Arc::new(Token("t1"));
        let b: Arc<dyn Opaque> = Arc::new(Token("t1"));
        let c: Arc<dyn Opaque> = Arc::new(Token("t2"));
        let a = OpaqueAtom::new(&a).unwrap();
        assert_eq!(a, OpaqueAtom::new(&b).unwrap());
        assert_ne!(a, OpaqueAtom::new(&c).unwrap());
    }

    #[test]
    fn unhashable_opaque_is_rejected() {
        let scratch: Arc<dyn Opaque> = Arc::new(Scratch);
        assert!(matches!(
            OpaqueAtom::new(&scratch),
            Err(FreezeError::NotHashable { .. })
        ));
    }

    #[test]
    fn canonical_values_key_hash_sets() {
        let mut seen = HashSet::new();
        seen.insert(Canonical::map([("a".into(), Canonical::tuple([1.into(), 2.into()]))]));
        assert!(seen.contains(&Canonical::map([(
            "a".into(),
            Canonical::tuple([1.into(), 2.into()])
        )])));
    }

    #[test]
    fn display_uses_literal_style() {
        let single = Canonical::tuple([Canonical::from(1)]);
        assert_eq!(single.to_string(), "(1,)");
        let map = Canonical::map([("k".into(), Canonical::NONE)]);
        assert_eq!(map.to_string(), "FrozenMap({\"k\": None})");
    }
}
