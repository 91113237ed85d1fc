//! # Mutable Input Trees
//!
//! `Value` is what callers hand to the engine: scalars, mutable lists,
//! sets and dicts, immutable tuples, already-frozen canonical values, and
//! opaque objects.
//!
//! Lists, sets and dicts are shared handles (`Arc<RwLock<_>>`). The same
//! container may appear at several places in a tree, and a container may
//! contain itself; the walks detect the latter.
//!
//! Set elements and dict keys are typed [`Canonical`]: they must already be
//! hashable to be stored at all.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde::de::{self, Deserialize, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::canonical::{Canonical, Opaque, OpaqueAtom};
use crate::error::FreezeError;
use crate::config::FreezeConfig;
use crate::freeze::deepfreeze_with;
use crate::frozen_map::FrozenMap;
use crate::scalar::Scalar;

/// A lock-protected container that may be referenced from several places.
pub type Shared<T> = Arc<RwLock<T>>;

/// Key-unique mapping preserving insertion order.
///
/// Inserting an existing key replaces its value in place.
#[derive(Clone, Default)]
pub struct Dict {
    entries: IndexMap<Canonical, Value>,
}

impl Dict {
    /// An empty dict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the previous value for the key.
    pub fn insert(&mut self, key: Canonical, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    /// Look up a key.
    pub fn get(&self, key: &Canonical) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Remove a key, returning its value. Later entries keep their order.
    pub fn remove(&mut self, key: &Canonical) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, Canonical, Value> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the dict has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<(Canonical, Value)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// An arbitrary nested structure, possibly mutable.
#[derive(Clone)]
pub enum Value {
    /// Atomic leaf.
    Scalar(Scalar),
    /// Mutable ordered sequence.
    List(Shared<Vec<Value>>),
    /// Immutable ordered sequence; its members may still be mutable.
    Tuple(Arc<[Value]>),
    /// Mutable set of hashable elements.
    Set(Shared<IndexSet<Canonical>>),
    /// Mutable key-unique mapping.
    Dict(Shared<Dict>),
    /// A value that is already canonical.
    Frozen(Canonical),
    /// An object of a type unknown to the engine.
    Opaque(Arc<dyn Opaque>),
}

impl Value {
    /// The absent value.
    pub fn none() -> Self {
        Self::Scalar(Scalar::None)
    }

    /// A new mutable list.
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::List(Arc::new(RwLock::new(items.into_iter().collect())))
    }

    /// A new tuple.
    pub fn tuple<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// A new mutable set.
    pub fn set<I: IntoIterator<Item = Canonical>>(items: I) -> Self {
        Self::Set(Arc::new(RwLock::new(items.into_iter().collect())))
    }

    /// A new mutable dict. Later duplicates of a key replace earlier ones.
    pub fn dict<K, I>(pairs: I) -> Self
    where
        K: Into<Canonical>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut dict = Dict::new();
        for (key, value) in pairs {
            dict.insert(key.into(), value);
        }
        Self::Dict(Arc::new(RwLock::new(dict)))
    }

    /// Wrap an opaque object.
    pub fn opaque(object: impl Opaque + 'static) -> Self {
        Self::Opaque(Arc::new(object))
    }

    /// Name used in error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Scalar(s) => s.type_name(),
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::Dict(_) => "dict",
            Self::Frozen(c) => c.type_name(),
            Self::Opaque(o) => o.type_name(),
        }
    }

    /// Address of the shared allocation for mutable containers.
    pub(crate) fn container_id(&self) -> Option<usize> {
        match self {
            Self::List(shared) => Some(Arc::as_ptr(shared) as *const () as usize),
            Self::Set(shared) => Some(Arc::as_ptr(shared) as *const () as usize),
            Self::Dict(shared) => Some(Arc::as_ptr(shared) as *const () as usize),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    // Containers print shallowly; a self-containing list must not recurse.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s:?}"),
            Self::List(items) => write!(f, "List(len={})", items.read().len()),
            Self::Tuple(items) => write!(f, "Tuple(len={})", items.len()),
            Self::Set(items) => write!(f, "Set(len={})", items.read().len()),
            Self::Dict(dict) => write!(f, "Dict(len={})", dict.read().len()),
            Self::Frozen(c) => write!(f, "Frozen({c:?})"),
            Self::Opaque(o) => write!(f, "Opaque({o:?})"),
        }
    }
}

/// Shallow hashability check: the value converts if it can be hashed as it
/// stands. Mutable containers never can; tuples can if all their members
/// can.
impl TryFrom<Value> for Canonical {
    type Error = FreezeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Scalar(s) => Ok(Canonical::Scalar(s)),
            Value::Frozen(c) => Ok(c),
            Value::Opaque(object) => OpaqueAtom::new(&object).map(Canonical::Opaque),
            Value::Tuple(items) => items
                .iter()
                .cloned()
                .map(Canonical::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Canonical::tuple),
            Value::List(_) | Value::Set(_) | Value::Dict(_) => Err(FreezeError::not_hashable(
                value.type_name(),
                "mutable containers are not hashable",
            )),
        }
    }
}

impl FrozenMap<Canonical, Canonical> {
    /// A fresh mutable dict with the same entries.
    pub fn unfrozen(&self) -> Value {
        Value::dict(
            self.items()
                .map(|(key, value)| (key.clone(), Value::Frozen(value.clone()))),
        )
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<Canonical> for Value {
    fn from(c: Canonical) -> Self {
        match c {
            Canonical::Scalar(s) => Self::Scalar(s),
            other => Self::Frozen(other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Scalar(Scalar::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::Text(s))
    }
}

/// Documents load as trees of lists, dicts and scalars. Mapping keys are
/// deep-frozen with the default configuration; use [`ValueSeed`] to apply
/// another limit.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ValueSeed::new(&FreezeConfig::default()).deserialize(deserializer)
    }
}

/// Loads a [`Value`], deep-freezing composite mapping keys under `config`
/// so formats with composite keys (YAML) load too.
#[derive(Debug, Clone, Copy)]
pub struct ValueSeed<'c> {
    config: &'c FreezeConfig,
}

impl<'c> ValueSeed<'c> {
    /// A seed freezing keys under `config`.
    pub fn new(config: &'c FreezeConfig) -> Self {
        Self { config }
    }
}

impl<'de> DeserializeSeed<'de> for ValueSeed<'_> {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ValueSeed<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, sequence, or mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::from)
            .map_err(|_| E::custom(format!("integer {v} does not fit in i64")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::none())
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::none())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        self.deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element_seed(self)? {
            items.push(item);
        }
        Ok(Value::list(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut dict = Dict::new();
        while let Some((key, value)) = map.next_entry_seed(self, self)? {
            let key = deepfreeze_with(&key, self.config).map_err(<A::Error as de::Error>::custom)?;
            dict.insert(key, value);
        }
        Ok(Value::Dict(Arc::new(RwLock::new(dict))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_insert_replaces_in_place() {
        let mut dict = Dict::new();
        dict.insert("a".into(), Value::from(1));
        dict.insert("b".into(), Value::from(2));
        assert!(dict.insert("a".into(), Value::from(3)).is_some());
        let keys: Vec<_> = dict.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["\"a\"", "\"b\""]);
        assert!(dict.remove(&"a".into()).is_some());
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn mutable_containers_are_not_hashable() {
        for value in [Value::list([]), Value::set([]), Value::dict::<&str, _>([])] {
            assert!(matches!(
                Canonical::try_from(value),
                Err(FreezeError::NotHashable { .. })
            ));
        }
    }

    #[test]
    fn tuple_hashability_depends_on_members() {
        let ok = Value::tuple([Value::from(1), Value::from("x")]);
        assert_eq!(
            Canonical::try_from(ok).unwrap(),
            Canonical::tuple([1.into(), "x".into()])
        );
        let bad = Value::tuple([Value::from(1), Value::list([])]);
        assert!(Canonical::try_from(bad).is_err());
    }

    #[test]
    fn self_containing_list_debug_is_shallow() {
        let list = Value::list([]);
        if let Value::List(items) = &list {
            items.write().push(list.clone());
        }
        assert_eq!(format!("{list:?}"), "List(len=1)");
    }

    #[test]
    fn json_loads_as_lists_and_dicts() {
        let value: Value = serde_json::from_str(r#"{"a": [1, 2.5, null], "b": true}"#).unwrap();
        let Value::Dict(dict) = &value else {
            panic!("expected dict, got {value:?}");
        };
        let dict = dict.read();
        assert!(matches!(dict.get(&"a".into()), Some(Value::List(_))));
        assert!(matches!(
            dict.get(&"b".into()),
            Some(Value::Scalar(Scalar::Bool(true)))
        ));
    }

    #[test]
    fn yaml_composite_keys_are_frozen() {
        let value: Value = serde_yaml::from_str("? [1, 2]\n: pair\n").unwrap();
        let Value::Dict(dict) = &value else {
            panic!("expected dict, got {value:?}");
        };
        let key = Canonical::tuple([1.into(), 2.into()]);
        assert!(dict.read().get(&key).is_some());
    }

    #[test]
    fn composite_keys_respect_configured_depth() {
        let config = FreezeConfig::default().with_max_depth(1);
        let err = ValueSeed::new(&config)
            .deserialize(serde_yaml::Deserializer::from_str("? [[1]]\n: deep\n"))
            .unwrap_err();
        assert!(err.to_string().contains("maximum nesting depth of 1"));

        let value = ValueSeed::new(&FreezeConfig::default())
            .deserialize(serde_yaml::Deserializer::from_str("? [[1]]\n: deep\n"))
            .unwrap();
        assert!(matches!(value, Value::Dict(_)));
    }

    #[test]
    fn dict_remove_keeps_remaining_order() {
        let mut dict = Dict::new();
        for key in ["a", "b", "c"] {
            dict.insert(key.into(), Value::none());
        }
        dict.remove(&"a".into());
        let keys: Vec<_> = dict.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["\"b\"", "\"c\""]);
    }

    #[test]
    fn unfrozen_returns_mutable_copy() {
        let map = FrozenMap::from_pairs([(Canonical::from("a"), Canonical::from(1))]);
        let Value::Dict(dict) = map.unfrozen() else {
            panic!("expected dict");
        };
        dict.write().insert("b".into(), Value::from(2));
        assert_eq!(dict.read().len(), 2);
        assert_eq!(map.len(), 1);
    }
}
