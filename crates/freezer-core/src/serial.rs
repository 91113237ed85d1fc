//! # serializable: Canonical Tree to Plain Tree
//!
//! Loosens frozen (or mutable) trees into [`Plain`] values that any serde
//! format can encode: scalars, sequences and mappings.
//!
//! ## Modes
//!
//! With `keep_hashable = false` every sequence-like value becomes a
//! sequence and every mapping a mapping. Mapping keys are always
//! serialized with `keep_hashable = true`.
//!
//! With `keep_hashable = true` the result must stay usable as a key:
//!
//! - mutable lists, sets and dicts are refused with `NotHashable`;
//! - tuples and frozen sets propagate the flag to their members;
//! - a frozen map is encoded as a sequence of `[key, value]` pairs, both
//!   halves serialized in hashable mode.
//!
//! Ellipsis and opaque values have no plain form (`UnsupportedType`).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::canonical::Canonical;
use crate::config::FreezeConfig;
use crate::error::FreezeError;
use crate::scalar::Scalar;
use crate::value::Value;
use crate::walk::PathGuard;

/// A plain tree ready for a text encoder.
///
/// Mapping keys are unique and mapping equality ignores entry order.
#[derive(Debug, Clone)]
pub enum Plain {
    /// Atomic leaf.
    Scalar(Scalar),
    /// Ordered sequence.
    Sequence(Vec<Plain>),
    /// Key-unique mapping in insertion order.
    Mapping(IndexMap<Plain, Plain>),
}

impl Plain {
    /// Build a mapping. A repeated key keeps its first position and takes
    /// the last value.
    pub fn mapping<I: IntoIterator<Item = (Plain, Plain)>>(pairs: I) -> Self {
        let mut entries = IndexMap::new();
        for (key, value) in pairs {
            entries.insert(key, value);
        }
        Self::Mapping(entries)
    }

    /// Build a sequence.
    pub fn sequence<I: IntoIterator<Item = Plain>>(items: I) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    /// Look up a mapping entry.
    pub fn get(&self, key: &Plain) -> Option<&Plain> {
        match self {
            Self::Mapping(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Returns the items if this is a sequence.
    pub fn as_sequence(&self) -> Option<&[Plain]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is a mapping.
    pub fn as_mapping(&self) -> Option<&IndexMap<Plain, Plain>> {
        match self {
            Self::Mapping(entries) => Some(entries),
            _ => None,
        }
    }
}

impl PartialEq for Plain {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Sequence(a), Self::Sequence(b)) => a == b,
            (Self::Mapping(a), Self::Mapping(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Plain {}

impl Hash for Plain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Scalar(s) => s.hash(state),
            Self::Sequence(items) => items.hash(state),
            Self::Mapping(entries) => {
                let combined = entries
                    .iter()
                    .map(|(k, v)| {
                        let mut h = DefaultHasher::new();
                        k.hash(&mut h);
                        v.hash(&mut h);
                        h.finish()
                    })
                    .fold(0u64, u64::wrapping_add);
                state.write_usize(entries.len());
                state.write_u64(combined);
            }
        }
    }
}

impl Serialize for Plain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(s) => s.serialize(serializer),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl From<Scalar> for Plain {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<bool> for Plain {
    fn from(b: bool) -> Self {
        Self::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Plain {
    fn from(i: i64) -> Self {
        Self::Scalar(Scalar::Int(i))
    }
}

impl From<i32> for Plain {
    fn from(i: i32) -> Self {
        Self::Scalar(Scalar::from(i))
    }
}

impl From<f64> for Plain {
    fn from(x: f64) -> Self {
        Self::Scalar(Scalar::Float(x))
    }
}

impl From<&str> for Plain {
    fn from(s: &str) -> Self {
        Self::Scalar(Scalar::from(s))
    }
}

impl From<String> for Plain {
    fn from(s: String) -> Self {
        Self::Scalar(Scalar::Text(s))
    }
}

/// Serialize `value` with the default configuration.
///
/// # Errors
///
/// See [`serializable_with`].
pub fn serializable(value: &Value, keep_hashable: bool) -> Result<Plain, FreezeError> {
    serializable_with(value, keep_hashable, &FreezeConfig::default())
}

/// Convert `value` into a plain tree.
///
/// # Errors
///
/// - `NotHashable` if `keep_hashable` is set and the value (or a member
///   serialized in hashable mode) is a mutable list, set or dict.
/// - `UnsupportedType` for ellipsis and opaque values.
/// - `CyclicStructure` if a mutable container contains itself.
/// - `DepthExceeded` if nesting exceeds `config.max_depth`.
pub fn serializable_with(
    value: &Value,
    keep_hashable: bool,
    config: &FreezeConfig,
) -> Result<Plain, FreezeError> {
    serialize_tree(Item::Value(value.clone()), keep_hashable, config).map_err(|e| {
        tracing::debug!(root = value.type_name(), keep_hashable, error = %e, "serializable rejected input");
        e
    })
}

impl Canonical {
    /// Convert this canonical value into a plain tree.
    ///
    /// # Errors
    ///
    /// As for [`serializable`].
    pub fn to_serializable(&self, keep_hashable: bool) -> Result<Plain, FreezeError> {
        self.to_serializable_with(keep_hashable, &FreezeConfig::default())
    }

    /// Convert this canonical value into a plain tree under `config`.
    ///
    /// # Errors
    ///
    /// As for [`serializable_with`].
    pub fn to_serializable_with(
        &self,
        keep_hashable: bool,
        config: &FreezeConfig,
    ) -> Result<Plain, FreezeError> {
        serialize_tree(Item::Canonical(self.clone()), keep_hashable, config)
    }
}

enum Item {
    Value(Value),
    Canonical(Canonical),
    /// One entry of a frozen map encoded in hashable mode.
    Pair(Canonical, Canonical),
}

enum Shape {
    Sequence,
    Mapping,
}

struct Frame {
    id: Option<usize>,
    shape: Shape,
    children: std::vec::IntoIter<(Item, bool)>,
    out: Vec<Plain>,
}

impl Frame {
    fn finish(self) -> Plain {
        match self.shape {
            Shape::Sequence => Plain::Sequence(self.out),
            Shape::Mapping => {
                let mut entries = IndexMap::with_capacity(self.out.len() / 2);
                let mut items = self.out.into_iter();
                while let (Some(key), Some(value)) = (items.next(), items.next()) {
                    entries.insert(key, value);
                }
                Plain::Mapping(entries)
            }
        }
    }
}

enum Step {
    Done(Plain),
    Descend(Frame),
}

fn serialize_tree(root: Item, keep_hashable: bool, config: &FreezeConfig) -> Result<Plain, FreezeError> {
    let mut guard = PathGuard::new(config);
    let mut current = match step(root, keep_hashable, &mut guard, 1)? {
        Step::Done(plain) => return Ok(plain),
        Step::Descend(frame) => frame,
    };
    let mut parents: Vec<Frame> = Vec::new();

    loop {
        if let Some((child, child_hashable)) = current.children.next() {
            let depth = parents.len() + 2;
            match step(child, child_hashable, &mut guard, depth)? {
                Step::Done(plain) => current.out.push(plain),
                Step::Descend(frame) => parents.push(std::mem::replace(&mut current, frame)),
            }
            continue;
        }

        guard.leave(current.id);
        let plain = current.finish();
        match parents.pop() {
            Some(mut parent) => {
                parent.out.push(plain);
                current = parent;
            }
            None => return Ok(plain),
        }
    }
}

fn unhashable(type_name: &str) -> FreezeError {
    FreezeError::not_hashable(type_name, "not hashable by definition")
}

fn scalar(s: &Scalar) -> Result<Step, FreezeError> {
    match s {
        Scalar::Ellipsis => Err(FreezeError::unsupported("ellipsis", "cannot serialize")),
        other => Ok(Step::Done(Plain::Scalar(other.clone()))),
    }
}

fn step(item: Item, keep_hashable: bool, guard: &mut PathGuard, depth: usize) -> Result<Step, FreezeError> {
    let (id, type_name, shape, children): (Option<usize>, String, Shape, Vec<(Item, bool)>) = match item {
        Item::Value(value) => match &value {
            Value::Scalar(s) => return scalar(s),
            Value::Frozen(c) => return step(Item::Canonical(c.clone()), keep_hashable, guard, depth),
            Value::Opaque(object) => {
                return Err(FreezeError::unsupported(object.type_name(), "cannot serialize"))
            }
            Value::List(list) => {
                if keep_hashable {
                    return Err(unhashable("list"));
                }
                let children = list
                    .read()
                    .iter()
                    .map(|child| (Item::Value(child.clone()), false))
                    .collect();
                (value.container_id(), "list".to_string(), Shape::Sequence, children)
            }
            Value::Set(set) => {
                if keep_hashable {
                    return Err(unhashable("set"));
                }
                let children = set
                    .read()
                    .iter()
                    .map(|element| (Item::Canonical(element.clone()), false))
                    .collect();
                (value.container_id(), "set".to_string(), Shape::Sequence, children)
            }
            Value::Tuple(items) => {
                let children = items
                    .iter()
                    .map(|child| (Item::Value(child.clone()), keep_hashable))
                    .collect();
                (None, "tuple".to_string(), Shape::Sequence, children)
            }
            Value::Dict(dict) => {
                if keep_hashable {
                    return Err(unhashable("dict"));
                }
                let children = dict
                    .read()
                    .iter()
                    .flat_map(|(key, child)| {
                        [
                            (Item::Canonical(key.clone()), true),
                            (Item::Value(child.clone()), false),
                        ]
                    })
                    .collect();
                (value.container_id(), "dict".to_string(), Shape::Mapping, children)
            }
        },
        Item::Canonical(canonical) => match &canonical {
            Canonical::Scalar(s) => return scalar(s),
            Canonical::Opaque(atom) => {
                return Err(FreezeError::unsupported(atom.type_name(), "cannot serialize"))
            }
            Canonical::Set(set) => {
                let children = set
                    .iter()
                    .map(|element| (Item::Canonical(element.clone()), keep_hashable))
                    .collect();
                (None, "frozenset".to_string(), Shape::Sequence, children)
            }
            Canonical::Tuple(items) => {
                let children = items
                    .iter()
                    .map(|child| (Item::Canonical(child.clone()), keep_hashable))
                    .collect();
                (None, "tuple".to_string(), Shape::Sequence, children)
            }
            Canonical::Map(map) if keep_hashable => {
                let children = map
                    .items()
                    .map(|(key, child)| (Item::Pair(key.clone(), child.clone()), true))
                    .collect();
                (None, "FrozenMap".to_string(), Shape::Sequence, children)
            }
            Canonical::Map(map) => {
                let children = map
                    .items()
                    .flat_map(|(key, child)| {
                        [
                            (Item::Canonical(key.clone()), true),
                            (Item::Canonical(child.clone()), false),
                        ]
                    })
                    .collect();
                (None, "FrozenMap".to_string(), Shape::Mapping, children)
            }
        },
        // Both halves in hashable mode, values included: the encoded pair
        // must itself stay hashable.
        Item::Pair(key, value) => (
            None,
            "tuple".to_string(),
            Shape::Sequence,
            vec![(Item::Canonical(key), true), (Item::Canonical(value), true)],
        ),
    };

    guard.enter(depth, id, &type_name)?;
    Ok(Step::Descend(Frame {
        id,
        shape,
        children: children.into_iter(),
        out: Vec::new(),
    }))
}
