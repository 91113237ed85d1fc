//! # deepfreeze: Mutable Tree to Canonical Value
//!
//! Converts an arbitrary [`Value`] tree into its immutable, hashable
//! [`Canonical`] counterpart.
//!
//! ## Dispatch (in priority order)
//!
//! 1. Scalars and already-frozen values are returned unchanged.
//! 2. Sets become frozen sets of the same elements. This step is shallow:
//!    set elements are canonical already.
//! 3. Lists and tuples become tuples of recursively frozen elements.
//! 4. Dicts become frozen maps of recursively frozen values; keys are kept.
//! 5. Opaque values must be hashable (else `NotHashable`) and must not
//!    answer membership tests (else `UnsupportedType`).
//!
//! The walk keeps an explicit frame stack, so input depth is bounded only
//! by [`FreezeConfig::max_depth`], never by the thread stack. A mutable
//! container reached again through its own descendants is reported as
//! `CyclicStructure`.

use crate::canonical::{Canonical, OpaqueAtom};
use crate::config::FreezeConfig;
use crate::error::FreezeError;
use crate::frozen_map::FrozenMap;
use crate::value::Value;
use crate::walk::PathGuard;

/// Freeze `value` with the default configuration.
///
/// # Errors
///
/// See [`deepfreeze_with`].
pub fn deepfreeze(value: &Value) -> Result<Canonical, FreezeError> {
    deepfreeze_with(value, &FreezeConfig::default())
}

/// Freeze `value` into the canonical domain.
///
/// # Errors
///
/// - `NotHashable` for opaque values without identity.
/// - `UnsupportedType` for hashable opaque containers.
/// - `CyclicStructure` if a container contains itself.
/// - `DepthExceeded` if nesting exceeds `config.max_depth`.
pub fn deepfreeze_with(value: &Value, config: &FreezeConfig) -> Result<Canonical, FreezeError> {
    freeze_tree(value, config).map_err(|e| {
        tracing::debug!(root = value.type_name(), error = %e, "deepfreeze rejected input");
        e
    })
}

enum Step {
    Done(Canonical),
    Descend(Frame),
}

struct Frame {
    id: Option<usize>,
    kind: FrameKind,
}

enum FrameKind {
    Sequence {
        items: std::vec::IntoIter<Value>,
        out: Vec<Canonical>,
    },
    Mapping {
        entries: std::vec::IntoIter<(Canonical, Value)>,
        key: Option<Canonical>,
        out: Vec<(Canonical, Canonical)>,
    },
}

impl Frame {
    fn next_child(&mut self) -> Option<Value> {
        match &mut self.kind {
            FrameKind::Sequence { items, .. } => items.next(),
            FrameKind::Mapping { entries, key, .. } => entries.next().map(|(k, v)| {
                *key = Some(k);
                v
            }),
        }
    }

    fn accept(&mut self, frozen: Canonical) {
        match &mut self.kind {
            FrameKind::Sequence { out, .. } => out.push(frozen),
            FrameKind::Mapping { key, out, .. } => {
                if let Some(key) = key.take() {
                    out.push((key, frozen));
                }
            }
        }
    }

    fn finish(self) -> Canonical {
        match self.kind {
            FrameKind::Sequence { out, .. } => Canonical::tuple(out),
            FrameKind::Mapping { out, .. } => Canonical::Map(FrozenMap::from_pairs(out)),
        }
    }
}

fn freeze_tree(root: &Value, config: &FreezeConfig) -> Result<Canonical, FreezeError> {
    let mut guard = PathGuard::new(config);
    let mut current = match step(root, &mut guard, 1)? {
        Step::Done(frozen) => return Ok(frozen),
        Step::Descend(frame) => frame,
    };
    let mut parents: Vec<Frame> = Vec::new();

    loop {
        if let Some(child) = current.next_child() {
            let depth = parents.len() + 2;
            match step(&child, &mut guard, depth)? {
                Step::Done(frozen) => current.accept(frozen),
                Step::Descend(frame) => parents.push(std::mem::replace(&mut current, frame)),
            }
            continue;
        }

        guard.leave(current.id);
        let frozen = current.finish();
        match parents.pop() {
            Some(mut parent) => {
                parent.accept(frozen);
                current = parent;
            }
            None => return Ok(frozen),
        }
    }
}

fn step(value: &Value, guard: &mut PathGuard, depth: usize) -> Result<Step, FreezeError> {
    let kind = match value {
        Value::Scalar(s) => return Ok(Step::Done(Canonical::Scalar(s.clone()))),
        Value::Frozen(c) => return Ok(Step::Done(c.clone())),
        Value::Set(set) => {
            return Ok(Step::Done(Canonical::Set(
                set.read().iter().cloned().collect(),
            )))
        }
        Value::Opaque(object) => {
            let atom = OpaqueAtom::new(object)?;
            if object.supports_membership() {
                return Err(FreezeError::unsupported(
                    object.type_name(),
                    "hashable collection of unknown shape cannot be frozen",
                ));
            }
            return Ok(Step::Done(Canonical::Opaque(atom)));
        }
        Value::List(list) => FrameKind::Sequence {
            items: list.read().clone().into_iter(),
            out: Vec::new(),
        },
        Value::Tuple(items) => FrameKind::Sequence {
            items: items.to_vec().into_iter(),
            out: Vec::with_capacity(items.len()),
        },
        Value::Dict(dict) => FrameKind::Mapping {
            entries: dict.read().snapshot().into_iter(),
            key: None,
            out: Vec::new(),
        },
    };

    let id = value.container_id();
    guard.enter(depth, id, value.type_name())?;
    Ok(Step::Descend(Frame { id, kind }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::Opaque;
    use crate::scalar::Scalar;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;
    use std::hash::{Hash, Hasher};

    #[derive(Debug)]
    struct Point(i32, i32);

    impl Opaque for Point {
        fn type_name(&self) -> &str {
            "Point"
        }
        fn identity(&self) -> Option<Vec<u8>> {
            let mut bytes = self.0.to_be_bytes().to_vec();
            bytes.extend_from_slice(&self.1.to_be_bytes());
            Some(bytes)
        }
    }

    #[derive(Debug)]
    struct Buffer;

    impl Opaque for Buffer {
        fn type_name(&self) -> &str {
            "Buffer"
        }
        fn identity(&self) -> Option<Vec<u8>> {
            None
        }
    }

    #[derive(Debug)]
    struct Registry;

    impl Opaque for Registry {
        fn type_name(&self) -> &str {
            "Registry"
        }
        fn identity(&self) -> Option<Vec<u8>> {
            Some(b"registry".to_vec())
        }
        fn supports_membership(&self) -> bool {
            true
        }
    }

    fn hash_of(c: &Canonical) -> u64 {
        let mut h = DefaultHasher::new();
        c.hash(&mut h);
        h.finish()
    }

    #[test]
    fn scalars_pass_through() {
        for scalar in [
            Scalar::None,
            Scalar::Bool(false),
            Scalar::Int(7),
            Scalar::Float(2.5),
            Scalar::from("text"),
            Scalar::Ellipsis,
        ] {
            assert_eq!(
                deepfreeze(&Value::Scalar(scalar.clone())).unwrap(),
                Canonical::Scalar(scalar)
            );
        }
    }

    #[test]
    fn lists_and_tuples_become_tuples() {
        let value = Value::list([Value::from(1), Value::tuple([Value::from(2), Value::list([])])]);
        let expected = Canonical::tuple([
            1.into(),
            Canonical::tuple([2.into(), Canonical::tuple([])]),
        ]);
        assert_eq!(deepfreeze(&value).unwrap(), expected);
    }

    #[test]
    fn dict_values_freeze_recursively() {
        let value = Value::dict([(
            "a",
            Value::dict([("nested", Value::list([Value::from(1), Value::list([2.into(), 3.into()])]))]),
        )]);
        let frozen = deepfreeze(&value).unwrap();
        let inner = frozen.as_map().unwrap().index(&"a".into()).unwrap();
        let nested = inner.as_map().unwrap().get(&"nested".into()).unwrap();
        assert_eq!(
            *nested,
            Canonical::tuple([1.into(), Canonical::tuple([2.into(), 3.into()])])
        );
        let mut seen = HashSet::new();
        assert!(seen.insert(frozen));
    }

    #[test]
    fn sets_freeze_shallowly() {
        let value = Value::set([Canonical::from(1), Canonical::tuple([2.into()])]);
        let frozen = deepfreeze(&value).unwrap();
        assert_eq!(frozen, Canonical::set([Canonical::tuple([2.into()]), 1.into()]));
    }

    #[test]
    fn frozen_values_are_returned_unchanged() {
        let frozen = Canonical::map([("k".into(), 1.into())]);
        assert_eq!(deepfreeze(&Value::Frozen(frozen.clone())).unwrap(), frozen);
    }

    #[test]
    fn deepfreeze_is_idempotent() {
        let value = Value::dict([
            ("b", Value::list([Value::from(1.5), Value::none()])),
            ("a", Value::set([Canonical::from("x")])),
        ]);
        let once = deepfreeze(&value).unwrap();
        let twice = deepfreeze(&Value::from(once.clone())).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn construction_order_does_not_change_result() {
        let forward = Value::dict([("x", Value::from(1)), ("y", Value::list([Value::from(2)]))]);
        let backward = Value::dict([("y", Value::list([Value::from(2)])), ("x", Value::from(1))]);
        let a = deepfreeze(&forward).unwrap();
        let b = deepfreeze(&backward).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn hashable_opaque_atoms_pass_through() {
        let value = Value::list([Value::opaque(Point(1, 2))]);
        let frozen = deepfreeze(&value).unwrap();
        let items = frozen.as_tuple().unwrap();
        assert!(matches!(&items[0], Canonical::Opaque(atom) if atom.type_name() == "Point"));
    }

    #[test]
    fn unhashable_opaque_is_rejected() {
        let value = Value::dict([("buf", Value::opaque(Buffer))]);
        assert!(matches!(
            deepfreeze(&value),
            Err(FreezeError::NotHashable { type_name, .. }) if type_name == "Buffer"
        ));
    }

    #[test]
    fn opaque_collection_is_unsupported() {
        assert!(matches!(
            deepfreeze(&Value::opaque(Registry)),
            Err(FreezeError::UnsupportedType { type_name, .. }) if type_name == "Registry"
        ));
    }

    #[test]
    fn self_containing_list_is_cyclic() {
        let list = Value::list([Value::from(1)]);
        if let Value::List(items) = &list {
            items.write().push(list.clone());
        }
        assert!(matches!(
            deepfreeze(&list),
            Err(FreezeError::CyclicStructure { depth: 2, .. })
        ));
    }

    #[test]
    fn indirect_cycle_through_dict_is_detected() {
        let dict = Value::dict::<&str, _>([]);
        let list = Value::list([dict.clone()]);
        if let Value::Dict(entries) = &dict {
            entries.write().insert("back".into(), Value::tuple([list.clone()]));
        }
        assert!(matches!(
            deepfreeze(&list),
            Err(FreezeError::CyclicStructure { .. })
        ));
    }

    #[test]
    fn shared_sibling_is_not_a_cycle() {
        let shared = Value::list([Value::from(1)]);
        let value = Value::list([shared.clone(), shared]);
        let frozen = deepfreeze(&value).unwrap();
        let one = Canonical::tuple([1.into()]);
        assert_eq!(frozen, Canonical::tuple([one.clone(), one]));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut value = Value::from(0);
        for _ in 0..5 {
            value = Value::list([value]);
        }
        let config = FreezeConfig::default().with_max_depth(5);
        assert!(deepfreeze_with(&value, &config).is_ok());
        let config = FreezeConfig::default().with_max_depth(4);
        assert_eq!(
            deepfreeze_with(&value, &config),
            Err(FreezeError::DepthExceeded { limit: 4 })
        );
    }

    #[test]
    fn default_limit_accepts_deep_nesting() {
        let mut value = Value::from("leaf");
        for _ in 0..500 {
            value = Value::dict([("child", value)]);
        }
        assert!(deepfreeze(&value).is_ok());
    }
}
