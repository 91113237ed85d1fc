//! # Fingerprints: Stable Cache Keys
//!
//! `Hash` values are process-local. When a deep-frozen configuration has
//! to key something that outlives the process (an on-disk cache, a value
//! shared with another service) callers need a stable digest instead.
//!
//! ## Invariant
//!
//! `CanonicalBytes` has a private inner field. The only way to construct it
//! is [`CanonicalBytes::new`], which encodes a [`Canonical`] tree so that
//! map entries and set elements are sorted by their own encoding. Two equal
//! canonical values therefore always produce the same bytes, whatever
//! order they were built in, and [`sha256_fingerprint`] accepts nothing
//! else.
//!
//! ## Encoding
//!
//! Every node is a one-byte tag followed by its payload. Integers and
//! floats are 8 bytes big-endian (floats normalized as for equality);
//! text, opaque type names and identities are length-prefixed; tuples,
//! sets and maps carry an element count. The encoding is prefix-free, so
//! distinct trees never collide before hashing.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::canonical::Canonical;
use crate::scalar::Scalar;

/// Bytes produced exclusively by the canonical tree encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Encode a canonical value.
    pub fn new(value: &Canonical) -> Self {
        Self(encode(value))
    }

    /// Access the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the encoding.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the encoding is empty. Never true for a real value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A SHA-256 digest of canonical bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// The raw digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute the fingerprint of canonical bytes.
pub fn sha256_fingerprint(data: &CanonicalBytes) -> Fingerprint {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    Fingerprint(bytes)
}

impl Canonical {
    /// Fingerprint of this value; independent of construction order.
    pub fn fingerprint(&self) -> Fingerprint {
        sha256_fingerprint(&CanonicalBytes::new(self))
    }
}

const TAG_NONE: u8 = b'n';
const TAG_TRUE: u8 = b't';
const TAG_FALSE: u8 = b'f';
const TAG_INT: u8 = b'i';
const TAG_FLOAT: u8 = b'd';
const TAG_TEXT: u8 = b's';
const TAG_ELLIPSIS: u8 = b'e';
const TAG_OPAQUE: u8 = b'o';
const TAG_TUPLE: u8 = b'T';
const TAG_SET: u8 = b'S';
const TAG_MAP: u8 = b'M';
const TAG_PAIR: u8 = b'P';

enum Node<'a> {
    Value(&'a Canonical),
    Pair(&'a Canonical, &'a Canonical),
}

struct Frame<'a> {
    tag: u8,
    sorted: bool,
    counted: bool,
    children: std::vec::IntoIter<Node<'a>>,
    out: Vec<Vec<u8>>,
}

impl Frame<'_> {
    fn finish(mut self) -> Vec<u8> {
        if self.sorted {
            self.out.sort_unstable();
        }
        let mut bytes = vec![self.tag];
        if self.counted {
            bytes.extend_from_slice(&(self.out.len() as u64).to_be_bytes());
        }
        for child in self.out {
            bytes.extend_from_slice(&child);
        }
        bytes
    }
}

enum Step<'a> {
    Leaf(Vec<u8>),
    Branch(Frame<'a>),
}

// Post-order walk with an explicit stack; canonical trees may be deeper
// than the thread stack allows.
fn encode(root: &Canonical) -> Vec<u8> {
    let mut current = match step(Node::Value(root)) {
        Step::Leaf(bytes) => return bytes,
        Step::Branch(frame) => frame,
    };
    let mut parents: Vec<Frame<'_>> = Vec::new();

    loop {
        if let Some(child) = current.children.next() {
            match step(child) {
                Step::Leaf(bytes) => current.out.push(bytes),
                Step::Branch(frame) => parents.push(std::mem::replace(&mut current, frame)),
            }
            continue;
        }
        let bytes = current.finish();
        match parents.pop() {
            Some(mut parent) => {
                parent.out.push(bytes);
                current = parent;
            }
            None => return bytes,
        }
    }
}

fn branch<'a>(tag: u8, sorted: bool, counted: bool, children: Vec<Node<'a>>) -> Step<'a> {
    Step::Branch(Frame {
        tag,
        sorted,
        counted,
        children: children.into_iter(),
        out: Vec::new(),
    })
}

fn step(node: Node<'_>) -> Step<'_> {
    let value = match node {
        Node::Pair(key, value) => {
            return branch(TAG_PAIR, false, false, vec![Node::Value(key), Node::Value(value)])
        }
        Node::Value(value) => value,
    };
    match value {
        Canonical::Scalar(s) => Step::Leaf(encode_scalar(s)),
        Canonical::Opaque(atom) => {
            let mut bytes = vec![TAG_OPAQUE];
            push_len_prefixed(&mut bytes, atom.type_name().as_bytes());
            push_len_prefixed(&mut bytes, atom.identity());
            Step::Leaf(bytes)
        }
        Canonical::Tuple(items) => branch(TAG_TUPLE, false, true, items.iter().map(Node::Value).collect()),
        Canonical::Set(set) => branch(TAG_SET, true, true, set.iter().map(Node::Value).collect()),
        Canonical::Map(map) => branch(
            TAG_MAP,
            true,
            true,
            map.items().map(|(k, v)| Node::Pair(k, v)).collect(),
        ),
    }
}

fn encode_scalar(scalar: &Scalar) -> Vec<u8> {
    match scalar {
        Scalar::None => vec![TAG_NONE],
        Scalar::Bool(true) => vec![TAG_TRUE],
        Scalar::Bool(false) => vec![TAG_FALSE],
        Scalar::Ellipsis => vec![TAG_ELLIPSIS],
        Scalar::Int(i) => {
            let mut bytes = vec![TAG_INT];
            bytes.extend_from_slice(&i.to_be_bytes());
            bytes
        }
        Scalar::Float(x) => {
            let normalized = if x.is_nan() {
                f64::NAN
            } else if *x == 0.0 {
                0.0
            } else {
                *x
            };
            let mut bytes = vec![TAG_FLOAT];
            bytes.extend_from_slice(&normalized.to_bits().to_be_bytes());
            bytes
        }
        Scalar::Text(s) => {
            let mut bytes = vec![TAG_TEXT];
            push_len_prefixed(&mut bytes, s.as_bytes());
            bytes
        }
    }
}

fn push_len_prefixed(bytes: &mut Vec<u8>, payload: &[u8]) {
    bytes.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    bytes.extend_from_slice(payload);
}
