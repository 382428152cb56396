//! Content-addressed identifiers for nodes, edges, and paths.
//!
//! Every ID is the BLAKE3 hash of a canonical byte encoding of the record's
//! defining tuple. Two records with identical canonical content always
//! produce identical IDs — `upsert` is therefore both create and merge,
//! never a counter allocation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte content-addressed identifier.
///
/// The all-zero value is reserved and means "absent" (`is_zero`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id32(pub [u8; 32]);

impl Id32 {
    pub const ZERO: Id32 = Id32([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Hex-encode for display/debug/logging.
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            s.push_str(&format!("{:02x}", b));
        }
        s
    }
}

impl std::hash::Hash for Id32 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // The bytes already are a strong hash; feed them directly rather than
        // re-hashing through a second digest.
        state.write(&self.0);
    }
}

impl fmt::Debug for Id32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl fmt::Display for Id32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Id32);

        impl $name {
            pub const ZERO: $name = $name(Id32::ZERO);

            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(Id32::from_bytes(bytes))
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                self.0.as_bytes()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(NodeId);
id_newtype!(EdgeId);
id_newtype!(PathId);

/// Hash a sequence of byte slices into a 32-byte content-addressed ID.
///
/// Each slice is length-prefixed before being fed to the hasher so that
/// `hash(["ab", "c"]) != hash(["a", "bc"])`.
fn hash_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

use crate::graph::edge::Relation;
use crate::graph::node::{NodeFlags, NodeType};

/// Canonical node ID: `hash(type, flags, payload)`.
pub fn node_id(node_type: NodeType, flags: NodeFlags, payload: &[u8]) -> NodeId {
    let type_byte = [node_type as u8];
    let flags_bytes = flags.bits().to_be_bytes();
    NodeId::from_bytes(hash_parts(&[&type_byte, &flags_bytes, payload]))
}

/// Canonical edge ID: `hash(src, rel, dst, layer)`.
///
/// This is the one canonical contract: full content hashing, never a
/// short-prefix or zero-ID shortcut.
pub fn edge_id(src: NodeId, rel: Relation, dst: NodeId, layer: u16) -> EdgeId {
    let rel_byte = [rel as u8];
    let layer_bytes = layer.to_be_bytes();
    EdgeId::from_bytes(hash_parts(&[
        src.as_bytes(),
        &rel_byte,
        dst.as_bytes(),
        &layer_bytes,
    ]))
}

/// Canonical path ID: hash of the ordered edge ID sequence.
pub fn path_id(edges: &[EdgeId]) -> PathId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(edges.len() as u64).to_be_bytes());
    for e in edges {
        hasher.update(e.as_bytes());
    }
    PathId::from_bytes(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_id_is_absent() {
        assert!(NodeId::ZERO.is_zero());
        assert!(!node_id(NodeType::Symbol, NodeFlags::empty(), b"cats").is_zero());
    }

    #[test]
    fn identical_content_produces_identical_ids() {
        let a = node_id(NodeType::Concept, NodeFlags::ANCHOR, b"mammals");
        let b = node_id(NodeType::Concept, NodeFlags::ANCHOR, b"mammals");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_produces_different_ids() {
        let a = node_id(NodeType::Concept, NodeFlags::empty(), b"mammals");
        let b = node_id(NodeType::Concept, NodeFlags::empty(), b"animals");
        assert_ne!(a, b);
    }

    #[test]
    fn edge_id_is_canonical_over_src_rel_dst_layer() {
        let a = node_id(NodeType::Symbol, NodeFlags::empty(), b"cats");
        let b = node_id(NodeType::Symbol, NodeFlags::empty(), b"mammals");
        let e1 = edge_id(a, Relation::Exact, b, 0);
        let e2 = edge_id(a, Relation::Exact, b, 0);
        let e3 = edge_id(a, Relation::Exact, b, 1);
        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
    }

    #[test]
    fn path_id_is_order_sensitive() {
        let a = node_id(NodeType::Symbol, NodeFlags::empty(), b"a");
        let b = node_id(NodeType::Symbol, NodeFlags::empty(), b"b");
        let c = node_id(NodeType::Symbol, NodeFlags::empty(), b"c");
        let e1 = edge_id(a, Relation::Exact, b, 0);
        let e2 = edge_id(b, Relation::Exact, c, 0);
        assert_ne!(path_id(&[e1, e2]), path_id(&[e2, e1]));
    }
}
