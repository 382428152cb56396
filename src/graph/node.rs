//! Node representation in the knowledge graph.

use crate::ids::{self, NodeId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Enumerated node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Symbol = 0,
    Phrase = 1,
    Concept = 2,
    Abstraction = 3,
    MetaCogStep = 4,
    Other = 255,
}

bitflags! {
    /// Node flag bitfield. `ANCHOR` exempts a node from decay/prune;
    /// `GENERALIZED` marks a node created by the miner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct NodeFlags: u32 {
        const ANCHOR      = 0b0000_0001;
        const GENERALIZED = 0b0000_0010;
    }
}

/// A node in the knowledge graph.
///
/// `id` is derived from `(node_type, flags, payload)` — see
/// [`crate::ids::node_id`]. Never construct an `id` any other way; doing so
/// breaks content-addressed dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub flags: NodeFlags,
    pub ts_created: u64,
    pub ts_updated: u64,
    pub payload: Vec<u8>,
    pub degree_hint: u32,
    pub confirm_count: u32,
    pub pin_expiry: u64,
}

/// Current time as nanoseconds since the Unix epoch.
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

impl Node {
    /// Create a fresh node; `id` is computed from canonical content.
    pub fn new(node_type: NodeType, flags: NodeFlags, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let id = ids::node_id(node_type, flags, &payload);
        let ts = now_ns();
        Self {
            id,
            node_type,
            flags,
            ts_created: ts,
            ts_updated: ts,
            payload,
            degree_hint: 0,
            confirm_count: 1,
            pin_expiry: 0,
        }
    }

    /// Convenience constructor for text-bearing node types.
    pub fn text(node_type: NodeType, text: &str) -> Self {
        Self::new(node_type, NodeFlags::empty(), text.as_bytes().to_vec())
    }

    pub fn is_anchor(&self) -> bool {
        self.flags.contains(NodeFlags::ANCHOR)
    }

    pub fn is_generalized(&self) -> bool {
        self.flags.contains(NodeFlags::GENERALIZED)
    }

    /// UTF-8 view of the payload, lossy if the node is not text-bearing.
    pub fn text_payload(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Merge an upsert of identical canonical content: bump `confirm_count`
    /// and `ts_updated`, leave everything else (the content-derived fields)
    /// untouched.
    pub fn reconfirm(&mut self) {
        self.confirm_count += 1;
        self.ts_updated = now_ns();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_identical_content_same_id() {
        let a = Node::text(NodeType::Symbol, "cats");
        let b = Node::text(NodeType::Symbol, "cats");
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn different_type_same_text_different_id() {
        let a = Node::text(NodeType::Symbol, "cats");
        let b = Node::text(NodeType::Concept, "cats");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn reconfirm_bumps_count_and_timestamp() {
        let mut n = Node::text(NodeType::Symbol, "cats");
        let before = n.ts_updated;
        std::thread::sleep(std::time::Duration::from_millis(1));
        n.reconfirm();
        assert_eq!(n.confirm_count, 2);
        assert!(n.ts_updated >= before);
    }

    #[test]
    fn anchor_flag_roundtrips() {
        let n = Node::new(NodeType::Concept, NodeFlags::ANCHOR, b"animals".to_vec());
        assert!(n.is_anchor());
        assert!(!n.is_generalized());
    }
}
