//! Path: an ordered list of edges with an aggregate score.
//!
//! Paths are first-class so that traces of successful reasoning can be
//! composed, stored, and reinforced as a unit.

use crate::ids::{self, EdgeId, PathId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub id: PathId,
    pub edges: Vec<EdgeId>,
    pub score: f64,
}

impl Path {
    pub fn new(edges: Vec<EdgeId>, score: f64) -> Self {
        let id = ids::path_id(&edges);
        Self { id, edges, score }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EdgeId;

    #[test]
    fn path_id_derived_from_edge_sequence() {
        let e1 = EdgeId::from_bytes([1u8; 32]);
        let e2 = EdgeId::from_bytes([2u8; 32]);
        let p1 = Path::new(vec![e1, e2], 1.0);
        let p2 = Path::new(vec![e1, e2], 2.0);
        // Same edge sequence -> same id, regardless of score.
        assert_eq!(p1.id, p2.id);
    }
}
