//! In-process store backed by `DashMap`, keeping nodes, edges, and paths
//! in concurrent maps rather than behind a single mutex.

use dashmap::DashMap;

use crate::error::StorageResult;
use crate::graph::{Edge, Node, Path, RelMask};
use crate::ids::{EdgeId, NodeId, PathId};
use crate::store::{GraphStore, NodeFilter};

#[derive(Default)]
pub struct MemoryStore {
    nodes: DashMap<NodeId, Node>,
    edges: DashMap<EdgeId, Edge>,
    paths: DashMap<PathId, Path>,
    /// src -> outgoing edge ids, maintained alongside `edges` for O(degree) traversal.
    out_index: DashMap<NodeId, Vec<EdgeId>>,
    in_index: DashMap<NodeId, Vec<EdgeId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored paths, for backends (e.g. `FileStore`) that need to
    /// serialize the full path set rather than query it by ID.
    pub fn all_paths(&self) -> Vec<Path> {
        self.paths.iter().map(|e| e.value().clone()).collect()
    }
}

impl GraphStore for MemoryStore {
    fn put_node(&self, mut node: Node) -> StorageResult<NodeId> {
        let id = node.id;
        if let Some(mut existing) = self.nodes.get_mut(&id) {
            existing.reconfirm();
            return Ok(id);
        }
        node.confirm_count = node.confirm_count.max(1);
        self.nodes.insert(id, node);
        Ok(id)
    }

    fn get_node(&self, id: NodeId) -> StorageResult<Option<Node>> {
        Ok(self.nodes.get(&id).map(|n| n.clone()))
    }

    fn remove_node(&self, id: NodeId) -> StorageResult<()> {
        self.nodes.remove(&id);
        Ok(())
    }

    fn list_nodes(&self, filter: &NodeFilter) -> StorageResult<Vec<Node>> {
        Ok(self
            .nodes
            .iter()
            .map(|e| e.value().clone())
            .filter(|n| filter.node_type.map(|t| t == n.node_type).unwrap_or(true))
            .filter(|n| !filter.anchors_only || n.is_anchor())
            .collect())
    }

    fn put_edge(&self, mut edge: Edge) -> StorageResult<EdgeId> {
        let id = edge.id;
        if let Some(mut existing) = self.edges.get_mut(&id) {
            existing.merge_upsert(edge.w_core, edge.w_ctx);
            return Ok(id);
        }
        edge.check_invariants()
            .map_err(crate::error::StorageError::InvariantViolation)?;
        self.out_index.entry(edge.src).or_default().push(id);
        self.in_index.entry(edge.dst).or_default().push(id);
        self.edges.insert(id, edge);
        Ok(id)
    }

    fn get_edge(&self, id: EdgeId) -> StorageResult<Option<Edge>> {
        Ok(self.edges.get(&id).map(|e| e.clone()))
    }

    fn replace_edge(&self, edge: Edge) -> StorageResult<()> {
        self.edges.insert(edge.id, edge);
        Ok(())
    }

    fn remove_edge(&self, id: EdgeId) -> StorageResult<()> {
        if let Some((_, edge)) = self.edges.remove(&id) {
            if let Some(mut v) = self.out_index.get_mut(&edge.src) {
                v.retain(|e| *e != id);
            }
            if let Some(mut v) = self.in_index.get_mut(&edge.dst) {
                v.retain(|e| *e != id);
            }
        }
        Ok(())
    }

    fn edges_from(&self, node: NodeId, mask: RelMask) -> StorageResult<Vec<Edge>> {
        let ids = self
            .out_index
            .get(&node)
            .map(|v| v.clone())
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.edges.get(&id).map(|e| e.clone()))
            .filter(|e| mask == RelMask::none() || mask.test(e.rel))
            .collect())
    }

    fn edges_into(&self, node: NodeId, mask: RelMask) -> StorageResult<Vec<Edge>> {
        let ids = self
            .in_index
            .get(&node)
            .map(|v| v.clone())
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.edges.get(&id).map(|e| e.clone()))
            .filter(|e| mask == RelMask::none() || mask.test(e.rel))
            .collect())
    }

    fn put_path(&self, path: Path) -> StorageResult<PathId> {
        let id = path.id;
        self.paths.insert(id, path);
        Ok(id)
    }

    fn get_path(&self, id: PathId) -> StorageResult<Option<Path>> {
        Ok(self.paths.get(&id).map(|p| p.clone()))
    }

    fn node_count(&self) -> StorageResult<usize> {
        Ok(self.nodes.len())
    }

    fn edge_count(&self) -> StorageResult<usize> {
        Ok(self.edges.len())
    }

    fn path_count(&self) -> StorageResult<usize> {
        Ok(self.paths.len())
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeType, Relation};

    #[test]
    fn put_node_twice_reconfirms_instead_of_duplicating() {
        let store = MemoryStore::new();
        let n = Node::text(NodeType::Symbol, "cats");
        store.put_node(n.clone()).unwrap();
        store.put_node(n.clone()).unwrap();
        assert_eq!(store.node_count().unwrap(), 1);
        let fetched = store.get_node(n.id).unwrap().unwrap();
        assert_eq!(fetched.confirm_count, 2);
    }

    #[test]
    fn edges_from_respects_relmask() {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "cats");
        let b = Node::text(NodeType::Symbol, "mammals");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        let e1 = Edge::new(a.id, Relation::Isa, b.id, 0, 0.5, 0.5);
        let e2 = Edge::new(a.id, Relation::Temporal, b.id, 0, 0.5, 0.5);
        store.put_edge(e1).unwrap();
        store.put_edge(e2).unwrap();
        let mask = RelMask::of(&[Relation::Isa]);
        let out = store.edges_from(a.id, mask).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].rel, Relation::Isa);
    }

    #[test]
    fn put_edge_twice_merges_weight_and_increments_count() {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        let e = Edge::new(a.id, Relation::Exact, b.id, 0, 0.1, 0.1);
        let id = store.put_edge(e.clone()).unwrap();
        store.put_edge(e).unwrap();
        let merged = store.get_edge(id).unwrap().unwrap();
        assert_eq!(merged.count, 2);
        assert!(merged.w_core > 0.1);
    }
}
