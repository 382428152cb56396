//! Storage abstraction: the `GraphStore` trait plus its two backends.
//!
//! `MemoryStore` is a `DashMap`-backed in-process store; `FileStore`
//! persists to a directory of big-endian binary files using a packed
//! record layout.

pub mod file;
pub mod memory;

use crate::error::StorageResult;
use crate::graph::{Edge, Node, Path, RelMask};
use crate::ids::{EdgeId, NodeId, PathId};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Optional filters applied when listing nodes.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub node_type: Option<crate::graph::NodeType>,
    pub anchors_only: bool,
}

/// The storage contract every backend implements.
///
/// All mutating operations are upserts: calling `put_node`/`put_edge` with
/// content that canonically matches an existing record merges into it
/// rather than duplicating it (I4).
pub trait GraphStore: Send + Sync {
    fn put_node(&self, node: Node) -> StorageResult<NodeId>;
    fn get_node(&self, id: NodeId) -> StorageResult<Option<Node>>;
    fn remove_node(&self, id: NodeId) -> StorageResult<()>;
    fn list_nodes(&self, filter: &NodeFilter) -> StorageResult<Vec<Node>>;

    fn put_edge(&self, edge: Edge) -> StorageResult<EdgeId>;
    fn get_edge(&self, id: EdgeId) -> StorageResult<Option<Edge>>;
    fn remove_edge(&self, id: EdgeId) -> StorageResult<()>;

    /// Overwrite an edge's record outright, bypassing the upsert-merge rule.
    /// Used by callers (decay) that have already computed the full next
    /// state of an existing edge and must not have it additively merged.
    fn replace_edge(&self, edge: Edge) -> StorageResult<()>;

    /// Outgoing edges from `node`, optionally restricted to a relation mask.
    fn edges_from(&self, node: NodeId, mask: RelMask) -> StorageResult<Vec<Edge>>;
    /// Incoming edges into `node`, optionally restricted to a relation mask.
    fn edges_into(&self, node: NodeId, mask: RelMask) -> StorageResult<Vec<Edge>>;

    fn put_path(&self, path: Path) -> StorageResult<PathId>;
    fn get_path(&self, id: PathId) -> StorageResult<Option<Path>>;

    fn node_count(&self) -> StorageResult<usize>;
    fn edge_count(&self) -> StorageResult<usize>;
    fn path_count(&self) -> StorageResult<usize>;

    /// Flush buffered writes to durable storage. A no-op for `MemoryStore`.
    fn flush(&self) -> StorageResult<()>;
}
