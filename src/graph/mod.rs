//! Core graph data structures: nodes, edges, and paths.

pub mod edge;
pub mod node;
pub mod path;

pub use edge::{effective_weight, Edge, EdgeFlags, Relation, RelMask, LAMBDA_MIX};
pub use node::{now_ns, Node, NodeFlags, NodeType};
pub use path::Path;
