//! Melvin: a graph-native associative reasoning engine with content-
//! addressed nodes/edges and self-reinforcing, decaying weights.
//!
//! # Core concepts
//!
//! - **Nodes/Edges**: content-addressed (BLAKE3), upsert is create-or-merge.
//! - **Dual-weight edges**: a durable `w_core` track and a fast `w_ctx`
//!   track mix into a cached effective weight `w`.
//! - **Beam search**: the reasoning "VM" that walks the graph from a query's
//!   best-matching start node toward a scored, confidence-hedged answer.
//!
//! # Example
//!
//! ```
//! use melvin_core::{MelvinConfig, MemoryStore, ReasoningEngine};
//!
//! let mut engine = ReasoningEngine::new(MemoryStore::new(), MelvinConfig::default());
//! engine.learn("cats are mammals").unwrap();
//! let answer = engine.reason("what are cats", None).unwrap();
//! assert!(!answer.sentence.is_empty());
//! ```

pub mod beam;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod ids;
pub mod learner;
pub mod miner;
pub mod nlg;
pub mod policy;
pub mod scorer;
pub mod store;

pub use config::MelvinConfig;
pub use engine::{MaintenanceReport, ReasonResult, ReasoningEngine};
pub use error::{MelvinError, MelvinResult, StorageError, StorageResult};
pub use graph::{Edge, EdgeFlags, Node, NodeFlags, NodeType, Path, RelMask, Relation};
pub use ids::{EdgeId, NodeId, PathId};
pub use policy::{Complexity, Intent, PolicyRouter};
pub use store::{FileStore, GraphStore, MemoryStore, NodeFilter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
