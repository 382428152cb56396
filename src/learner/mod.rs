//! Hebbian reinforcement, decay, and context-window similarity.
//!
//! Explicit observations reinforce harder than inferred ones, both weight
//! tracks decay continuously, and an edge below `epsilon_prune` (and not
//! anchored) is a pruning candidate.

use std::collections::VecDeque;

use crate::graph::{now_ns, Edge, EdgeFlags, Relation};
use crate::ids::{EdgeId, NodeId};
use crate::store::GraphStore;

#[derive(Debug, Clone, Copy)]
pub struct LearningParams {
    pub alpha_core: f32,
    pub alpha_ctx: f32,
    pub alpha_infer: f32,
    pub lambda_core: f32,
    pub lambda_ctx: f32,
    pub epsilon_prune: f32,
    pub epsilon_anchor: f32,
    pub context_window_size: usize,
    pub similarity_threshold: f64,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            alpha_core: 1.0,
            alpha_ctx: 0.5,
            alpha_infer: 0.2,
            lambda_core: 0.001,
            lambda_ctx: 0.01,
            epsilon_prune: 0.2,
            epsilon_anchor: 0.1,
            context_window_size: 10,
            similarity_threshold: 0.3,
        }
    }
}

/// Sliding FIFO window over recently visited nodes, used to gauge context
/// similarity for reinforcement decisions.
#[derive(Default)]
pub struct ContextWindow {
    window: VecDeque<NodeId>,
    capacity: usize,
}

impl ContextWindow {
    pub fn new(capacity: usize) -> Self {
        Self { window: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push_many(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        for n in nodes {
            if self.window.len() == self.capacity {
                self.window.pop_front();
            }
            self.window.push_back(n);
        }
    }

    pub fn snapshot(&self) -> Vec<NodeId> {
        self.window.iter().copied().collect()
    }
}

/// Jaccard similarity between two node sets: intersection over union.
pub fn context_similarity(a: &[NodeId], b: &[NodeId]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let set_a: std::collections::HashSet<_> = a.iter().collect();
    let set_b: std::collections::HashSet<_> = b.iter().collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

pub struct EdgeLearner {
    params: LearningParams,
    context_window: ContextWindow,
}

impl EdgeLearner {
    pub fn new(params: LearningParams) -> Self {
        let context_window = ContextWindow::new(params.context_window_size);
        Self { params, context_window }
    }

    pub fn update_context_window(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        self.context_window.push_many(nodes);
    }

    /// Reinforce one edge after it was used in a reasoning step or observed
    /// directly. Explicit observations get the full `alpha_core`/`alpha_ctx`
    /// increment; inferred reinforcement (from beam-search usage, not direct
    /// teaching) is scaled down by `alpha_infer`.
    pub fn reinforce(&self, edge: &mut Edge, is_explicit: bool) {
        let (core_gain, ctx_gain) = if is_explicit {
            (self.params.alpha_core, self.params.alpha_ctx)
        } else {
            (self.params.alpha_infer, self.params.alpha_infer)
        };
        edge.w_core = (edge.w_core + core_gain * (1.0 - edge.w_core)).clamp(0.0, 1.0);
        edge.w_ctx = (edge.w_ctx + ctx_gain * (1.0 - edge.w_ctx)).clamp(0.0, 1.0);
        edge.count += 1;
        edge.ts_last = now_ns();
        edge.refresh_w();
    }

    /// Reinforce an edge by an externally supplied score in `[0, 1]` rather
    /// than a fixed explicit/inferred gain. Used for ex-post reinforcement
    /// from an external scorer callback after a path has already been
    /// rendered and returned; scaled by `alpha_infer` like other indirect
    /// reinforcement.
    pub fn reinforce_scaled(&self, edge: &mut Edge, score: f64) {
        let gain = self.params.alpha_infer * score.clamp(0.0, 1.0) as f32;
        edge.w_core = (edge.w_core + gain * (1.0 - edge.w_core)).clamp(0.0, 1.0);
        edge.w_ctx = (edge.w_ctx + gain * (1.0 - edge.w_ctx)).clamp(0.0, 1.0);
        edge.count += 1;
        edge.ts_last = now_ns();
        edge.refresh_w();
    }

    /// Exponential decay of both weight tracks proportional to elapsed time
    /// since last use. `dt_secs` is wall-clock seconds, not nanoseconds, to
    /// keep `lambda_core`/`lambda_ctx` at human-legible per-second rates.
    pub fn decay_edge(&self, edge: &mut Edge, dt_secs: f64) {
        let core_decay = (-self.params.lambda_core as f64 * dt_secs).exp() as f32;
        let ctx_decay = (-self.params.lambda_ctx as f64 * dt_secs).exp() as f32;
        edge.w_core *= core_decay;
        edge.w_ctx *= ctx_decay;
        edge.refresh_w();
    }

    /// An edge is a pruning candidate when its effective weight drops below
    /// `epsilon_prune` and it carries neither an anchor flag nor enough
    /// weight to clear the anchor floor.
    pub fn should_prune(&self, edge: &Edge) -> bool {
        if edge.is_anchor() {
            return false;
        }
        edge.w < self.params.epsilon_prune && edge.w < self.params.epsilon_anchor
    }

    /// Decay every non-anchor edge in the store, collecting IDs that cross
    /// the pruning threshold. Callers decide whether to actually remove them
    /// (the engine's maintenance pass does). Anchor edges are left
    /// untouched entirely (I3): not decayed, not rewritten.
    pub fn decay_all_edges(&self, store: &dyn GraphStore, dt_secs: f64) -> Vec<EdgeId> {
        let mut prune_candidates = Vec::new();
        let nodes = store.list_nodes(&Default::default()).unwrap_or_default();
        let mut seen = std::collections::HashSet::new();
        for node in nodes {
            for mut edge in store.edges_from(node.id, crate::graph::RelMask::none()).unwrap_or_default() {
                if !seen.insert(edge.id) || edge.is_anchor() {
                    continue;
                }
                self.decay_edge(&mut edge, dt_secs);
                if self.should_prune(&edge) {
                    prune_candidates.push(edge.id);
                } else {
                    let _ = store.replace_edge(edge);
                }
            }
        }
        prune_candidates
    }

    /// Materialize an edge inferred by the miner or beam search into a
    /// durable, low-weight `INFERRED` edge — gated on a minimum confidence
    /// so noise doesn't flood the graph.
    pub fn materialize_inferred_edge(
        &self,
        src: NodeId,
        dst: NodeId,
        rel: Relation,
        confidence: f64,
        store: &dyn GraphStore,
    ) -> Option<EdgeId> {
        if confidence < self.params.similarity_threshold {
            return None;
        }
        let edge = Edge::new(src, rel, dst, 1, self.params.alpha_infer, self.params.alpha_infer)
            .with_flags(EdgeFlags::INFERRED);
        store.put_edge(edge).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeType};
    use crate::store::MemoryStore;

    #[test]
    fn explicit_reinforcement_outpaces_inferred() {
        let learner = EdgeLearner::new(LearningParams::default());
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        let mut explicit = Edge::new(a.id, Relation::Exact, b.id, 0, 0.1, 0.1);
        let mut inferred = Edge::new(a.id, Relation::Exact, b.id, 0, 0.1, 0.1);
        learner.reinforce(&mut explicit, true);
        learner.reinforce(&mut inferred, false);
        assert!(explicit.w_core > inferred.w_core);
    }

    #[test]
    fn decay_reduces_weight_over_time() {
        let learner = EdgeLearner::new(LearningParams::default());
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        let mut edge = Edge::new(a.id, Relation::Exact, b.id, 0, 0.8, 0.8);
        let before = edge.w;
        learner.decay_edge(&mut edge, 1000.0);
        assert!(edge.w < before);
    }

    #[test]
    fn anchored_edges_never_prune() {
        let learner = EdgeLearner::new(LearningParams::default());
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        let edge = Edge::new(a.id, Relation::Exact, b.id, 0, 0.0, 0.0).with_flags(EdgeFlags::ANCHOR);
        assert!(!learner.should_prune(&edge));
    }

    #[test]
    fn context_similarity_of_disjoint_sets_is_zero() {
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        assert_eq!(context_similarity(&[a.id], &[b.id]), 0.0);
    }

    #[test]
    fn reinforce_scaled_with_zero_score_leaves_weight_unchanged() {
        let learner = EdgeLearner::new(LearningParams::default());
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        let mut edge = Edge::new(a.id, Relation::Exact, b.id, 0, 0.4, 0.4);
        let before = edge.w;
        learner.reinforce_scaled(&mut edge, 0.0);
        assert_eq!(edge.w, before);
    }

    #[test]
    fn reinforce_scaled_with_full_score_raises_weight() {
        let learner = EdgeLearner::new(LearningParams::default());
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        let mut edge = Edge::new(a.id, Relation::Exact, b.id, 0, 0.4, 0.4);
        let before = edge.w;
        learner.reinforce_scaled(&mut edge, 1.0);
        assert!(edge.w > before);
    }

    #[test]
    fn decay_all_edges_store_roundtrip() {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        store.put_edge(Edge::new(a.id, Relation::Exact, b.id, 0, 0.05, 0.05)).unwrap();
        let learner = EdgeLearner::new(LearningParams::default());
        let candidates = learner.decay_all_edges(&store, 1.0);
        assert!(!candidates.is_empty());
    }

    #[test]
    fn decay_all_edges_replaces_rather_than_merges_survivors() {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        let id = store.put_edge(Edge::new(a.id, Relation::Exact, b.id, 0, 0.9, 0.9)).unwrap();
        let before = store.get_edge(id).unwrap().unwrap().w;
        let learner = EdgeLearner::new(LearningParams::default());
        learner.decay_all_edges(&store, 10.0);
        let after = store.get_edge(id).unwrap().unwrap().w;
        assert!(after < before, "decay must strictly reduce weight, got {before} -> {after}");
    }

    #[test]
    fn decay_all_edges_leaves_anchored_edges_untouched() {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        let edge = Edge::new(a.id, Relation::Exact, b.id, 0, 0.9, 0.9).with_flags(EdgeFlags::ANCHOR);
        let id = store.put_edge(edge).unwrap();
        let before = store.get_edge(id).unwrap().unwrap();
        let learner = EdgeLearner::new(LearningParams::default());
        learner.decay_all_edges(&store, 1_000_000.0);
        let after = store.get_edge(id).unwrap().unwrap();
        assert_eq!(after.w, before.w);
        assert_eq!(after.count, before.count);
    }
}
