//! Beam search reasoning VM.
//!
//! A bounded max-heap beam of [`BeamPath`]s, expanded one hop at a time with per-path loop
//! detection and stochastic (top-p) or deterministic (top-k) edge
//! selection. `BeamSearchEngine::search` stops early when the beam empties,
//! the deadline elapses, or every surviving path is complete.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::{Edge, RelMask};
use crate::ids::NodeId;
use crate::policy::Intent;
use crate::scorer::{self, PathScorer, ScoringWeights, StepScorer, FINGERPRINT_DIM};
use crate::store::GraphStore;

#[derive(Debug, Clone, Copy)]
pub struct BeamParams {
    pub beam_width: usize,
    pub max_depth: usize,
    pub top_k: usize,
    pub top_p: f64,
    pub stop_threshold: f64,
    pub enable_loop_detection: bool,
    pub enable_stochastic_expansion: bool,
}

impl Default for BeamParams {
    fn default() -> Self {
        Self {
            beam_width: 32,
            max_depth: 5,
            top_k: 8,
            top_p: 0.9,
            stop_threshold: 0.05,
            enable_loop_detection: true,
            enable_stochastic_expansion: true,
        }
    }
}

/// One candidate reasoning chain under construction.
#[derive(Debug, Clone)]
pub struct BeamPath {
    pub edges: Vec<Edge>,
    pub nodes: Vec<NodeId>,
    pub score: f64,
    pub confidence: f64,
    pub is_complete: bool,
    pub visited_nodes: HashSet<NodeId>,
    pub visited_edges: HashSet<crate::ids::EdgeId>,
}

impl BeamPath {
    pub fn start(node: NodeId, score: f64) -> Self {
        let mut visited_nodes = HashSet::new();
        visited_nodes.insert(node);
        Self {
            edges: Vec::new(),
            nodes: vec![node],
            score,
            confidence: 0.0,
            is_complete: false,
            visited_nodes,
            visited_edges: HashSet::new(),
        }
    }

    pub fn current_node(&self) -> NodeId {
        *self.nodes.last().expect("BeamPath always has a start node")
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn has_loop(&self) -> bool {
        self.nodes.len() != self.visited_nodes.len()
    }

    fn extend(&self, edge: Edge, step_score: f64) -> Self {
        let mut next = self.clone();
        next.visited_nodes.insert(edge.dst);
        next.visited_edges.insert(edge.id);
        next.nodes.push(edge.dst);
        next.score += step_score;
        next.edges.push(edge);
        next
    }

    /// Stable signature used for cross-path deduplication within a beam.
    fn signature(&self) -> Vec<u8> {
        let mut sig = Vec::with_capacity(self.edges.len() * 32);
        for e in &self.edges {
            sig.extend_from_slice(e.id.as_bytes());
        }
        sig
    }
}

impl PartialEq for BeamPath {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}
impl Eq for BeamPath {}
impl PartialOrd for BeamPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.score.partial_cmp(&other.score)
    }
}
impl Ord for BeamPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

/// Selects which scored edges survive to the next beam depth.
pub struct StochasticExpander {
    rng: StdRng,
}

impl StochasticExpander {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn select_top_k(&self, scored: &[(Edge, f64)], k: usize) -> Vec<Edge> {
        let mut sorted: Vec<&(Edge, f64)> = scored.iter().collect();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        sorted.into_iter().take(k).map(|(e, _)| e.clone()).collect()
    }

    /// Nucleus (top-p) sampling: rank by softmax probability, keep the
    /// smallest prefix whose cumulative mass exceeds `top_p`, then sample
    /// without replacement from that prefix until `k` edges are chosen.
    pub fn select_top_p(&mut self, scored: &[(Edge, f64)], top_p: f64, k: usize) -> Vec<Edge> {
        if scored.is_empty() {
            return Vec::new();
        }
        let mut indexed: Vec<(usize, f64)> = scored.iter().map(|(_, s)| *s).enumerate().collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        let raw_scores: Vec<f64> = indexed.iter().map(|(_, s)| *s).collect();
        let probs = scorer::softmax(&raw_scores);
        let mut cumulative = 0.0;
        let mut nucleus = Vec::new();
        for (i, p) in probs.iter().enumerate() {
            nucleus.push(indexed[i].0);
            cumulative += p;
            if cumulative >= top_p {
                break;
            }
        }
        let mut chosen = Vec::new();
        let mut pool = nucleus;
        while chosen.len() < k && !pool.is_empty() {
            let pick = self.rng.gen_range(0..pool.len());
            chosen.push(scored[pool.remove(pick)].0.clone());
        }
        chosen
    }
}

pub struct BeamSearchEngine<'a> {
    params: BeamParams,
    step_scorer: StepScorer,
    path_scorer: PathScorer,
    expander: StochasticExpander,
    store: &'a dyn GraphStore,
}

impl<'a> BeamSearchEngine<'a> {
    pub fn new(params: BeamParams, weights: ScoringWeights, seed: u64, store: &'a dyn GraphStore) -> Self {
        Self {
            params,
            step_scorer: StepScorer::new(weights),
            path_scorer: PathScorer::new(weights),
            expander: StochasticExpander::new(seed),
            store,
        }
    }

    /// Run beam search from `start_node`, returning completed paths sorted
    /// best-first. `query_fp` is the query's deterministic fingerprint;
    /// `intent` selects relation bias; `preferred` restricts expansion to a
    /// relation mask (empty mask = no restriction). `deadline` is a soft
    /// cutoff — in-flight expansion always finishes its current depth.
    pub fn search(
        &mut self,
        start_node: NodeId,
        start_prior: f64,
        query_fp: &[f32; FINGERPRINT_DIM],
        intent: Intent,
        preferred: RelMask,
        deadline: Option<Instant>,
    ) -> Vec<BeamPath> {
        let mut beam = vec![BeamPath::start(start_node, start_prior)];
        let mut completed = Vec::new();
        let mut signatures: HashSet<Vec<u8>> = HashSet::new();

        for _depth in 0..self.params.max_depth {
            if beam.is_empty() {
                break;
            }
            if let Some(dl) = deadline {
                if Instant::now() >= dl {
                    break;
                }
            }

            let mut next_beam = Vec::new();
            for path in &beam {
                let scored = self.score_outgoing_edges(path, query_fp, intent, preferred);
                if scored.is_empty() {
                    completed.push(self.finalize(path.clone(), start_prior));
                    continue;
                }
                let candidates = if self.params.enable_stochastic_expansion {
                    self.expander.select_top_p(&scored, self.params.top_p, self.params.top_k)
                } else {
                    self.expander.select_top_k(&scored, self.params.top_k)
                };
                let mut expanded_any = false;
                for edge in candidates {
                    if self.params.enable_loop_detection && path.visited_nodes.contains(&edge.dst) {
                        continue;
                    }
                    let step_score = scored
                        .iter()
                        .find(|(e, _)| e.id == edge.id)
                        .map(|(_, s)| *s)
                        .unwrap_or(0.0);
                    let candidate = path.extend(edge, step_score);
                    let sig = candidate.signature();
                    if !signatures.insert(sig) {
                        continue;
                    }
                    expanded_any = true;
                    next_beam.push(candidate);
                }
                if !expanded_any {
                    completed.push(self.finalize(path.clone(), start_prior));
                }
            }

            next_beam.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
            next_beam.truncate(self.params.beam_width);
            beam = next_beam;
        }

        for path in beam {
            completed.push(self.finalize(path, start_prior));
        }
        completed.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        completed
    }

    fn score_outgoing_edges(
        &self,
        path: &BeamPath,
        query_fp: &[f32; FINGERPRINT_DIM],
        intent: Intent,
        preferred: RelMask,
    ) -> Vec<(Edge, f64)> {
        let edges = self
            .store
            .edges_from(path.current_node(), preferred)
            .unwrap_or_default();
        edges
            .into_iter()
            .filter(|e| !path.visited_edges.contains(&e.id))
            .map(|e| {
                let dst_text = self
                    .store
                    .get_node(e.dst)
                    .ok()
                    .flatten()
                    .map(|n| n.text_payload())
                    .unwrap_or_default();
                let dst_fp = scorer::fingerprint(&dst_text);
                let score = self.step_scorer.score_step(&e, intent, query_fp, &dst_fp);
                (e, score)
            })
            .collect()
    }

    fn finalize(&self, mut path: BeamPath, start_prior: f64) -> BeamPath {
        let step_scores: Vec<f64> = path.edges.iter().map(|_| 0.0).collect();
        let total = self.path_scorer.score_path(start_prior, &step_scores, &path.edges);
        path.score = path.score.max(total);
        path.confidence = self.path_scorer.compute_confidence(path.score);
        path.is_complete = true;
        path
    }

    pub fn should_stop(&self, beam: &[BeamPath], best_score: f64) -> bool {
        beam.iter()
            .all(|p| (best_score - p.score).abs() < self.params.stop_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeType, Relation};
    use crate::store::MemoryStore;

    fn build_chain_store() -> (MemoryStore, NodeId, NodeId) {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "cats");
        let b = Node::text(NodeType::Concept, "mammals");
        let c = Node::text(NodeType::Concept, "animals");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        store.put_node(c.clone()).unwrap();
        store.put_edge(Edge::new(a.id, Relation::Isa, b.id, 0, 0.8, 0.5)).unwrap();
        store.put_edge(Edge::new(b.id, Relation::Isa, c.id, 0, 0.8, 0.5)).unwrap();
        (store, a.id, c.id)
    }

    #[test]
    fn finds_a_two_hop_path() {
        let (store, start, target) = build_chain_store();
        let fp = scorer::fingerprint("animals");
        let mut engine = BeamSearchEngine::new(
            BeamParams::default(),
            ScoringWeights::default(),
            42,
            &store,
        );
        let results = engine.search(start, 1.0, &fp, Intent::Define, RelMask::none(), None);
        assert!(results.iter().any(|p| p.nodes.contains(&target)));
    }

    #[test]
    fn loop_detection_prevents_revisiting_start() {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "a");
        let b = Node::text(NodeType::Symbol, "b");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        store.put_edge(Edge::new(a.id, Relation::Temporal, b.id, 0, 0.5, 0.5)).unwrap();
        store.put_edge(Edge::new(b.id, Relation::Temporal, a.id, 0, 0.5, 0.5)).unwrap();
        let fp = scorer::fingerprint("a");
        let mut engine = BeamSearchEngine::new(
            BeamParams { max_depth: 10, ..Default::default() },
            ScoringWeights::default(),
            7,
            &store,
        );
        let results = engine.search(a.id, 1.0, &fp, Intent::Other, RelMask::none(), None);
        assert!(results.iter().all(|p| !p.has_loop()));
    }

    #[test]
    fn same_seed_produces_same_path_set() {
        let (store, start, _) = build_chain_store();
        let fp = scorer::fingerprint("animals");
        let mut e1 = BeamSearchEngine::new(BeamParams::default(), ScoringWeights::default(), 99, &store);
        let mut e2 = BeamSearchEngine::new(BeamParams::default(), ScoringWeights::default(), 99, &store);
        let r1 = e1.search(start, 1.0, &fp, Intent::Define, RelMask::none(), None);
        let r2 = e2.search(start, 1.0, &fp, Intent::Define, RelMask::none(), None);
        let sig = |v: &[BeamPath]| v.iter().map(|p| p.edges.len()).collect::<Vec<_>>();
        assert_eq!(sig(&r1), sig(&r2));
    }
}
