//! Scoring: node priors, per-step edge scores, and whole-path scores.
//!
//! Defaults are fixed, hand-tuned constants rather than a trained model's
//! output. No learned embeddings are involved anywhere in this
//! module — "semantic similarity" is cosine similarity over deterministic
//! hash-derived fingerprints (see [`fingerprint`]), never a trained model.

use crate::graph::{Edge, Relation};
use crate::ids::NodeId;
use crate::policy::Intent;
use crate::store::GraphStore;

/// Dimensionality of the deterministic sign-vector fingerprint.
pub const FINGERPRINT_DIM: usize = 64;

/// A deterministic, hash-derived embedding substitute. Each token's BLAKE3
/// digest is expanded into `FINGERPRINT_DIM` signed lanes; a text's
/// fingerprint is the elementwise sum of its token fingerprints, sign-
/// normalized. Identical text always yields an identical fingerprint, and
/// two fingerprints are never compared across runs with different RNG seeds
/// since none is used here.
pub fn fingerprint(text: &str) -> [f32; FINGERPRINT_DIM] {
    let mut acc = [0f32; FINGERPRINT_DIM];
    for token in text.split_whitespace() {
        let hash = blake3::hash(token.as_bytes());
        let bytes = hash.as_bytes();
        for (i, lane) in acc.iter_mut().enumerate() {
            let byte = bytes[i % bytes.len()];
            *lane += if byte & 1 == 0 { 1.0 } else { -1.0 };
        }
    }
    let norm: f32 = acc.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in acc.iter_mut() {
            *v /= norm;
        }
    }
    acc
}

pub fn cosine_similarity(a: &[f32; FINGERPRINT_DIM], b: &[f32; FINGERPRINT_DIM]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot.clamp(-1.0, 1.0)
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub fn softmax(xs: &[f64]) -> Vec<f64> {
    if xs.is_empty() {
        return Vec::new();
    }
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = xs.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum <= 0.0 {
        vec![1.0 / xs.len() as f64; xs.len()]
    } else {
        exps.into_iter().map(|e| e / sum).collect()
    }
}

/// Per-relation bias multipliers for one query intent.
#[derive(Debug, Clone, Copy)]
pub struct RelBias {
    pub exact: f64,
    pub temporal: f64,
    pub leap: f64,
    pub generalize: f64,
}

impl RelBias {
    fn bias_for(&self, rel: Relation) -> f64 {
        match rel {
            Relation::Exact => self.exact,
            Relation::Temporal => self.temporal,
            Relation::Leap => self.leap,
            Relation::Generalization => self.generalize,
            // Relations outside the original four default to 1.0 (no bias).
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub beta_text: f64,
    pub beta_freq: f64,
    pub beta_anchor: f64,
    pub gamma_rel: f64,
    pub gamma_sem: f64,
    pub gamma_ctx: f64,
    pub gamma_core: f64,
    pub gamma_len: f64,
    pub delta_start: f64,
    pub delta_support: f64,
    pub delta_redund: f64,
    pub define_query: RelBias,
    pub why_query: RelBias,
    pub compare_query: RelBias,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            beta_text: 1.0,
            beta_freq: 0.3,
            beta_anchor: 2.0,
            gamma_rel: 1.0,
            gamma_sem: 1.5,
            gamma_ctx: 0.8,
            gamma_core: 1.2,
            gamma_len: 0.1,
            delta_start: 1.0,
            delta_support: 0.5,
            delta_redund: 0.3,
            define_query: RelBias { exact: 1.0, temporal: 0.6, leap: 0.2, generalize: 1.0 },
            why_query: RelBias { exact: 0.3, temporal: 1.0, leap: 0.6, generalize: 0.3 },
            compare_query: RelBias { exact: 0.8, temporal: 0.4, leap: 0.8, generalize: 1.2 },
        }
    }
}

impl ScoringWeights {
    fn rel_bias_for_intent(&self, intent: Intent) -> &RelBias {
        match intent {
            Intent::Define => &self.define_query,
            // Causal and temporal queries favor the same edges ("why") did
            // in the original three-bucket table, since the original never
            // defined a fourth/fifth RelBias row for them.
            Intent::Why | Intent::Causal | Intent::Temporal => &self.why_query,
            Intent::Compare => &self.compare_query,
            Intent::Other => &self.define_query,
        }
    }
}

/// Scores candidate start nodes against a query.
pub struct NodePriorScorer {
    weights: ScoringWeights,
}

impl NodePriorScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn compute_prior(
        &self,
        node_id: NodeId,
        query_fp: &[f32; FINGERPRINT_DIM],
        store: &dyn GraphStore,
    ) -> f64 {
        let Some(node) = store.get_node(node_id).ok().flatten() else {
            return 0.0;
        };
        let text_sim = cosine_similarity(query_fp, &fingerprint(&node.text_payload())) as f64;
        let freq = (node.confirm_count as f64).ln_1p();
        let anchor = if node.is_anchor() { 1.0 } else { 0.0 };
        let raw = self.weights.beta_text * text_sim
            + self.weights.beta_freq * freq
            + self.weights.beta_anchor * anchor;
        sigmoid(raw)
    }
}

/// Scores one edge traversal in the context of a query's intent.
pub struct StepScorer {
    weights: ScoringWeights,
}

impl StepScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score_step(&self, edge: &Edge, intent: Intent, query_fp: &[f32; FINGERPRINT_DIM], dst_fp: &[f32; FINGERPRINT_DIM]) -> f64 {
        let rel_bias = self.weights.rel_bias_for_intent(intent).bias_for(edge.rel);
        let sem_sim = cosine_similarity(query_fp, dst_fp) as f64;
        let len_penalty = 1.0;
        self.weights.gamma_rel * rel_bias
            + self.weights.gamma_sem * sem_sim
            + self.weights.gamma_ctx * edge.w_ctx as f64
            + self.weights.gamma_core * edge.w_core as f64
            - self.weights.gamma_len * len_penalty
    }
}

/// Scores a completed path: start prior + accumulated step scores + support
/// evidence, minus a redundancy penalty for revisited relations.
pub struct PathScorer {
    weights: ScoringWeights,
}

impl PathScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score_path(&self, start_prior: f64, step_scores: &[f64], edges: &[Edge]) -> f64 {
        let step_sum: f64 = step_scores.iter().sum();
        let support = self.compute_support_evidence(edges);
        let redundancy = self.compute_redundancy_penalty(edges);
        self.weights.delta_start * start_prior + step_sum + self.weights.delta_support * support
            - self.weights.delta_redund * redundancy
    }

    /// Fraction of edges in the path with `count > 1` (reinforced more than once).
    fn compute_support_evidence(&self, edges: &[Edge]) -> f64 {
        if edges.is_empty() {
            return 0.0;
        }
        let reinforced = edges.iter().filter(|e| e.count > 1).count();
        reinforced as f64 / edges.len() as f64
    }

    /// Fraction of relation-type repeats among consecutive edges.
    fn compute_redundancy_penalty(&self, edges: &[Edge]) -> f64 {
        if edges.len() < 2 {
            return 0.0;
        }
        let repeats = edges.windows(2).filter(|w| w[0].rel == w[1].rel).count();
        repeats as f64 / (edges.len() - 1) as f64
    }

    pub fn compute_confidence(&self, path_score: f64) -> f64 {
        sigmoid(path_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_cosine_similarity_one() {
        let a = fingerprint("cats are mammals");
        let b = fingerprint("cats are mammals");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn different_text_has_lower_similarity() {
        let a = fingerprint("cats are mammals");
        let b = fingerprint("rockets launch vertically");
        assert!(cosine_similarity(&a, &b) < 0.9);
    }

    #[test]
    fn sigmoid_is_monotonic_and_bounded() {
        assert!(sigmoid(-100.0) < 0.01);
        assert!(sigmoid(100.0) > 0.99);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn why_query_prefers_temporal_over_exact() {
        let weights = ScoringWeights::default();
        let bias = weights.rel_bias_for_intent(Intent::Why);
        assert!(bias.temporal > bias.exact);
    }
}
