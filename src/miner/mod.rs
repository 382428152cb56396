//! Background graph mining: pattern/n-gram generalization, PMI-driven LEAP
//! edges, and lead/lag causal annotation.
//!
//! A `PatternMiner`, a PMI-table-backed `PmiMiner`, and a `CausalMiner`,
//! orchestrated by [`GraphMiner::run_mining_pass`], which the engine calls
//! periodically rather than on every observation.

use std::collections::HashMap;

use crate::graph::{Edge, EdgeFlags, Node, NodeFlags, NodeType, Relation};
use crate::ids::NodeId;
use crate::store::GraphStore;

#[derive(Debug, Clone, Copy)]
pub struct MiningConfig {
    pub theta_node: f64,
    pub theta_pmi: f64,
    pub theta_pat: f64,
    pub theta_div: f64,
    pub max_pattern_length: usize,
    pub min_pattern_length: usize,
    pub window_size: usize,
    pub decay_factor: f64,
    pub min_generalization_confidence: f64,
    pub max_generalizations_per_batch: usize,
    pub min_cooccurrence_count: u32,
    pub max_temporal_distance: f64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            theta_node: 0.15,
            theta_pmi: 1.0,
            theta_pat: 8.0,
            theta_div: 0.4,
            max_pattern_length: 4,
            min_pattern_length: 2,
            window_size: 100,
            decay_factor: 0.99,
            min_generalization_confidence: 0.7,
            max_generalizations_per_batch: 10,
            min_cooccurrence_count: 3,
            max_temporal_distance: 5.0,
        }
    }
}

/// A recurring sub-sequence of nodes, tracked across observed sequences.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub sequence: Vec<NodeId>,
    pub frequency: u32,
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct NGramStats {
    sequence: Vec<NodeId>,
    count: u32,
    unique_contexts: std::collections::HashSet<String>,
    diversity_score: f64,
}

/// Mines recurring n-grams (length 2..=`max_pattern_length`) out of observed
/// node sequences, flagging those frequent and diverse enough to generalize.
pub struct PatternMiner {
    config: MiningConfig,
    ngram_stats: HashMap<String, NGramStats>,
    sequences: Vec<Vec<NodeId>>,
}

impl PatternMiner {
    pub fn new(config: MiningConfig) -> Self {
        Self { config, ngram_stats: HashMap::new(), sequences: Vec::new() }
    }

    fn key_for(seq: &[NodeId]) -> String {
        seq.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(">")
    }

    pub fn mine_sequence(&mut self, sequence: &[NodeId], context_tag: &str) {
        self.sequences.push(sequence.to_vec());
        if self.sequences.len() > self.config.window_size {
            self.sequences.remove(0);
        }
        for n in self.config.min_pattern_length..=self.config.max_pattern_length {
            if n > sequence.len() {
                continue;
            }
            for window in sequence.windows(n) {
                let key = Self::key_for(window);
                let stats = self.ngram_stats.entry(key).or_default();
                if stats.sequence.is_empty() {
                    stats.sequence = window.to_vec();
                }
                stats.count += 1;
                stats.unique_contexts.insert(context_tag.to_string());
                stats.diversity_score = stats.unique_contexts.len() as f64 / stats.count as f64;
            }
        }
    }

    /// Patterns whose frequency clears `theta_pat` and diversity clears
    /// `theta_div` — generalization candidates.
    pub fn generalization_candidates(&self) -> Vec<Pattern> {
        self.ngram_stats
            .iter()
            .filter(|(_, s)| s.count as f64 >= self.config.theta_pat && s.diversity_score >= self.config.theta_div)
            .map(|(_, s)| Pattern {
                sequence: s.sequence.clone(),
                frequency: s.count,
                contexts: s.unique_contexts.iter().cloned().collect(),
            })
            .collect()
    }
}

/// Creates generalization nodes/edges from patterns discovered by
/// [`PatternMiner`], limited to `max_generalizations_per_batch` per call.
pub struct GeneralizationCreator {
    config: MiningConfig,
}

impl GeneralizationCreator {
    pub fn new(config: MiningConfig) -> Self {
        Self { config }
    }

    /// Create (or upsert) a generalization node standing for `constituents`,
    /// and link each constituent to it with a `Generalization` edge. The
    /// node type scales with pattern length: short patterns are phrases,
    /// mid-length ones are concepts, longer ones are full abstractions.
    pub fn create_generalization(
        &self,
        constituents: &[NodeId],
        label: &str,
        store: &dyn GraphStore,
    ) -> Option<NodeId> {
        if constituents.is_empty() {
            return None;
        }
        let node_type = match constituents.len() {
            0..=2 => NodeType::Phrase,
            3..=4 => NodeType::Concept,
            _ => NodeType::Abstraction,
        };
        let gen_node = Node::new(node_type, NodeFlags::GENERALIZED, label.as_bytes().to_vec());
        let gen_id = store.put_node(gen_node).ok()?;
        for &member in constituents {
            let edge = Edge::new(member, Relation::Generalization, gen_id, 2, 0.8, 0.0)
                .with_flags(EdgeFlags::GENERALIZED);
            let _ = store.put_edge(edge);
        }
        Some(gen_id)
    }

    pub fn batch_limit(&self) -> usize {
        self.config.max_generalizations_per_batch
    }
}

/// Pointwise Mutual Information table for LEAP edge candidacy.
#[derive(Default)]
pub struct PmiMiner {
    config_theta_pmi: f64,
    config_min_count: u32,
    node_counts: HashMap<NodeId, u32>,
    pair_counts: HashMap<(NodeId, NodeId), u32>,
    total_observations: u32,
}

impl PmiMiner {
    pub fn new(config: &MiningConfig) -> Self {
        Self {
            config_theta_pmi: config.theta_pmi,
            config_min_count: config.min_cooccurrence_count,
            ..Default::default()
        }
    }

    fn ordered_pair(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        if a.as_bytes() <= b.as_bytes() {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Record node/pair occurrences from one observed sequence. Only pairs
    /// separated by more than `max_temporal_distance` positions count toward
    /// co-occurrence — LEAP edges bridge distant associations; adjacent
    /// pairs are already covered by `Temporal` edges.
    pub fn observe_sequence(&mut self, sequence: &[NodeId], max_temporal_distance: f64) {
        self.total_observations += 1;
        for &n in sequence {
            *self.node_counts.entry(n).or_insert(0) += 1;
        }
        for i in 0..sequence.len() {
            for j in (i + 1)..sequence.len() {
                if (j - i) as f64 <= max_temporal_distance {
                    continue;
                }
                let pair = Self::ordered_pair(sequence[i], sequence[j]);
                *self.pair_counts.entry(pair).or_insert(0) += 1;
            }
        }
    }

    fn probability(&self, node: NodeId) -> f64 {
        *self.node_counts.get(&node).unwrap_or(&0) as f64 / self.total_observations.max(1) as f64
    }

    pub fn compute_pmi(&self, a: NodeId, b: NodeId) -> f64 {
        let pair = Self::ordered_pair(a, b);
        let joint = *self.pair_counts.get(&pair).unwrap_or(&0) as f64 / self.total_observations.max(1) as f64;
        if joint <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let pa = self.probability(a);
        let pb = self.probability(b);
        if pa <= 0.0 || pb <= 0.0 {
            return f64::NEG_INFINITY;
        }
        (joint / (pa * pb)).ln()
    }

    pub fn leap_candidates(&self) -> Vec<(NodeId, NodeId, f64)> {
        self.pair_counts
            .iter()
            .filter(|(_, &count)| count >= self.config_min_count)
            .filter_map(|(&(a, b), _)| {
                let pmi = self.compute_pmi(a, b);
                (pmi >= self.config_theta_pmi).then_some((a, b, pmi))
            })
            .collect()
    }

    pub fn create_leap_edges(&self, candidates: &[(NodeId, NodeId, f64)], store: &dyn GraphStore) -> usize {
        let mut created = 0;
        for &(a, b, pmi) in candidates {
            let weight = ((pmi + 2.0) / 4.0).clamp(0.0, 1.0) as f32;
            let edge = Edge::new(a, Relation::Leap, b, 1, weight, weight).with_flags(EdgeFlags::INFERRED);
            if store.put_edge(edge).is_ok() {
                created += 1;
            }
        }
        created
    }
}

/// Lower/upper bounds of the non-spurious lead-ratio band: below
/// `CAUSAL_STRENGTH_MIN` the lead isn't consistent enough, above
/// `CAUSAL_STRENGTH_MAX` (a near-perfect lead) it's more likely a
/// coincidence of limited data than a real causal relationship.
const CAUSAL_STRENGTH_MIN: f64 = 0.6;
const CAUSAL_STRENGTH_MAX: f64 = 0.9;

/// Tracks which of a pair of nodes tends to precede the other, annotating
/// the connecting edge with a causal flag plus numeric strength once the
/// lead/lag imbalance clears a non-spurious band.
#[derive(Default)]
pub struct CausalMiner {
    lead_lag_counts: HashMap<(NodeId, NodeId), (u32, u32)>,
}

impl CausalMiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_sequence(&mut self, sequence: &[NodeId], max_temporal_distance: f64) {
        for i in 0..sequence.len() {
            for j in (i + 1)..sequence.len() {
                if (j - i) as f64 > max_temporal_distance {
                    break;
                }
                let entry = self.lead_lag_counts.entry((sequence[i], sequence[j])).or_insert((0, 0));
                entry.0 += 1; // sequence[i] leads sequence[j]
                let reverse = self.lead_lag_counts.entry((sequence[j], sequence[i])).or_insert((0, 0));
                reverse.1 += 1; // sequence[j] lags sequence[i]
            }
        }
    }

    fn causal_strength(lead: u32, lag: u32) -> f64 {
        let total = lead + lag;
        if total == 0 {
            return 0.0;
        }
        lead as f64 / total as f64
    }

    /// Annotate `edge` with `Causes`/`CAUSAL` when its src->dst lead ratio
    /// lands in the non-spurious band `[CAUSAL_STRENGTH_MIN,
    /// CAUSAL_STRENGTH_MAX]`. A ratio of 1.0 (no counter-examples at all)
    /// is suspected spurious (e.g. the pair only ever co-occurred once) and
    /// is rejected rather than flagged.
    pub fn annotate_edge(&self, edge: &mut Edge) {
        if let Some(&(lead, lag)) = self.lead_lag_counts.get(&(edge.src, edge.dst)) {
            let strength = Self::causal_strength(lead, lag);
            if (CAUSAL_STRENGTH_MIN..=CAUSAL_STRENGTH_MAX).contains(&strength) {
                edge.flags |= EdgeFlags::CAUSAL;
                edge.causal_strength = Some(strength as f32);
            }
        }
    }
}

/// Coordinates one mining pass over a store: pattern mining, generalization
/// creation, PMI LEAP edges, and causal annotation. The engine calls this
/// periodically, never per-observation.
pub struct GraphMiner {
    config: MiningConfig,
    pub pattern_miner: PatternMiner,
    pub generalizer: GeneralizationCreator,
    pub pmi_miner: PmiMiner,
    pub causal_miner: CausalMiner,
}

impl GraphMiner {
    pub fn new(config: MiningConfig) -> Self {
        Self {
            pattern_miner: PatternMiner::new(config),
            generalizer: GeneralizationCreator::new(config),
            pmi_miner: PmiMiner::new(&config),
            causal_miner: CausalMiner::new(),
            config,
        }
    }

    pub fn observe_sequence(&mut self, sequence: &[NodeId], context_tag: &str) {
        self.pattern_miner.mine_sequence(sequence, context_tag);
        self.pmi_miner.observe_sequence(sequence, self.config.max_temporal_distance);
        self.causal_miner.observe_sequence(sequence, self.config.max_temporal_distance);
    }

    /// Run one mining pass: promote up to `max_generalizations_per_batch`
    /// pattern candidates into generalization nodes/edges, create LEAP
    /// edges for PMI-qualified pairs, and annotate existing edges with
    /// causal strength. Returns the number of LEAP edges created.
    pub fn run_mining_pass(&self, store: &dyn GraphStore) -> usize {
        for pattern in self
            .pattern_miner
            .generalization_candidates()
            .into_iter()
            .take(self.generalizer.batch_limit())
        {
            let label = pattern
                .sequence
                .iter()
                .filter_map(|id| store.get_node(*id).ok().flatten())
                .map(|n| n.text_payload())
                .collect::<Vec<_>>()
                .join(" ");
            self.generalizer.create_generalization(&pattern.sequence, &label, store);
        }

        let candidates = self.pmi_miner.leap_candidates();
        let created = self.pmi_miner.create_leap_edges(&candidates, store);
        let nodes = store.list_nodes(&Default::default()).unwrap_or_default();
        for node in nodes {
            let edges = store.edges_from(node.id, crate::graph::RelMask::none()).unwrap_or_default();
            for mut edge in edges {
                self.causal_miner.annotate_edge(&mut edge);
                if edge.flags.contains(EdgeFlags::CAUSAL) {
                    let _ = store.replace_edge(edge);
                }
            }
        }
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;

    #[test]
    fn pmi_is_high_for_always_cooccurring_pair() {
        let mut miner = PmiMiner::new(&MiningConfig::default());
        let a = Node::text(NodeType::Symbol, "a").id;
        let b = Node::text(NodeType::Symbol, "b").id;
        let c = Node::text(NodeType::Symbol, "c").id;
        // gap of 1 between the two positions in each pair; a distance gate
        // of 0.0 still counts them as distant enough to co-occur.
        for _ in 0..5 {
            miner.observe_sequence(&[a, b], 0.0);
        }
        miner.observe_sequence(&[a, c], 0.0);
        let pmi_ab = miner.compute_pmi(a, b);
        let pmi_ac = miner.compute_pmi(a, c);
        assert!(pmi_ab > pmi_ac);
    }

    #[test]
    fn causal_miner_flags_lead_within_the_non_spurious_band() {
        let mut miner = CausalMiner::new();
        let a = Node::text(NodeType::Symbol, "rain").id;
        let b = Node::text(NodeType::Symbol, "wet_ground").id;
        for _ in 0..7 {
            miner.observe_sequence(&[a, b], 5.0);
        }
        for _ in 0..3 {
            miner.observe_sequence(&[b, a], 5.0);
        }
        let mut edge = Edge::new(a, Relation::Temporal, b, 0, 0.5, 0.5);
        miner.annotate_edge(&mut edge);
        assert!(edge.flags.contains(EdgeFlags::CAUSAL));
        assert!((edge.causal_strength.unwrap() as f64 - 0.7).abs() < 1e-6);
    }

    #[test]
    fn causal_miner_rejects_a_perfect_lead_as_suspected_spurious() {
        let mut miner = CausalMiner::new();
        let a = Node::text(NodeType::Symbol, "x").id;
        let b = Node::text(NodeType::Symbol, "y").id;
        for _ in 0..10 {
            miner.observe_sequence(&[a, b], 5.0);
        }
        let mut edge = Edge::new(a, Relation::Temporal, b, 0, 0.5, 0.5);
        miner.annotate_edge(&mut edge);
        assert!(!edge.flags.contains(EdgeFlags::CAUSAL));
    }

    #[test]
    fn pattern_miner_tracks_frequency_and_diversity() {
        let mut miner = PatternMiner::new(MiningConfig { theta_pat: 2.0, theta_div: 0.1, ..Default::default() });
        let a = Node::text(NodeType::Symbol, "a").id;
        let b = Node::text(NodeType::Symbol, "b").id;
        miner.mine_sequence(&[a, b], "ctx1");
        miner.mine_sequence(&[a, b], "ctx2");
        let candidates = miner.generalization_candidates();
        assert!(!candidates.is_empty());
    }
}
