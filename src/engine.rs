//! Top-level reasoning engine: the programmatic surface wiring storage,
//! scoring, beam search, learning, mining, policy, and NLG together.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::MelvinConfig;
use crate::error::{MelvinError, MelvinResult};
use crate::graph::{now_ns, Node, NodeFlags, NodeType, Relation, RelMask};
use crate::ids::NodeId;
use crate::learner::EdgeLearner;
use crate::miner::GraphMiner;
use crate::nlg;
use crate::policy::PolicyRouter;
use crate::scorer::{self, NodePriorScorer};
use crate::store::{GraphStore, NodeFilter};

pub struct ReasonResult {
    pub sentence: String,
    pub confidence: f64,
    pub path_len: usize,
}

/// Owns a store and the stateful subsystems (learner context window, miner
/// statistics) layered on top of it. Not `Clone`: state accumulates across
/// calls the way a long-lived `GraphMiner`/`EdgeLearner` pair is meant to.
pub struct ReasoningEngine<S: GraphStore> {
    store: S,
    config: MelvinConfig,
    learner: EdgeLearner,
    miner: GraphMiner,
    policy: PolicyRouter,
    external_scorer: Option<Box<dyn Fn(&str, &str) -> f64 + Send + Sync>>,
}

impl<S: GraphStore> ReasoningEngine<S> {
    pub fn new(store: S, config: MelvinConfig) -> Self {
        let learner = EdgeLearner::new(config.learning_params());
        let miner = GraphMiner::new(config.mining_config());
        Self { store, config, learner, miner, policy: PolicyRouter::new(), external_scorer: None }
    }

    /// Install an ex-post scorer: `(query, answer) -> score in [0, 1]`,
    /// called after `reason` renders an answer to reinforce the path it
    /// used beyond ordinary beam-search traversal. Absence (the default)
    /// means no extra reinforcement is applied.
    pub fn set_external_scorer(&mut self, scorer: impl Fn(&str, &str) -> f64 + Send + Sync + 'static) {
        self.external_scorer = Some(Box::new(scorer));
    }

    pub fn clear_external_scorer(&mut self) {
        self.external_scorer = None;
    }

    pub fn config(&self) -> &MelvinConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MelvinConfig) {
        self.learner = EdgeLearner::new(config.learning_params());
        self.miner = GraphMiner::new(config.mining_config());
        self.config = config;
    }

    pub fn node_count(&self) -> MelvinResult<usize> {
        Ok(self.store.node_count()?)
    }

    pub fn edge_count(&self) -> MelvinResult<usize> {
        Ok(self.store.edge_count()?)
    }

    pub fn path_count(&self) -> MelvinResult<usize> {
        Ok(self.store.path_count()?)
    }

    /// Teach the graph a sequence of text tokens: each token becomes (or
    /// reconfirms) a `Symbol` node, consecutive tokens get a `Temporal`
    /// edge, and the miner observes the resulting node sequence. This is
    /// the explicit-observation learning path; repeated calls with the
    /// same text reinforce the existing nodes and edges rather than
    /// duplicating them.
    pub fn learn(&mut self, text: &str) -> MelvinResult<Vec<NodeId>> {
        let tokens = crate::policy::tokenize_query(text);
        let mut node_ids = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let node = Node::text(NodeType::Symbol, token);
            let id = self.store.put_node(node)?;
            node_ids.push(id);
        }
        self.link_sequence(&node_ids)?;
        self.miner.observe_sequence(&node_ids, text);
        debug!(tokens = tokens.len(), "learned sequence");
        Ok(node_ids)
    }

    /// Learn from a sequence of already-known node IDs rather than raw text:
    /// links consecutive nodes with reinforced `Temporal` edges and feeds the
    /// miner, without creating or reconfirming any node. Used by callers that
    /// observe structured sequences (e.g. replayed traversal order) rather
    /// than natural-language text.
    pub fn learn_from_sequence(&mut self, node_ids: &[NodeId]) -> MelvinResult<()> {
        self.link_sequence(node_ids)?;
        self.miner.observe_sequence(node_ids, "");
        debug!(nodes = node_ids.len(), "learned sequence from node ids");
        Ok(())
    }

    fn link_sequence(&mut self, node_ids: &[NodeId]) -> MelvinResult<()> {
        for window in node_ids.windows(2) {
            let edge = crate::graph::Edge::new(window[0], Relation::Temporal, window[1], 0, 0.1, 0.1);
            let id = self.store.put_edge(edge)?;
            if let Some(mut e) = self.store.get_edge(id)? {
                self.learner.reinforce(&mut e, true);
                self.store.replace_edge(e)?;
            }
        }
        self.learner.update_context_window(node_ids.iter().copied());
        Ok(())
    }

    /// Explicitly assert a relation between two already-known nodes (used
    /// by callers that already have structured facts rather than raw text).
    pub fn learn_relation(&mut self, src: NodeId, rel: Relation, dst: NodeId) -> MelvinResult<()> {
        let edge = crate::graph::Edge::new(src, rel, dst, 0, 0.1, 0.1);
        let id = self.store.put_edge(edge)?;
        if let Some(mut e) = self.store.get_edge(id)? {
            self.learner.reinforce(&mut e, true);
            self.store.replace_edge(e)?;
        }
        Ok(())
    }

    /// Answer a query: classify intent, pick a start node, beam-search for
    /// the best path, then render it to a sentence.
    pub fn reason(&self, text: &str, timeout: Option<Duration>) -> MelvinResult<ReasonResult> {
        let classification = self.policy.classify(text);
        let bundle = self.policy.policy_for(&classification);
        let query_fp = scorer::fingerprint(text);

        let candidates = self.store.list_nodes(&NodeFilter::default())?;
        if candidates.is_empty() {
            return Ok(ReasonResult {
                sentence: nlg::template_fallback(classification.intent, text),
                confidence: 0.0,
                path_len: 0,
            });
        }

        let prior_scorer = NodePriorScorer::new(bundle.scoring_weights);
        let mut best_start = candidates[0].id;
        let mut best_prior = f64::NEG_INFINITY;
        for node in &candidates {
            let prior = prior_scorer.compute_prior(node.id, &query_fp, &self.store);
            if prior > best_prior {
                best_prior = prior;
                best_start = node.id;
            }
        }

        let mask = if bundle.preferred_relations.is_empty() {
            RelMask::none()
        } else {
            RelMask::of(&bundle.preferred_relations)
        };
        let deadline = timeout.map(|d| Instant::now() + d);
        let mut search_engine = crate::beam::BeamSearchEngine::new(
            bundle.beam_params,
            bundle.scoring_weights,
            self.config.rng_seed,
            &self.store,
        );
        let results = search_engine.search(best_start, best_prior, &query_fp, classification.intent, mask, deadline);

        let Some(best) = results.into_iter().next() else {
            return Ok(ReasonResult {
                sentence: nlg::template_fallback(classification.intent, text),
                confidence: 0.0,
                path_len: 0,
            });
        };

        let start_label = self
            .store
            .get_node(best_start)?
            .map(|n| n.text_payload())
            .unwrap_or_default();
        let sentence = nlg::render_path(&start_label, &best.edges, best.confidence, &self.store);
        info!(path_len = best.edges.len(), confidence = best.confidence, "answered query");
        if let Some(scorer) = &self.external_scorer {
            let score = scorer(text, &sentence);
            if score > 0.0 {
                for edge_id in &best.edges {
                    if let Some(mut e) = self.store.get_edge(edge_id.id)? {
                        self.learner.reinforce_scaled(&mut e, score);
                        self.store.replace_edge(e)?;
                    }
                }
            }
        }
        Ok(ReasonResult { sentence, confidence: best.confidence, path_len: best.edges.len() })
    }

    /// Decay every edge by wall-clock time elapsed since it was last
    /// touched and report which ones crossed the prune threshold, without
    /// removing them (callers that want removal call
    /// [`Self::run_maintenance_pass`]).
    pub fn decay_pass(&self, dt_secs: f64) -> MelvinResult<usize> {
        let candidates = self.learner.decay_all_edges(&self.store, dt_secs);
        Ok(candidates.len())
    }

    /// Full maintenance sweep: decay, prune edges below threshold, and run
    /// one mining pass (pattern generalization inputs are accumulated via
    /// `learn`; this call only triggers PMI/causal edge materialization).
    pub fn run_maintenance_pass(&mut self, dt_secs: f64) -> MelvinResult<MaintenanceReport> {
        let prune_candidates = self.learner.decay_all_edges(&self.store, dt_secs);
        for id in &prune_candidates {
            self.store.remove_edge(*id)?;
        }
        let leap_edges_created = self.miner.run_mining_pass(&self.store);
        self.store.flush()?;
        Ok(MaintenanceReport {
            edges_pruned: prune_candidates.len(),
            leap_edges_created,
        })
    }

    pub fn pin_node(&self, id: NodeId, expiry_ns: u64) -> MelvinResult<()> {
        let mut node = self
            .store
            .get_node(id)?
            .ok_or_else(|| MelvinError::InvalidQuery(format!("unknown node {id}")))?;
        node.flags |= NodeFlags::ANCHOR;
        node.pin_expiry = expiry_ns;
        self.store.put_node(node)?;
        Ok(())
    }

    pub fn now(&self) -> u64 {
        now_ns()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaintenanceReport {
    pub edges_pruned: usize,
    pub leap_edges_created: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn learn_then_reason_produces_a_sentence() {
        let mut engine = ReasoningEngine::new(MemoryStore::new(), MelvinConfig::default());
        engine.learn("cats are mammals").unwrap();
        let result = engine.reason("what are cats", None).unwrap();
        assert!(!result.sentence.is_empty());
    }

    #[test]
    fn reasoning_on_empty_graph_falls_back_to_template() {
        let engine = ReasoningEngine::new(MemoryStore::new(), MelvinConfig::default());
        let result = engine.reason("what is anything", None).unwrap();
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn external_scorer_absence_leaves_weights_untouched_by_ex_post_reinforcement() {
        let mut engine = ReasoningEngine::new(MemoryStore::new(), MelvinConfig::default());
        engine.learn("cats are mammals").unwrap();
        let before = engine.edge_count().unwrap();
        engine.reason("what are cats", None).unwrap();
        assert_eq!(engine.edge_count().unwrap(), before);
    }

    #[test]
    fn external_scorer_reinforces_the_answering_path() {
        let mut engine = ReasoningEngine::new(MemoryStore::new(), MelvinConfig::default());
        let ids = engine.learn("cats are mammals").unwrap();
        let edge_id = crate::ids::edge_id(ids[0], Relation::Temporal, ids[1], 0);
        let before_w = engine.store.get_edge(edge_id).unwrap().unwrap().w;
        engine.set_external_scorer(|_query, _answer| 1.0);
        let result = engine.reason("what are cats", None).unwrap();
        if result.path_len > 0 {
            let after_w = engine.store.get_edge(edge_id).unwrap().unwrap().w;
            assert!(after_w >= before_w);
        }
    }

    #[test]
    fn maintenance_pass_completes_and_reports_counts() {
        let mut engine = ReasoningEngine::new(MemoryStore::new(), MelvinConfig::default());
        engine.learn("a b").unwrap();
        let report = engine.run_maintenance_pass(100_000.0).unwrap();
        // A very large dt fully decays the freshly-learned edge below the
        // prune floor, since it only received one weak reinforcement.
        assert_eq!(report.edges_pruned, 1);
    }
}
