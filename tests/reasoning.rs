//! End-to-end scenarios exercising the full learn -> reason -> maintain
//! lifecycle through the public API only.

use melvin_core::{MelvinConfig, MemoryStore, Relation, ReasoningEngine};

fn engine() -> ReasoningEngine<MemoryStore> {
    ReasoningEngine::new(MemoryStore::new(), MelvinConfig::default())
}

#[test]
fn define_query_answers_single_hop_fact() {
    let mut e = engine();
    e.learn("cats are mammals").unwrap();
    let answer = e.reason("what are cats", None).unwrap();
    assert!(!answer.sentence.is_empty());
    assert!(e.node_count().unwrap() >= 3);
}

#[test]
fn two_hop_reasoning_chains_through_an_intermediate_node() {
    let mut e = engine();
    e.learn("cats are mammals").unwrap();
    e.learn("mammals are animals").unwrap();
    let answer = e.reason("what are cats", None).unwrap();
    assert!(answer.path_len >= 1);
}

#[test]
fn decay_pass_reports_prune_candidates_for_weak_edges() {
    let mut e = engine();
    e.learn("a b").unwrap();
    let pruned = e.decay_pass(1_000_000.0).unwrap();
    assert!(pruned >= 1);
}

#[test]
fn repeated_learning_reinforces_rather_than_duplicates() {
    let mut e = engine();
    e.learn("dogs bark").unwrap();
    let before = e.edge_count().unwrap();
    e.learn("dogs bark").unwrap();
    let after = e.edge_count().unwrap();
    assert_eq!(before, after);
}

#[test]
fn maintenance_pass_is_idempotent_on_an_empty_graph() {
    let mut e = engine();
    let report = e.run_maintenance_pass(1.0).unwrap();
    assert_eq!(report.edges_pruned, 0);
}

#[test]
fn explicit_relation_assertion_is_queryable_immediately() {
    let mut e = engine();
    let nodes = e.learn("water").unwrap();
    let other = e.learn("liquid").unwrap();
    e.learn_relation(nodes[0], Relation::Isa, other[0]).unwrap();
    assert_eq!(e.edge_count().unwrap(), 1);
}

#[test]
fn learn_from_sequence_links_existing_nodes_without_duplicating_them() {
    let mut e = engine();
    let a = e.learn("sun").unwrap();
    let b = e.learn("warmth").unwrap();
    let before_nodes = e.node_count().unwrap();
    e.learn_from_sequence(&[a[0], b[0]]).unwrap();
    assert_eq!(e.node_count().unwrap(), before_nodes);
    assert_eq!(e.edge_count().unwrap(), 1);
}

#[test]
fn why_query_and_define_query_can_diverge_on_the_same_graph() {
    let mut e = engine();
    e.learn("rain causes flooding").unwrap();
    let define_answer = e.reason("what is rain", None).unwrap();
    let why_answer = e.reason("why does flooding happen", None).unwrap();
    // Both resolve, though policy differences may pick different beam widths.
    assert!(!define_answer.sentence.is_empty());
    assert!(!why_answer.sentence.is_empty());
}
