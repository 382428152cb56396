//! Natural-language rendering of a reasoning path into one sentence.
//!
//! The connector table maps each `Relation` variant to the phrase that
//! narrates it. Falls back to a template with a confidence hedge when the
//! path is empty or low-confidence.

use crate::graph::{Edge, Relation};
use crate::policy::Intent;
use crate::store::GraphStore;

/// Node text payloads that stand for placeholder tokens rather than real
/// content; a hop landing on one of these is skipped in the rendered
/// sentence instead of narrated.
const RESERVED_TOKENS: &[&str] = &["<UNK>", "<PAD>", "<BOS>", "<EOS>"];

fn connector(rel: Relation) -> &'static str {
    match rel {
        Relation::Exact => "is",
        Relation::Temporal => "",
        Relation::Leap => "might relate to",
        Relation::Generalization => "is a type of",
        Relation::Isa => "is a kind of",
        Relation::HasProperty => "has the property of being",
        Relation::PartOf => "is part of",
        Relation::Causes => "causes",
    }
}

fn hedge(confidence: f64) -> &'static str {
    if confidence >= 0.8 {
        ""
    } else if confidence >= 0.5 {
        "It seems that "
    } else {
        "It's uncertain, but perhaps "
    }
}

/// Render a start node plus an ordered edge chain into one sentence.
pub fn render_path(start_label: &str, edges: &[Edge], confidence: f64, store: &dyn GraphStore) -> String {
    if edges.is_empty() {
        return format!("{}I don't have enough information about {}.", hedge(confidence), start_label);
    }
    let mut sentence = format!("{}{}", hedge(confidence), start_label);
    for edge in edges {
        let dst_label = store
            .get_node(edge.dst)
            .ok()
            .flatten()
            .map(|n| n.text_payload())
            .unwrap_or_else(|| "something".to_string());
        if RESERVED_TOKENS.contains(&dst_label.as_str()) {
            continue;
        }
        let phrase = connector(edge.rel);
        if !phrase.is_empty() {
            sentence.push(' ');
            sentence.push_str(phrase);
        }
        sentence.push(' ');
        sentence.push_str(&dst_label);
    }
    sentence.push('.');
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => sentence,
    }
}

/// Template fallback for when no path at all was found, worded to match
/// what the query was asking for.
pub fn template_fallback(intent: Intent, query_text: &str) -> String {
    match intent {
        Intent::Define => format!("I don't have a definition for \"{}\".", query_text),
        Intent::Why | Intent::Causal => format!("I don't know why \"{}\" happens.", query_text),
        Intent::Compare => format!("I can't compare the things in \"{}\" yet.", query_text),
        Intent::Temporal => format!("I don't know what follows \"{}\".", query_text),
        Intent::Other => format!("I couldn't find a confident answer for \"{}\".", query_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeType};
    use crate::store::MemoryStore;

    #[test]
    fn renders_single_hop_with_full_confidence_no_hedge() {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "cats");
        let b = Node::text(NodeType::Concept, "mammals");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        let edge = Edge::new(a.id, Relation::Isa, b.id, 0, 0.9, 0.9);
        let sentence = render_path("Cats", &[edge], 0.95, &store);
        assert_eq!(sentence, "Cats is a kind of mammals.");
    }

    #[test]
    fn low_confidence_path_gets_hedged() {
        let store = MemoryStore::new();
        let a = Node::text(NodeType::Symbol, "cats");
        let b = Node::text(NodeType::Concept, "mammals");
        store.put_node(a.clone()).unwrap();
        store.put_node(b.clone()).unwrap();
        let edge = Edge::new(a.id, Relation::Isa, b.id, 0, 0.2, 0.2);
        let sentence = render_path("Cats", &[edge], 0.3, &store);
        assert!(sentence.starts_with("It's uncertain"));
    }

    #[test]
    fn empty_path_uses_template_fallback() {
        let store = MemoryStore::new();
        let sentence = render_path("Cats", &[], 0.9, &store);
        assert!(sentence.contains("don't have enough information"));
    }

    #[test]
    fn template_fallback_matches_intent() {
        let sentence = template_fallback(Intent::Define, "what is gravity");
        assert!(sentence.contains("definition"));
        let sentence = template_fallback(Intent::Why, "why does it rain");
        assert!(sentence.contains("why"));
    }
}
