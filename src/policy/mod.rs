//! Policy router: classifies a query's intent and complexity, then hands
//! back a [`PolicyBundle`] of beam/scoring parameters tuned for it.
//!
//! Regex-shaped phrase patterns win first (high confidence), a keyword/
//! weight table is the fallback (lower confidence).

use crate::beam::BeamParams;
use crate::scorer::ScoringWeights;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Define,
    Why,
    Compare,
    Causal,
    Temporal,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone)]
pub struct QueryClassification {
    pub intent: Intent,
    pub confidence: f64,
    pub complexity: Complexity,
}

/// Tuned beam and scoring parameters for one intent.
#[derive(Debug, Clone)]
pub struct PolicyBundle {
    pub beam_params: BeamParams,
    pub scoring_weights: ScoringWeights,
    pub preferred_relations: Vec<crate::graph::Relation>,
}

/// Split text into alphanumeric (plus apostrophe) tokens, lowercased.
pub fn tokenize_query(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() || c == '\'' {
            current.push(c.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct KeywordEntry {
    word: &'static str,
    intent: Intent,
    weight: f64,
}

const KEYWORDS: &[KeywordEntry] = &[
    KeywordEntry { word: "what", intent: Intent::Define, weight: 1.0 },
    KeywordEntry { word: "define", intent: Intent::Define, weight: 1.5 },
    KeywordEntry { word: "meaning", intent: Intent::Define, weight: 1.3 },
    KeywordEntry { word: "is", intent: Intent::Define, weight: 0.8 },
    KeywordEntry { word: "are", intent: Intent::Define, weight: 0.8 },
    KeywordEntry { word: "why", intent: Intent::Why, weight: 1.5 },
    KeywordEntry { word: "how", intent: Intent::Why, weight: 1.3 },
    KeywordEntry { word: "explain", intent: Intent::Why, weight: 1.2 },
    KeywordEntry { word: "reason", intent: Intent::Why, weight: 1.0 },
    KeywordEntry { word: "compare", intent: Intent::Compare, weight: 1.5 },
    KeywordEntry { word: "which", intent: Intent::Compare, weight: 1.2 },
    KeywordEntry { word: "better", intent: Intent::Compare, weight: 1.0 },
    KeywordEntry { word: "difference", intent: Intent::Compare, weight: 1.3 },
    KeywordEntry { word: "versus", intent: Intent::Compare, weight: 1.1 },
    KeywordEntry { word: "cause", intent: Intent::Causal, weight: 1.4 },
    KeywordEntry { word: "causes", intent: Intent::Causal, weight: 1.4 },
    KeywordEntry { word: "leads", intent: Intent::Causal, weight: 1.2 },
    KeywordEntry { word: "results", intent: Intent::Causal, weight: 1.1 },
    KeywordEntry { word: "before", intent: Intent::Temporal, weight: 1.2 },
    KeywordEntry { word: "after", intent: Intent::Temporal, weight: 1.2 },
    KeywordEntry { word: "next", intent: Intent::Temporal, weight: 1.0 },
    KeywordEntry { word: "then", intent: Intent::Temporal, weight: 0.9 },
    KeywordEntry { word: "sequence", intent: Intent::Temporal, weight: 1.3 },
];

fn match_patterns(lower: &str) -> Option<Intent> {
    let has_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
    if has_any(&["what is", "what are", "define", "meaning of"]) {
        return Some(Intent::Define);
    }
    if has_any(&["why does", "how does", "explain"]) {
        return Some(Intent::Why);
    }
    if has_any(&["compare", "which is better", "difference between"]) {
        return Some(Intent::Compare);
    }
    if has_any(&["what causes", "leads to", "results in"]) {
        return Some(Intent::Causal);
    }
    if has_any(&["what happens after", "what comes before", "sequence of"]) {
        return Some(Intent::Temporal);
    }
    None
}

fn match_keywords(tokens: &[String]) -> Intent {
    use std::collections::HashMap;
    let mut scores: HashMap<&'static str, (Intent, f64)> = HashMap::new();
    for token in tokens {
        if let Some(entry) = KEYWORDS.iter().find(|k| k.word == token) {
            let key = match entry.intent {
                Intent::Define => "define",
                Intent::Why => "why",
                Intent::Compare => "compare",
                Intent::Causal => "causal",
                Intent::Temporal => "temporal",
                Intent::Other => "other",
            };
            let slot = scores.entry(key).or_insert((entry.intent, 0.0));
            slot.1 += entry.weight;
        }
    }
    scores
        .into_values()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(intent, _)| intent)
        .unwrap_or(Intent::Other)
}

/// Word count plus entity-like (capitalization-agnostic, token-count) proxy
/// for query complexity; the original's `QueryComplexityAnalyzer` is not
/// reproduced wholesale since it leans on NLP tooling out of scope here.
fn analyze_complexity(tokens: &[String]) -> Complexity {
    match tokens.len() {
        0..=3 => Complexity::Simple,
        4..=8 => Complexity::Moderate,
        _ => Complexity::Complex,
    }
}

pub struct PolicyRouter {
    default_weights: ScoringWeights,
}

impl Default for PolicyRouter {
    fn default() -> Self {
        Self { default_weights: ScoringWeights::default() }
    }
}

impl PolicyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, text: &str) -> QueryClassification {
        let lower = text.to_lowercase();
        let tokens = tokenize_query(text);
        let (intent, confidence) = match match_patterns(&lower) {
            Some(intent) => (intent, 0.9),
            None => (match_keywords(&tokens), 0.7),
        };
        QueryClassification {
            intent,
            confidence,
            complexity: analyze_complexity(&tokens),
        }
    }

    /// Produce the beam/scoring bundle for a classified query. Intent picks
    /// a base beam width/depth; complexity then scales that base
    /// multiplicatively rather than overriding it outright.
    pub fn policy_for(&self, classification: &QueryClassification) -> PolicyBundle {
        let mut beam_params = BeamParams::default();
        let (base_width, base_depth) = match classification.intent {
            Intent::Define => (16, 3),
            Intent::Why | Intent::Causal => (24, 5),
            Intent::Compare => (32, 4),
            Intent::Temporal | Intent::Other => (beam_params.beam_width, beam_params.max_depth),
        };
        beam_params.beam_width = base_width;
        beam_params.max_depth = base_depth;
        match classification.complexity {
            Complexity::Simple => {
                beam_params.beam_width = ((beam_params.beam_width as f64) * 0.5).round() as usize;
            }
            Complexity::Moderate => {}
            Complexity::Complex => {
                beam_params.beam_width = ((beam_params.beam_width as f64) * 1.5).round() as usize;
                beam_params.max_depth = ((beam_params.max_depth as f64) * 1.3).round() as usize;
                beam_params.stop_threshold *= 0.8;
            }
        }
        let preferred_relations = match classification.intent {
            Intent::Define => vec![crate::graph::Relation::Exact, crate::graph::Relation::Generalization],
            Intent::Why => vec![crate::graph::Relation::Temporal, crate::graph::Relation::Leap],
            Intent::Compare => vec![
                crate::graph::Relation::Exact,
                crate::graph::Relation::Leap,
                crate::graph::Relation::Generalization,
            ],
            Intent::Causal => vec![crate::graph::Relation::Causes],
            Intent::Temporal => vec![crate::graph::Relation::Temporal],
            Intent::Other => vec![],
        };
        PolicyBundle {
            beam_params,
            scoring_weights: self.default_weights,
            preferred_relations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_match_beats_keyword_fallback() {
        let router = PolicyRouter::new();
        let c = router.classify("what is a mammal");
        assert_eq!(c.intent, Intent::Define);
        assert!((c.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn keyword_fallback_used_when_no_pattern_matches() {
        let router = PolicyRouter::new();
        let c = router.classify("cause leads results");
        assert_eq!(c.intent, Intent::Causal);
        assert!((c.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn unrecognized_query_falls_back_to_other() {
        let router = PolicyRouter::new();
        let c = router.classify("zzz qqq");
        assert_eq!(c.intent, Intent::Other);
    }

    #[test]
    fn complexity_scales_with_token_count() {
        let router = PolicyRouter::new();
        let simple = router.classify("what is cat");
        let complex = router.classify("why does the cat chase the mouse across the long yard quickly");
        assert_eq!(simple.complexity, Complexity::Simple);
        assert_eq!(complex.complexity, Complexity::Complex);
    }
}
