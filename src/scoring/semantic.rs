//! Semantic feature overlap.
//!
//! ```ascii
//! factor        weight
//! phrases       0.4
//! concepts      0.3
//! nouns         0.2
//! topics        0.1
//!
//! overlap(f)    = |query_f ∩ content_f| / |query_f|
//! semanticScore = Σ w·overlap / Σ w        (only over factors with overlap > 0)
//! ```
//!
//! Renormalizing over non-zero factors keeps content from being punished for
//! a feature class the query simply does not have.

use std::collections::HashSet;

use crate::text::TextFeatures;

const PHRASE_WEIGHT: f64 = 0.4;
const CONCEPT_WEIGHT: f64 = 0.3;
const NOUN_WEIGHT: f64 = 0.2;
const TOPIC_WEIGHT: f64 = 0.1;

/// Case-insensitive `|query ∩ content| / |query|`, 0 for an empty query set.
pub fn overlap_ratio(query: &[String], content: &[String]) -> f64 {
    let query: HashSet<String> = query.iter().map(|s| s.to_lowercase()).collect();
    if query.is_empty() {
        return 0.0;
    }
    let content: HashSet<String> = content.iter().map(|s| s.to_lowercase()).collect();
    query.intersection(&content).count() as f64 / query.len() as f64
}

/// Weighted, renormalized overlap of query and content features.
pub fn semantic_score(query: &TextFeatures, content: &TextFeatures) -> f64 {
    let factors = [
        (overlap_ratio(&query.phrases, &content.phrases), PHRASE_WEIGHT),
        (overlap_ratio(&query.concepts, &content.concepts), CONCEPT_WEIGHT),
        (overlap_ratio(&query.nouns, &content.nouns), NOUN_WEIGHT),
        (overlap_ratio(&query.topics, &content.topics), TOPIC_WEIGHT),
    ];

    let (weighted, total_weight) = factors
        .iter()
        .filter(|(score, _)| *score > 0.0)
        .fold((0.0, 0.0), |(sum, weights), (score, weight)| {
            (sum + score * weight, weights + weight)
        });

    if total_weight <= 0.0 {
        return 0.0;
    }
    let score = weighted / total_weight;
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
