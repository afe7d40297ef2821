//! Reranking result types.
//!
//! [`RankedResult`] is the unit stored in and read from the result cache. It
//! always holds the full ranked list; top-K truncation happens afterwards.

use serde::{Deserialize, Serialize};

use super::item::{Item, RerankMode};

/// Full ranked output of one rerank pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Items in descending score order, ties in input order.
    pub items: Vec<Item>,
    /// Path that actually produced the ranking.
    pub method: RerankMode,
    /// Whether this result was served from the cache.
    #[serde(default)]
    pub cached: bool,
}

impl RankedResult {
    pub fn new(items: Vec<Item>, method: RerankMode) -> Self {
        Self {
            items,
            method,
            cached: false,
        }
    }

    /// Keep only the first `top_k` items. `None` or 0 keeps everything.
    pub fn truncate(&mut self, top_k: Option<usize>) {
        if let Some(k) = top_k.filter(|k| *k > 0) {
            self.items.truncate(k);
        }
    }

    /// Ids in ranked order.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.id.as_str()).collect()
    }
}

/// Per-item component scores, attached for observability only.
///
/// Excluded factors appear as 0. `keyword_score` is an unbounded BM25 value
/// and never contributes to `final_score`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreTrace {
    pub vector_score: f64,
    pub semantic_score: f64,
    pub query_term_match: f64,
    pub recency: f64,
    pub length: f64,
    pub string_score: f64,
    pub fuzzy_score: f64,
    pub keyword_score: f64,
    pub final_score: f64,
    /// Excluded factor names, sorted.
    pub excluded: Vec<String>,
    /// Count of named factors that were non-zero.
    pub active_factors: usize,
    /// Whether the string/fuzzy-only formula was used.
    pub fallback_formula: bool,
}
