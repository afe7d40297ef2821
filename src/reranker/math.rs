//! Multi-factor local reranker.
//!
//! # Algorithm
//!
//! ```ascii
//! 1. batch setup (the only cross-item step)
//!    ├─ tokenize + stem every item and the query
//!    ├─ TF-IDF model over items + query pseudo-document
//!    ├─ BM25 keyword scores (trace only)
//!    └─ fuzzy vocabulary index, one batched pass
//!
//! 2. per item
//!    named factors (excludable): vector, semantic, queryTermMatch, recency, length
//!    always computed:            string, fuzzy
//!
//!    active > 0:  final = .25 vector + .25 semantic + .20 qtm + .15 string
//!                       + .10 fuzzy  + .03 recency  + .02 length
//!    active = 0:  final = .6 string + .4 fuzzy
//!
//! 3. stable sort, descending final score
//! ```

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use std::sync::Arc;

use super::item::{ExcludeFactor, ExcludeSet, Item, RerankMode};
use super::result::{RankedResult, ScoreTrace};
use super::traits::Reranker;
use crate::config::ScoringConfig;
use crate::error::{RerankError, Result};
use crate::scoring::{
    length_score, query_term_match, recency_score, semantic_score, string_score, FuzzyIndex,
    KeywordScorer, TfIdfModel, DEFAULT_DISTANCE_RATIO, DEFAULT_MAX_QUERY_TERMS, DEFAULT_RECENCY,
};
use crate::text::{FeatureExtractor, LexiconTagger, TextFeatures, TextTokenizer};

const VECTOR_WEIGHT: f64 = 0.25;
const SEMANTIC_WEIGHT: f64 = 0.25;
const QUERY_TERM_WEIGHT: f64 = 0.20;
const STRING_WEIGHT: f64 = 0.15;
const FUZZY_WEIGHT: f64 = 0.10;
const RECENCY_WEIGHT: f64 = 0.03;
const LENGTH_WEIGHT: f64 = 0.02;

const FALLBACK_STRING_WEIGHT: f64 = 0.6;
const FALLBACK_FUZZY_WEIGHT: f64 = 0.4;

/// Long-lived scoring engine. Construct once per process and share.
pub struct MathReranker {
    tokenizer: TextTokenizer,
    extractor: FeatureExtractor,
    keyword: KeywordScorer,
    reference_year: i32,
    recency_default: f64,
    fuzzy_distance_ratio: f64,
    fuzzy_max_terms: usize,
}

impl Default for MathReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl MathReranker {
    /// Engine with default settings, dated to the current UTC year.
    pub fn new() -> Self {
        Self {
            tokenizer: TextTokenizer::new(),
            extractor: FeatureExtractor::new(),
            keyword: KeywordScorer::default(),
            reference_year: Utc::now().year(),
            recency_default: DEFAULT_RECENCY,
            fuzzy_distance_ratio: DEFAULT_DISTANCE_RATIO,
            fuzzy_max_terms: DEFAULT_MAX_QUERY_TERMS,
        }
    }

    /// Engine configured from the `[scoring]` section.
    pub fn from_config(config: &ScoringConfig) -> Self {
        let max_chars = config.max_tokenize_chars;
        Self {
            tokenizer: TextTokenizer::new().with_max_input_chars(max_chars),
            extractor: FeatureExtractor::with_tagger(Box::new(LexiconTagger::new(max_chars))),
            keyword: KeywordScorer::default(),
            reference_year: config.reference_year.unwrap_or_else(|| Utc::now().year()),
            recency_default: config.recency_default,
            fuzzy_distance_ratio: config.fuzzy_distance_ratio,
            fuzzy_max_terms: config.max_fuzzy_terms,
        }
    }

    /// Pin the year recency is measured against.
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }

    /// Replace the semantic feature extractor.
    pub fn with_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// [`rank`](Self::rank) on the blocking thread pool, keeping async
    /// workers free while a large batch is scored.
    pub async fn rank_blocking(
        self: Arc<Self>,
        query: String,
        items: Vec<Item>,
        exclude: ExcludeSet,
    ) -> Result<Vec<Item>> {
        tokio::task::spawn_blocking(move || self.rank(&query, &items, &exclude))
            .await
            .map_err(|e| RerankError::Internal(format!("ranking task failed: {e}")))
    }

    /// Score and sort synchronously. Returns the full list.
    pub fn rank(&self, query: &str, items: &[Item], exclude: &ExcludeSet) -> Vec<Item> {
        if items.is_empty() {
            return Vec::new();
        }

        let query_terms = self.tokenizer.tokenize(query);
        let docs: Vec<Vec<String>> = items
            .iter()
            .map(|item| self.tokenizer.tokenize(&item.content))
            .collect();

        let tfidf = TfIdfModel::build(&docs, &query_terms);
        let keyword_scores = self.keyword.score_all(&query_terms, &docs);
        let contents: Vec<&str> = items.iter().map(|i| i.content.as_str()).collect();
        let fuzzy_scores = FuzzyIndex::build(&contents).score_all_bounded(
            query,
            self.fuzzy_distance_ratio,
            self.fuzzy_max_terms,
        );
        let query_features = self.extractor.extract(query);
        let excluded: Vec<String> = exclude
            .sorted_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut scored: Vec<Item> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let mut trace = self.score_item(query, &query_features, item, exclude);
                trace.vector_score = gate(exclude, ExcludeFactor::VectorScore, || {
                    tfidf.similarity(index)
                });
                trace.fuzzy_score = finite(fuzzy_scores[index]);
                trace.keyword_score = finite(keyword_scores[index]);
                trace.excluded = excluded.clone();
                finalize(&mut trace);

                let mut out = item.stripped();
                out.length = Some(item.content.chars().count());
                out.final_score = Some(trace.final_score);
                out.scores = Some(trace);
                out
            })
            .collect();

        sort_by_score(&mut scored);
        scored
    }

    /// Components that depend only on the query and this item.
    fn score_item(
        &self,
        query: &str,
        query_features: &TextFeatures,
        item: &Item,
        exclude: &ExcludeSet,
    ) -> ScoreTrace {
        let content = item.content.as_str();
        ScoreTrace {
            semantic_score: gate(exclude, ExcludeFactor::SemanticScore, || {
                semantic_score(query_features, &self.extractor.extract(content))
            }),
            query_term_match: gate(exclude, ExcludeFactor::QueryTermMatch, || {
                query_term_match(query, content)
            }),
            recency: gate(exclude, ExcludeFactor::Recency, || {
                recency_score(content, self.reference_year, self.recency_default)
            }),
            length: gate(exclude, ExcludeFactor::Length, || length_score(content, query)),
            string_score: finite(string_score(query, content)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Reranker for MathReranker {
    fn name(&self) -> &str {
        "math"
    }

    async fn rerank(
        &self,
        query: &str,
        items: &[Item],
        exclude: &ExcludeSet,
    ) -> Result<RankedResult> {
        Ok(RankedResult::new(
            self.rank(query, items, exclude),
            RerankMode::Math,
        ))
    }
}

/// Zero when excluded, otherwise the computed value forced finite.
fn gate(exclude: &ExcludeSet, factor: ExcludeFactor, score: impl FnOnce() -> f64) -> f64 {
    if exclude.contains(factor) {
        0.0
    } else {
        finite(score())
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn finalize(trace: &mut ScoreTrace) {
    let named = [
        trace.vector_score,
        trace.semantic_score,
        trace.query_term_match,
        trace.recency,
        trace.length,
    ];
    trace.active_factors = named.iter().filter(|v| **v != 0.0).count();
    trace.fallback_formula = trace.active_factors == 0;

    trace.final_score = if trace.fallback_formula {
        FALLBACK_STRING_WEIGHT * trace.string_score + FALLBACK_FUZZY_WEIGHT * trace.fuzzy_score
    } else {
        VECTOR_WEIGHT * trace.vector_score
            + SEMANTIC_WEIGHT * trace.semantic_score
            + QUERY_TERM_WEIGHT * trace.query_term_match
            + STRING_WEIGHT * trace.string_score
            + FUZZY_WEIGHT * trace.fuzzy_score
            + RECENCY_WEIGHT * trace.recency
            + LENGTH_WEIGHT * trace.length
    };
}

/// Stable descending sort on `final_score`; ties keep input order.
pub(crate) fn sort_by_score(items: &mut [Item]) {
    items.sort_by(|a, b| b.score().total_cmp(&a.score()));
}
