//! TF-IDF model over one rerank batch.
//!
//! The model is built once per request over every item's stemmed terms plus
//! the query as a trailing pseudo-document. It is the only cross-item
//! dependency in scoring: it must exist before any vector score is computed.
//!
//! # Weights
//!
//! ```ascii
//! w(t, d) = tf(t, d) × idf(t)
//! idf(t)  = ln((1 + N) / (1 + df(t))) + 1     (smoothed, always > 0)
//!
//! vectorScore(d) = Σ_{t ∈ query} min(w(t, q), w(t, d)) / Σ_{t ∈ query} w(t, q)
//! ```
//!
//! Weights live in ordered maps so float sums are reproducible run to run.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Term weights for a corpus where the last document is the query.
#[derive(Debug, Clone)]
pub struct TfIdfModel {
    doc_weights: Vec<BTreeMap<String, f64>>,
    query_weights: BTreeMap<String, f64>,
}

impl TfIdfModel {
    /// Build the model from tokenized documents and the tokenized query.
    pub fn build(documents: &[Vec<String>], query: &[String]) -> Self {
        let n = (documents.len() + 1) as f64;

        let mut df: HashMap<&str, usize> = HashMap::new();
        for terms in documents.iter().map(Vec::as_slice).chain(std::iter::once(query)) {
            let unique: HashSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let idf = |term: &str| -> f64 {
            let df = df.get(term).copied().unwrap_or(0) as f64;
            ((1.0 + n) / (1.0 + df)).ln() + 1.0
        };

        let weigh = |terms: &[String]| -> BTreeMap<String, f64> {
            let mut tf: BTreeMap<&str, usize> = BTreeMap::new();
            for t in terms {
                *tf.entry(t.as_str()).or_insert(0) += 1;
            }
            tf.into_iter()
                .map(|(t, count)| (t.to_string(), count as f64 * idf(t)))
                .collect()
        };

        Self {
            doc_weights: documents.iter().map(|d| weigh(d.as_slice())).collect(),
            query_weights: weigh(query),
        }
    }

    /// Number of (non-query) documents.
    pub fn len(&self) -> usize {
        self.doc_weights.len()
    }

    /// Whether the model has no documents.
    pub fn is_empty(&self) -> bool {
        self.doc_weights.is_empty()
    }

    /// Weight of `term` in the query.
    pub fn query_weight(&self, term: &str) -> f64 {
        self.query_weights.get(term).copied().unwrap_or(0.0)
    }

    /// Weight of `term` in document `index`.
    pub fn weight(&self, index: usize, term: &str) -> f64 {
        self.doc_weights
            .get(index)
            .and_then(|w| w.get(term))
            .copied()
            .unwrap_or(0.0)
    }

    /// Query coverage similarity for document `index`, in `[0, 1]`.
    ///
    /// Returns 0 if the query has no weighted terms.
    pub fn similarity(&self, index: usize) -> f64 {
        let total: f64 = self.query_weights.values().sum();
        if total <= 0.0 || !total.is_finite() {
            return 0.0;
        }

        let overlap: f64 = self
            .query_weights
            .iter()
            .map(|(term, &qw)| qw.min(self.weight(index, term)))
            .sum();

        let score = overlap / total;
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
