//! BM25 keyword signal.
//!
//! Unbounded, observability-only score recorded in each item's debug trace.
//! It is never part of `finalScore`.
//!
//! # Algorithm
//!
//! ```ascii
//! score = Σ IDF(q) × f(q,D)×(k1+1) / (f(q,D) + k1×(1-b+b×|D|/avgdl))
//!
//! IDF(q) = ln((N - n(q) + 0.5) / (n(q) + 0.5) + 1)
//! ```
//!
//! The `+1` inside ln() keeps IDF non-negative.

use std::collections::{HashMap, HashSet};

/// BM25 parameters.
#[derive(Debug, Clone, Copy)]
pub struct KeywordScorer {
    /// Term frequency saturation.
    pub k1: f64,
    /// Length normalization. 0 = none, 1 = full.
    pub b: f64,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl KeywordScorer {
    /// Create with custom parameters.
    pub fn with_params(k1: f64, b: f64) -> Self {
        Self {
            k1: k1.clamp(0.0, 3.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    #[inline]
    pub(crate) fn idf_from_df(n: f64, df: f64) -> f64 {
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    pub(crate) fn document_frequencies(docs: &[Vec<String>]) -> HashMap<&str, usize> {
        let mut df_map: HashMap<&str, usize> = HashMap::new();
        for doc_terms in docs {
            let unique: HashSet<&str> = doc_terms.iter().map(String::as_str).collect();
            for term in unique {
                *df_map.entry(term).or_insert(0) += 1;
            }
        }
        df_map
    }

    /// Score every document against the query terms, in input order.
    pub fn score_all(&self, query_terms: &[String], docs: &[Vec<String>]) -> Vec<f64> {
        if docs.is_empty() {
            return Vec::new();
        }
        if query_terms.is_empty() {
            return vec![0.0; docs.len()];
        }

        let n = docs.len() as f64;
        let avgdl = (docs.iter().map(Vec::len).sum::<usize>() as f64 / n).max(1.0);
        let df_map = Self::document_frequencies(docs);

        let idf: HashMap<&str, f64> = query_terms
            .iter()
            .map(|t| {
                let df = df_map.get(t.as_str()).copied().unwrap_or(0) as f64;
                (t.as_str(), Self::idf_from_df(n, df))
            })
            .collect();

        docs.iter()
            .map(|doc_terms| {
                let length_norm = 1.0 - self.b + self.b * (doc_terms.len() as f64 / avgdl);
                query_terms
                    .iter()
                    .map(|term| {
                        let tf = doc_terms.iter().filter(|t| *t == term).count() as f64;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        let tf_component = (tf * (self.k1 + 1.0)) / (tf + self.k1 * length_norm);
                        idf.get(term.as_str()).copied().unwrap_or(0.0) * tf_component
                    })
                    .sum()
            })
            .collect()
    }
}
