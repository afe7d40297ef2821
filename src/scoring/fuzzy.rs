//! Batched fuzzy matching of a query against every item in one pass.
//!
//! The index holds the vocabulary of the whole batch once. Each query term is
//! compared against each distinct vocabulary word, never against each item:
//!
//! ```ascii
//!   query terms ──► vocab words (unique across batch) ──► owning items
//!        │                     │
//!        │   bounded edit      │   best quality per (term, item)
//!        └──── distance ───────┘
//!
//! budget(term)  = min(3, round(len(term) × ratio))
//! quality       = 1 − d / (budget + 1)        (d ≤ budget, else no match)
//! fuzzyScore    = mean over query terms of best quality in the item
//! ```
//!
//! An item matching every query term exactly scores 1; an item with no match
//! within budget scores 0.

use std::collections::{BTreeMap, HashSet};

use crate::text::plain_words;

/// Hard cap on edits tolerated for any term.
pub const MAX_EDIT_DISTANCE: usize = 3;

/// Default edit budget as a fraction of term length.
pub const DEFAULT_DISTANCE_RATIO: f64 = 0.2;

/// Default cap on distinct query terms matched against the vocabulary.
pub const DEFAULT_MAX_QUERY_TERMS: usize = 32;

/// Vocabulary of a rerank batch with item membership.
#[derive(Debug, Clone, Default)]
pub struct FuzzyIndex {
    /// Distinct words in sorted order, with the items containing each.
    vocab: Vec<(Vec<char>, Vec<usize>)>,
    items: usize,
}

impl FuzzyIndex {
    /// Index the given contents. Item indices follow input order.
    pub fn build<S: AsRef<str>>(contents: &[S]) -> Self {
        let mut vocab: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, content) in contents.iter().enumerate() {
            for word in plain_words(content.as_ref()) {
                let owners = vocab.entry(word).or_default();
                if owners.last() != Some(&index) {
                    owners.push(index);
                }
            }
        }
        Self {
            vocab: vocab
                .into_iter()
                .map(|(word, owners)| (word.chars().collect(), owners))
                .collect(),
            items: contents.len(),
        }
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.items
    }

    /// Whether no items were indexed.
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Number of distinct words across the batch.
    pub fn vocabulary_size(&self) -> usize {
        self.vocab.len()
    }

    /// Match quality in `[0, 1]` for every item, in input order, using at
    /// most [`DEFAULT_MAX_QUERY_TERMS`] query terms.
    pub fn score_all(&self, query: &str, distance_ratio: f64) -> Vec<f64> {
        self.score_all_bounded(query, distance_ratio, DEFAULT_MAX_QUERY_TERMS)
    }

    /// Like [`score_all`](Self::score_all), matching only the first
    /// `max_terms` distinct query terms in query order.
    pub fn score_all_bounded(&self, query: &str, distance_ratio: f64, max_terms: usize) -> Vec<f64> {
        let mut seen = HashSet::new();
        let terms: Vec<Vec<char>> = plain_words(query)
            .into_iter()
            .filter(|term| seen.insert(term.clone()))
            .take(max_terms)
            .map(|term| term.chars().collect())
            .collect();

        if terms.is_empty() || self.items == 0 {
            return vec![0.0; self.items];
        }

        let ratio = if distance_ratio.is_finite() {
            distance_ratio.clamp(0.0, 1.0)
        } else {
            DEFAULT_DISTANCE_RATIO
        };

        let mut totals = vec![0.0_f64; self.items];
        let mut best = vec![0.0_f64; self.items];

        for term in &terms {
            let budget = edit_budget(term.len(), ratio);
            best.iter_mut().for_each(|b| *b = 0.0);

            for (word, owners) in &self.vocab {
                let Some(distance) = bounded_levenshtein(term, word, budget) else {
                    continue;
                };
                let quality = 1.0 - distance as f64 / (budget + 1) as f64;
                for &owner in owners {
                    if quality > best[owner] {
                        best[owner] = quality;
                    }
                }
            }

            for (total, b) in totals.iter_mut().zip(&best) {
                *total += b;
            }
        }

        let n = terms.len() as f64;
        totals
            .into_iter()
            .map(|t| {
                let score = t / n;
                if score.is_finite() {
                    score.clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect()
    }
}

fn edit_budget(term_len: usize, ratio: f64) -> usize {
    ((term_len as f64 * ratio).round() as usize).min(MAX_EDIT_DISTANCE)
}

/// Levenshtein distance, or `None` once it provably exceeds `max`.
///
/// Only the diagonal band of width `2 × max + 1` is filled, so the cost is
/// `O(len × max)` rather than `O(len²)`.
pub fn bounded_levenshtein(a: &[char], b: &[char], max: usize) -> Option<usize> {
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(a.len().max(b.len()));
    }

    // Any cell outside the band is already over budget.
    let over = max.saturating_add(1);
    let mut prev = vec![over; b.len() + 1];
    let mut curr = vec![over; b.len() + 1];
    for (j, cell) in prev.iter_mut().enumerate().take(max.min(b.len()) + 1) {
        *cell = j;
    }

    for (i, ca) in a.iter().enumerate() {
        let row = i + 1;
        let lo = row.saturating_sub(max).max(1);
        let hi = row.saturating_add(max).min(b.len());

        curr[lo - 1] = if lo == 1 && row <= max { row } else { over };
        let mut row_min = curr[lo - 1];
        for j in lo..=hi {
            let cost = usize::from(*ca != b[j - 1]);
            let value = prev[j - 1]
                .saturating_add(cost)
                .min(prev[j].saturating_add(1))
                .min(curr[j - 1].saturating_add(1));
            curr[j] = value.min(over);
            row_min = row_min.min(curr[j]);
        }
        if hi < b.len() {
            curr[hi + 1] = over;
        }

        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max).then_some(distance)
}
