//! Independent relevance scorers.
//!
//! ```ascii
//! scoring/
//! ├── tfidf.rs       ─► vectorScore (batch TF-IDF model)
//! ├── semantic.rs    ─► semanticScore (feature overlap)
//! ├── heuristics.rs  ─► queryTermMatch, recency, length
//! ├── lexical.rs     ─► stringScore (overlap + Dice + Jaro-Winkler)
//! ├── fuzzy.rs       ─► fuzzyScore (batched bounded edit distance)
//! └── keyword.rs     ─► BM25 keyword signal (trace only)
//! ```
//!
//! Every scorer is a pure function of its inputs and returns a finite value.
//! All but the BM25 signal are bounded to `[0, 1]`.

mod fuzzy;
mod heuristics;
mod keyword;
mod lexical;
mod semantic;
mod tfidf;

pub use fuzzy::{
    bounded_levenshtein, FuzzyIndex, DEFAULT_DISTANCE_RATIO, DEFAULT_MAX_QUERY_TERMS,
    MAX_EDIT_DISTANCE,
};
pub use heuristics::{latest_year, length_score, query_term_match, recency_score, DEFAULT_RECENCY};
pub use keyword::KeywordScorer;
pub use lexical::{dice_bigram, jaro, jaro_winkler, string_score, token_overlap};
pub use semantic::{overlap_ratio, semantic_score};
pub use tfidf::TfIdfModel;
