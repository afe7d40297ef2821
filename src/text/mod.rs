//! Text feature extraction.
//!
//! ```ascii
//! text/
//! ├── mod.rs        ─► This file (TextError, re-exports)
//! ├── tokenizer.rs  ─► TextTokenizer (stemming + regex fallback)
//! └── features.rs   ─► FeatureExtractor, SemanticTagger, phrases, concepts
//! ```
//!
//! Every public entry point here is infallible. Failures inside the primary
//! tokenizer or tagger are logged and absorbed by their fallback tier.

mod features;
mod tokenizer;

pub use features::{
    baseline_tags, extract_concepts, extract_phrases, FeatureExtractor, LexiconTagger,
    SemanticTagger, SemanticTags, TextFeatures,
};
pub use tokenizer::{is_stop_word, plain_words, TextTokenizer, TokenizerConfig};

use thiserror::Error;

/// Failures of the primary text-processing tier.
#[derive(Debug, Error)]
pub enum TextError {
    /// Input exceeds the configured size budget.
    #[error("input too large: max {max} chars, got {got}")]
    InputTooLarge { max: usize, got: usize },

    /// Input contains no words.
    #[error("no words in input")]
    NoWords,

    /// Tagger-specific failure.
    #[error("tagger error: {0}")]
    Tagger(String),
}
