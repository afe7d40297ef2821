//! Stemming tokenizer with a regex fallback path.
//!
//! # Pipeline
//!
//! ```ascii
//! text ──► primary ──► lowercase ─► NFKD (strip accents) ─► split on non-alnum
//!   │                  ─► drop len ≤ 2 ─► drop stop words ─► Snowball stem
//!   │
//!   └─(primary error)─► fallback ──► lowercase ─► regex strip ─► split
//!                                    ─► drop len ≤ 2 ─► drop stop words ─► Snowball stem
//! ```
//!
//! [`TextTokenizer::tokenize`] never fails: if the primary path rejects the
//! input, the fallback path handles it silently. Both paths stem, so terms
//! from either still match each other.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::TextError;

/// Common English stop words.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "being", "between", "both", "but", "by", "can", "could", "did", "do", "does",
    "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
    "having", "he", "her", "here", "hers", "him", "his", "how", "if", "in", "into", "is", "it",
    "its", "itself", "just", "may", "me", "might", "more", "most", "must", "my", "no", "nor",
    "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over",
    "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
];

static STOP_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("static pattern is valid"));

/// Check if a lowercase word is a stop word.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Configuration for the tokenizer.
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    /// Snowball stemmer algorithm.
    pub stemmer_algorithm: Algorithm,
    /// Tokens with this many characters or fewer are dropped.
    pub max_dropped_len: usize,
    /// Inputs longer than this (in chars) are refused by the primary path.
    pub max_input_chars: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            stemmer_algorithm: Algorithm::English,
            max_dropped_len: 2,
            max_input_chars: 200_000,
        }
    }
}

/// Tokenizer producing stemmed terms for TF-IDF and keyword scoring.
///
/// # Example
///
/// ```
/// use edgequake_rerank::text::TextTokenizer;
///
/// let tokenizer = TextTokenizer::new();
/// let terms = tokenizer.tokenize("Running the learning models");
/// assert_eq!(terms, vec!["run", "learn", "model"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextTokenizer {
    config: TokenizerConfig,
}

impl TextTokenizer {
    /// Create a tokenizer with the English defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tokenizer with a custom configuration.
    pub fn with_config(config: TokenizerConfig) -> Self {
        Self { config }
    }

    /// Set the maximum input size accepted by the primary path.
    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.config.max_input_chars = max;
        self
    }

    /// Tokenize into stems. Never fails.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match self.try_tokenize(text) {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!(error = %e, "primary tokenizer failed, using regex fallback");
                self.fallback_tokenize(text)
            }
        }
    }

    /// Primary path: normalization, stop words and stemming.
    pub(crate) fn try_tokenize(&self, text: &str) -> Result<Vec<String>, TextError> {
        let chars = text.chars().count();
        if chars > self.config.max_input_chars {
            return Err(TextError::InputTooLarge {
                max: self.config.max_input_chars,
                got: chars,
            });
        }

        let normalized: String = text
            .to_lowercase()
            .nfkd()
            .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
            .collect();

        let stemmer = Stemmer::create(self.config.stemmer_algorithm);
        let tokens = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.chars().count() > self.config.max_dropped_len)
            .filter(|s| !is_stop_word(s))
            .map(|s| stemmer.stem(s).into_owned())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(tokens)
    }

    /// Fallback path: lowercase, regex strip, whitespace split, stem.
    pub(crate) fn fallback_tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let stemmer = Stemmer::create(self.config.stemmer_algorithm);
        NON_WORD
            .replace_all(&lowered, " ")
            .split_whitespace()
            .filter(|s| s.chars().count() > self.config.max_dropped_len)
            .filter(|s| !is_stop_word(s))
            .map(|s| stemmer.stem(s).into_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Lowercase, punctuation-stripped words longer than two characters.
///
/// Used for phrase extraction and fuzzy matching, where stemming would
/// hurt more than help.
pub fn plain_words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_WORD
        .replace_all(&lowered, "")
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}
