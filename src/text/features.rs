//! Phrase, concept and semantic-tag extraction.
//!
//! Semantic tagging (nouns, verbs, adjectives, topics) goes through the
//! [`SemanticTagger`] seam with two tiers:
//!
//! ```ascii
//! FeatureExtractor::extract(text)
//!        │
//!        ├─► phrases   (2-grams + 3-grams, always computed)
//!        ├─► concepts  (capitalized / ALL-CAPS / long hyphenated, always)
//!        └─► tags ──► primary tagger ──Ok──► nouns, verbs, adjectives, topics
//!                          │
//!                          └─Err──► baseline (nouns = words > 3 chars)
//! ```
//!
//! The baseline never fails, so extraction as a whole never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use super::tokenizer::{is_stop_word, plain_words};
use super::TextError;

static CAPITALIZED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:[A-Z]{2,}|[A-Z][a-z]+)\b").expect("static pattern is valid")
});

static SENTENCE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}][\p{L}'-]*").expect("static pattern is valid"));

/// Features extracted from a piece of text. All values are lowercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFeatures {
    pub nouns: Vec<String>,
    pub verbs: Vec<String>,
    pub adjectives: Vec<String>,
    pub topics: Vec<String>,
    pub phrases: Vec<String>,
    pub concepts: Vec<String>,
}

/// Part-of-speech style tags produced by a [`SemanticTagger`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticTags {
    pub nouns: Vec<String>,
    pub verbs: Vec<String>,
    pub adjectives: Vec<String>,
    pub topics: Vec<String>,
}

/// A natural-language tagging capability.
///
/// Implementations may fail; [`FeatureExtractor`] degrades to the baseline
/// tagger when they do.
pub trait SemanticTagger: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Tag the text.
    fn tag(&self, text: &str) -> Result<SemanticTags, TextError>;
}

/// Lexicon and suffix based tagger.
///
/// Closed-class lexicons catch the common verbs and adjectives, suffix rules
/// catch the rest, and everything else longer than two characters is a noun.
/// Topics are runs of capitalized words that do not start a sentence.
pub struct LexiconTagger {
    max_input_chars: usize,
}

const COMMON_VERBS: &[&str] = &[
    "build", "built", "compare", "create", "describe", "develop", "discuss", "explain", "find",
    "get", "give", "go", "improve", "make", "made", "move", "provide", "run", "ran", "say",
    "said", "see", "show", "take", "took", "use", "used", "work", "write", "wrote", "learn",
    "train", "grow", "plant", "rank", "search", "compute", "apply", "help", "keep", "read",
];

const COMMON_ADJECTIVES: &[&str] = &[
    "new", "old", "good", "bad", "great", "small", "large", "big", "long", "short", "high", "low",
    "fast", "slow", "early", "late", "recent", "modern", "simple", "complex", "deep", "hard",
    "easy", "best", "better", "worst", "first", "last", "major", "minor", "main", "key", "open",
];

const VERB_SUFFIXES: &[&str] = &["ing", "ize", "ise", "ify", "ed"];
const ADJECTIVE_SUFFIXES: &[&str] = &["ous", "ful", "ive", "able", "ible", "less", "ical", "ish"];

impl LexiconTagger {
    /// Create a tagger refusing inputs over `max_input_chars`.
    pub fn new(max_input_chars: usize) -> Self {
        Self { max_input_chars }
    }

    fn classify(word: &str) -> WordClass {
        if COMMON_VERBS.contains(&word) {
            return WordClass::Verb;
        }
        if COMMON_ADJECTIVES.contains(&word) {
            return WordClass::Adjective;
        }
        let long_enough = word.chars().count() > 4;
        if long_enough && ADJECTIVE_SUFFIXES.iter().any(|s| word.ends_with(s)) {
            return WordClass::Adjective;
        }
        if long_enough && VERB_SUFFIXES.iter().any(|s| word.ends_with(s)) {
            return WordClass::Verb;
        }
        WordClass::Noun
    }

    fn topics(text: &str) -> Vec<String> {
        let mut topics = Vec::new();
        for sentence in text.split(['.', '!', '?', '\n']) {
            let mut run: Vec<&str> = Vec::new();
            for (position, m) in SENTENCE_WORD.find_iter(sentence).enumerate() {
                let word = m.as_str();
                let capitalized = word.chars().next().is_some_and(char::is_uppercase);
                if capitalized && position > 0 && !is_stop_word(&word.to_lowercase()) {
                    run.push(word);
                } else if !run.is_empty() {
                    topics.push(run.join(" ").to_lowercase());
                    run.clear();
                }
            }
            if !run.is_empty() {
                topics.push(run.join(" ").to_lowercase());
            }
        }
        dedup(topics)
    }
}

impl Default for LexiconTagger {
    fn default() -> Self {
        Self::new(200_000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordClass {
    Noun,
    Verb,
    Adjective,
}

impl SemanticTagger for LexiconTagger {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn tag(&self, text: &str) -> Result<SemanticTags, TextError> {
        let chars = text.chars().count();
        if chars > self.max_input_chars {
            return Err(TextError::InputTooLarge {
                max: self.max_input_chars,
                got: chars,
            });
        }

        let words: Vec<String> = SENTENCE_WORD
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        if words.is_empty() {
            return Err(TextError::NoWords);
        }

        let mut tags = SemanticTags::default();
        for word in words {
            if word.chars().count() <= 2 || is_stop_word(&word) {
                continue;
            }
            match Self::classify(&word) {
                WordClass::Noun => tags.nouns.push(word),
                WordClass::Verb => tags.verbs.push(word),
                WordClass::Adjective => tags.adjectives.push(word),
            }
        }
        tags.nouns = dedup(tags.nouns);
        tags.verbs = dedup(tags.verbs);
        tags.adjectives = dedup(tags.adjectives);
        tags.topics = Self::topics(text);
        Ok(tags)
    }
}

/// Baseline tagging: nouns are words longer than three characters.
pub fn baseline_tags(text: &str) -> SemanticTags {
    let nouns = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.chars().count() > 3)
        .collect();
    SemanticTags {
        nouns: dedup(nouns),
        ..Default::default()
    }
}

/// Contiguous 2-grams and 3-grams of words longer than two characters.
pub fn extract_phrases(text: &str) -> Vec<String> {
    let words = plain_words(text);
    let mut phrases = Vec::new();
    for n in [2, 3] {
        for window in words.windows(n) {
            phrases.push(window.join(" "));
        }
    }
    dedup(phrases)
}

/// Capitalized or ALL-CAPS words, plus hyphenated tokens longer than five characters.
pub fn extract_concepts(text: &str) -> Vec<String> {
    let mut concepts: Vec<String> = CAPITALIZED
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect();

    for token in text.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_alphanumeric() && c != '-');
        let token = token.trim_matches('-');
        if token.contains('-') && token.chars().count() > 5 {
            concepts.push(token.to_lowercase());
        }
    }

    dedup(concepts)
}

/// Two-tier feature extractor.
pub struct FeatureExtractor {
    tagger: Box<dyn SemanticTagger>,
}

impl FeatureExtractor {
    /// Create an extractor using the lexicon tagger.
    pub fn new() -> Self {
        Self::with_tagger(Box::new(LexiconTagger::default()))
    }

    /// Create an extractor with a custom primary tagger.
    pub fn with_tagger(tagger: Box<dyn SemanticTagger>) -> Self {
        Self { tagger }
    }

    /// Extract all features. Never fails.
    pub fn extract(&self, text: &str) -> TextFeatures {
        let tags = match self.tagger.tag(text) {
            Ok(tags) => tags,
            Err(e) => {
                debug!(tagger = self.tagger.name(), error = %e, "semantic tagger failed, using baseline");
                baseline_tags(text)
            }
        };

        TextFeatures {
            nouns: tags.nouns,
            verbs: tags.verbs,
            adjectives: tags.adjectives,
            topics: tags.topics,
            phrases: extract_phrases(text),
            concepts: extract_concepts(text),
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}
