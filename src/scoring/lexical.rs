//! Lexical string similarity.
//!
//! ```ascii
//! stringScore = 0.5 × tokenOverlap + 0.3 × diceBigram + 0.2 × jaroWinkler
//! ```
//!
//! All three are case-insensitive and return values in `[0, 1]`.

use std::collections::{HashMap, HashSet};

const TOKEN_OVERLAP_WEIGHT: f64 = 0.5;
const DICE_WEIGHT: f64 = 0.3;
const JARO_WINKLER_WEIGHT: f64 = 0.2;

/// Jaro-Winkler is quadratic in the worst case; both sides are compared by prefix.
const JARO_MAX_CHARS: usize = 1024;

fn token_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fraction of query tokens present in the content token set.
///
/// ```ascii
/// Query:   {capital, of, france}
/// Content: {the, capital, of, france, is, paris}
/// Score = |query ∩ content| / |query| = 3/3 = 1.0
/// ```
pub fn token_overlap(query: &str, content: &str) -> f64 {
    let query_terms = token_set(query);
    if query_terms.is_empty() {
        return 0.0;
    }
    let content_terms = token_set(content);
    let overlap = query_terms.intersection(&content_terms).count();
    overlap as f64 / query_terms.len() as f64
}

/// Sørensen–Dice coefficient over character bigrams, whitespace ignored.
pub fn dice_bigram(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
    let b: Vec<char> = b.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();

    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }
    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for w in a.windows(2) {
        *bigrams.entry((w[0], w[1])).or_insert(0) += 1;
    }

    let mut intersection = 0usize;
    for w in b.windows(2) {
        if let Some(count) = bigrams.get_mut(&(w[0], w[1])) {
            if *count > 0 {
                *count -= 1;
                intersection += 1;
            }
        }
    }

    (2 * intersection) as f64 / (a.len() + b.len() - 2) as f64
}

/// Jaro similarity.
pub fn jaro(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, &ca) in a.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(b.len());
        for j in lo..hi {
            if !b_matched[j] && b[j] == ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let a_seq = a.iter().zip(&a_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let b_seq = b.iter().zip(&b_matched).filter(|(_, m)| **m).map(|(c, _)| c);
    let transpositions = a_seq.zip(b_seq).filter(|(x, y)| x != y).count() / 2;

    let m = matches as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64) / m) / 3.0
}

/// Jaro-Winkler similarity (prefix scale 0.1, prefix up to 4 chars), case-insensitive.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let sim = jaro(&a, &b);
    let prefix = a
        .chars()
        .zip(b.chars())
        .take(4)
        .take_while(|(x, y)| x == y)
        .count();
    (sim + prefix as f64 * 0.1 * (1.0 - sim)).clamp(0.0, 1.0)
}

fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Weighted blend of token overlap, bigram Dice and Jaro-Winkler.
pub fn string_score(query: &str, content: &str) -> f64 {
    let score = TOKEN_OVERLAP_WEIGHT * token_overlap(query, content)
        + DICE_WEIGHT * dice_bigram(query, content)
        + JARO_WINKLER_WEIGHT
            * jaro_winkler(
                char_prefix(query, JARO_MAX_CHARS),
                char_prefix(content, JARO_MAX_CHARS),
            );
    if score.is_finite() {
        score
    } else {
        0.0
    }
}
