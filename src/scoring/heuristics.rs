//! Cheap per-item heuristics: query term coverage, recency and length fit.

use once_cell::sync::Lazy;
use regex::Regex;

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(20[0-2]\d)\b").expect("static pattern is valid"));

/// Neutral recency when the content mentions no year.
pub const DEFAULT_RECENCY: f64 = 0.7;

/// Fraction of query terms (lowercase, whitespace-split, longer than two
/// chars) that occur as a substring of the lowercased content.
pub fn query_term_match(query: &str, content: &str) -> f64 {
    let query = query.to_lowercase();
    let terms: Vec<&str> = query
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .collect();
    if terms.is_empty() {
        return 0.0;
    }
    let content = content.to_lowercase();
    let hits = terms.iter().filter(|t| content.contains(*t)).count();
    hits as f64 / terms.len() as f64
}

/// Most recent year in 2000..=2029 mentioned in the text.
pub fn latest_year(content: &str) -> Option<i32> {
    YEAR.captures_iter(content)
        .filter_map(|c| c.get(1)?.as_str().parse::<i32>().ok())
        .max()
}

/// Recency relative to `reference_year`.
///
/// ```ascii
/// diff ≤ 1 → 1.0
/// diff ≤ 2 → 0.9
/// diff ≤ 5 → 0.8
/// else     → max(0.5, 1 − diff/10)
/// ```
///
/// Years in the future count as current.
pub fn recency_score(content: &str, reference_year: i32, default: f64) -> f64 {
    let Some(year) = latest_year(content) else {
        return default;
    };
    let diff = reference_year - year;
    match diff {
        d if d <= 1 => 1.0,
        2 => 0.9,
        3..=5 => 0.8,
        d => (1.0 - d as f64 / 10.0).max(0.5),
    }
}

/// Length fit of content against the query, by character count.
pub fn length_score(content: &str, query: &str) -> f64 {
    let len = content.chars().count();
    let query_len = query.chars().count();
    if len < 50 {
        0.3
    } else if len * 2 < query_len {
        0.5
    } else if len > 1000 {
        0.7
    } else {
        0.8
    }
}
