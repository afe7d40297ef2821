//! Request-side data: items, excluded factors and rerank mode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::result::ScoreTrace;
use crate::error::RerankError;

/// A caller-supplied text item.
///
/// `length`, `final_score` and `scores` are engine output. Whatever the
/// caller sent in those fields is discarded before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    /// Non-authoritative per-factor debug trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreTrace>,
}

impl Item {
    /// Create an item with no engine-computed fields.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            length: None,
            final_score: None,
            scores: None,
        }
    }

    /// Copy of this item carrying only caller-owned fields.
    pub fn stripped(&self) -> Self {
        Self::new(self.id.clone(), self.content.clone())
    }

    /// Engine score, 0 when unscored.
    pub fn score(&self) -> f64 {
        self.final_score.unwrap_or(0.0)
    }
}

/// A named scoring factor the caller may zero out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExcludeFactor {
    #[serde(rename = "vectorScore")]
    VectorScore,
    #[serde(rename = "semanticScore")]
    SemanticScore,
    #[serde(rename = "length")]
    Length,
    #[serde(rename = "recency")]
    Recency,
    #[serde(rename = "queryTermMatch")]
    QueryTermMatch,
}

impl ExcludeFactor {
    /// Every excludable factor.
    pub const ALL: [ExcludeFactor; 5] = [
        ExcludeFactor::VectorScore,
        ExcludeFactor::SemanticScore,
        ExcludeFactor::Length,
        ExcludeFactor::Recency,
        ExcludeFactor::QueryTermMatch,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcludeFactor::VectorScore => "vectorScore",
            ExcludeFactor::SemanticScore => "semanticScore",
            ExcludeFactor::Length => "length",
            ExcludeFactor::Recency => "recency",
            ExcludeFactor::QueryTermMatch => "queryTermMatch",
        }
    }
}

impl fmt::Display for ExcludeFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExcludeFactor {
    type Err = RerankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExcludeFactor::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| RerankError::validation(format!("unknown exclude factor '{s}'")))
    }
}

/// Set of excluded factors. Order and duplicates in the input do not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExcludeSet(BTreeSet<ExcludeFactor>);

impl ExcludeSet {
    /// No exclusions.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every named factor excluded.
    pub fn all() -> Self {
        ExcludeFactor::ALL.into_iter().collect()
    }

    pub fn contains(&self, factor: ExcludeFactor) -> bool {
        self.0.contains(&factor)
    }

    pub fn insert(&mut self, factor: ExcludeFactor) -> bool {
        self.0.insert(factor)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ExcludeFactor> + '_ {
        self.0.iter().copied()
    }

    /// Wire names in lexicographic order.
    pub fn sorted_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.0.iter().map(ExcludeFactor::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<ExcludeFactor> for ExcludeSet {
    fn from_iter<I: IntoIterator<Item = ExcludeFactor>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which ranking path a request asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankMode {
    #[default]
    Math,
    Ai,
}

impl RerankMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RerankMode::Math => "math",
            RerankMode::Ai => "ai",
        }
    }
}

impl fmt::Display for RerankMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
