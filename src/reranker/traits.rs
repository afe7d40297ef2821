//! Reranker trait definition.
//!
//! ```ascii
//!                      ┌─────────────────┐
//!                      │  Reranker Trait │
//!                      └────────┬────────┘
//!                               │
//!               ┌───────────────┴───────────────┐
//!               ▼                               ▼
//!      ┌────────────────┐              ┌────────────────┐
//!      │ MathReranker   │◄── fallback ─│  AiReranker    │
//!      │ (local scores) │              │ (neural model) │
//!      └────────────────┘              └────────────────┘
//! ```

use async_trait::async_trait;

use super::item::{ExcludeSet, Item};
use super::result::RankedResult;
use crate::error::Result;

/// A ranking path.
///
/// Implementations return the full ranked list, never truncated, with
/// `length` and `final_score` set on every item.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Rank `items` by relevance to `query`.
    async fn rerank(&self, query: &str, items: &[Item], exclude: &ExcludeSet)
        -> Result<RankedResult>;
}
