//! Ranking paths.
//!
//! # Architecture
//!
//! ```ascii
//!                    ┌─────────────────────────────┐
//!                    │   Query + Items + Excludes  │
//!                    └──────────────┬──────────────┘
//!                                   │
//!                                   ▼
//!     ┌─────────────────────────────────────────────────────┐
//!     │                  Reranker Trait                     │
//!     │   rerank(query, items, exclude) → RankedResult      │
//!     └──────────────────────────┬──────────────────────────┘
//!                                │
//!                ┌───────────────┴───────────────┐
//!                ▼                               ▼
//!        ┌──────────────┐                ┌──────────────┐
//!        │ MathReranker │◄── fallback ───│  AiReranker  │
//!        │ (local)      │                │ (neural)     │
//!        └──────────────┘                └──────────────┘
//! ```
//!
//! # Module Structure
//!
//! ```ascii
//! reranker/
//! ├── mod.rs      ─► This file (re-exports)
//! ├── item.rs     ─► Item, ExcludeFactor, ExcludeSet, RerankMode
//! ├── result.rs   ─► RankedResult, ScoreTrace
//! ├── traits.rs   ─► Reranker trait
//! ├── math.rs     ─► MathReranker
//! └── ai.rs       ─► AiReranker (TryAi → Math)
//! ```
//!
//! # Example
//!
//! ```
//! use edgequake_rerank::reranker::{ExcludeSet, Item, MathReranker};
//!
//! let engine = MathReranker::new();
//! let items = vec![
//!     Item::new("a", "A 2023 paper on machine learning techniques."),
//!     Item::new("b", "An unrelated essay on gardening."),
//! ];
//! let ranked = engine.rank("machine learning 2023", &items, &ExcludeSet::none());
//! assert_eq!(ranked[0].id, "a");
//! ```

mod ai;
mod item;
mod math;
mod result;
mod traits;

pub use ai::{AiReranker, DEFAULT_MODEL};
pub use item::{ExcludeFactor, ExcludeSet, Item, RerankMode};
pub use math::MathReranker;
pub use result::{RankedResult, ScoreTrace};
pub use traits::Reranker;

#[cfg(test)]
mod tests;
