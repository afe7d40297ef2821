//! EdgeQuake Rerank - relevance reranking engine and HTTP service
//!
//! Reorders a caller-supplied list of text items by relevance to a query and
//! returns them annotated with scores. Two ranking paths are available:
//!
//! | Mode | Engine | Notes |
//! |------|--------|-------|
//! | `math` | [`MathReranker`] | TF-IDF, semantic overlap, lexical, fuzzy, recency, length |
//! | `ai` | [`AiReranker`] | Neural model via [`InferenceCapability`], falls back to math |
//!
//! Full rankings are cached by a content fingerprint of
//! `(query, items, mode, excluded factors)`; top-K truncation is applied
//! only to the outgoing response.
//!
//! # Architecture
//!
//! ```ascii
//!  POST /rerank ─► server ─► RerankService ─► ResultCache ─► KeyValueStore
//!                                 │
//!                       ┌─────────┴─────────┐
//!                       ▼                   ▼
//!                 MathReranker ◄─────── AiReranker ─► InferenceCapability
//!                       │      fallback
//!                       ▼
//!                scoring/ + text/
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use edgequake_rerank::{Item, MathReranker, MemoryStore, RerankRequest, RerankService};
//! use edgequake_rerank::cache::ResultCache;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = ResultCache::new(Arc::new(MemoryStore::default()), Duration::from_secs(3600));
//! let service = RerankService::new(Arc::new(MathReranker::new()), cache);
//!
//! let request = RerankRequest::new(
//!     "machine learning 2023",
//!     vec![
//!         Item::new("a", "A 2023 paper on machine learning techniques."),
//!         Item::new("b", "An unrelated essay on gardening."),
//!     ],
//! );
//! let response = service.rerank(&request).await.unwrap();
//! assert_eq!(response.items[0].id, "a");
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod inference;
pub mod reranker;
pub mod scoring;
pub mod server;
pub mod service;
pub mod text;

pub use cache::{CacheStats, FailingStore, KeyValueStore, MemoryStore, ResultCache};
pub use config::ServiceConfig;
pub use error::{RerankError, Result};
pub use fingerprint::{derive_key, KeyDeriver};
pub use inference::{HttpInference, InferenceCapability, InferenceRequest, MockInference};
pub use reranker::{
    AiReranker, ExcludeFactor, ExcludeSet, Item, MathReranker, RankedResult, RerankMode, Reranker,
    ScoreTrace,
};
pub use service::{RerankRequest, RerankResponse, RerankService};
