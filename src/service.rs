//! Request orchestration.
//!
//! ```ascii
//! RerankRequest ──validate──► key ──► cache hit? ──yes──► truncate ──► response
//!                                          │
//!                                          no
//!                                          ▼
//!                              math | ai (→ math on failure)
//!                                          │
//!                                  cache full result
//!                                          │
//!                                       truncate ──► response
//! ```
//!
//! The cached entry is always the untruncated ranking, so requests that
//! differ only in `topK` share one entry.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::cache::{KeyValueStore, ResultCache};
use crate::config::ServiceConfig;
use crate::error::{RerankError, Result};
use crate::fingerprint::KeyDeriver;
use crate::inference::InferenceCapability;
use crate::reranker::{
    AiReranker, ExcludeFactor, ExcludeSet, Item, MathReranker, RankedResult, RerankMode, Reranker,
};

/// Body of `POST /rerank`, as sent by the caller.
///
/// Fields are loosely typed so that shape errors become validation errors
/// with a useful message rather than generic decode failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RerankMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<f64>,
    #[serde(default)]
    pub exclude_factors: Vec<ExcludeFactor>,
}

impl RerankRequest {
    pub fn new(query: impl Into<String>, items: Vec<Item>) -> Self {
        let items = items
            .into_iter()
            .map(|i| serde_json::json!({ "id": i.id, "content": i.content }))
            .collect();
        Self {
            query: Some(query.into()),
            items: Some(serde_json::Value::Array(items)),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: RerankMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k as f64);
        self
    }

    pub fn with_exclude(mut self, factors: impl IntoIterator<Item = ExcludeFactor>) -> Self {
        self.exclude_factors = factors.into_iter().collect();
        self
    }

    /// Check the request and build clean items.
    ///
    /// Caller-supplied `length` and `finalScore` are dropped here.
    pub fn validate(&self) -> Result<ValidRequest> {
        let query = match self.query.as_deref() {
            Some(q) if !q.is_empty() => q.to_string(),
            _ => return Err(RerankError::validation("query is required")),
        };

        let raw_items = match &self.items {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => return Err(RerankError::validation("items must be an array")),
            None => return Err(RerankError::validation("items is required")),
        };
        if raw_items.is_empty() {
            return Err(RerankError::validation("items must not be empty"));
        }

        let items = raw_items
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let field = |name: &str| {
                    raw.get(name)
                        .and_then(serde_json::Value::as_str)
                        .filter(|s| !s.is_empty())
                };
                match (field("id"), field("content")) {
                    (Some(id), Some(content)) => Ok(Item::new(id, content)),
                    _ => Err(RerankError::validation(format!(
                        "items[{index}] needs a non-empty string id and content"
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let top_k = self
            .top_k
            .filter(|k| k.is_finite() && *k >= 1.0)
            .map(|k| k.floor() as usize);

        Ok(ValidRequest {
            query,
            items,
            mode: self.mode.unwrap_or_default(),
            top_k,
            exclude: self.exclude_factors.iter().copied().collect(),
        })
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRequest {
    pub query: String,
    pub items: Vec<Item>,
    pub mode: RerankMode,
    /// Positive truncation length, if any.
    pub top_k: Option<usize>,
    pub exclude: ExcludeSet,
}

/// Body of a successful `POST /rerank`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResponse {
    pub items: Vec<Item>,
    pub method: RerankMode,
    pub cached: bool,
}

impl From<RankedResult> for RerankResponse {
    fn from(result: RankedResult) -> Self {
        Self {
            items: result.items,
            method: result.method,
            cached: result.cached,
        }
    }
}

/// Long-lived orchestrator shared by all request handlers.
pub struct RerankService {
    math: Arc<MathReranker>,
    ai: Option<AiReranker>,
    cache: ResultCache,
    keys: KeyDeriver,
}

impl RerankService {
    pub fn new(math: Arc<MathReranker>, cache: ResultCache) -> Self {
        Self {
            math,
            ai: None,
            cache,
            keys: KeyDeriver::default(),
        }
    }

    /// Enable AI mode through the given reranker.
    pub fn with_ai(mut self, ai: AiReranker) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_key_deriver(mut self, keys: KeyDeriver) -> Self {
        self.keys = keys;
        self
    }

    /// Wire the service from configuration.
    ///
    /// `capability` is only used when `[inference] enabled = true`.
    pub fn from_config(
        config: &ServiceConfig,
        store: Arc<dyn KeyValueStore>,
        capability: Option<Arc<dyn InferenceCapability>>,
    ) -> Self {
        let math = Arc::new(MathReranker::from_config(&config.scoring));
        let cache = ResultCache::from_config(store, &config.cache);
        let mut service = Self::new(Arc::clone(&math), cache).with_key_deriver(KeyDeriver::new(
            config.cache.namespace.clone(),
            config.cache.key_hex_len,
        ));

        if config.inference.enabled {
            if let Some(capability) = capability {
                service = service.with_ai(
                    AiReranker::new(capability, math)
                        .with_model(config.inference.model.clone())
                        .with_timeout(Duration::from_millis(config.inference.timeout_ms)),
                );
            }
        }
        service
    }

    /// Whether AI mode reaches a neural backend.
    pub fn ai_enabled(&self) -> bool {
        self.ai.is_some()
    }

    pub fn math(&self) -> &MathReranker {
        &self.math
    }

    /// Validate, then rank through the cache.
    pub async fn rerank(&self, request: &RerankRequest) -> Result<RerankResponse> {
        let request = request.validate()?;
        self.rerank_valid(&request).await
    }

    /// Rank an already validated request.
    pub async fn rerank_valid(&self, request: &ValidRequest) -> Result<RerankResponse> {
        let started = Instant::now();
        let key = self
            .keys
            .derive(&request.query, &request.items, request.mode, &request.exclude);

        let mut result = match self.cache.get(&key).await {
            Some(hit) => hit,
            None => {
                let computed = self.compute(request).await?;
                self.cache.put(&key, &computed).await;
                computed
            }
        };

        let total = result.items.len();
        result.truncate(request.top_k);

        info!(
            key = %key,
            items = total,
            returned = result.items.len(),
            mode = %request.mode,
            method = %result.method,
            cached = result.cached,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rerank complete"
        );

        Ok(result.into())
    }

    async fn compute(&self, request: &ValidRequest) -> Result<RankedResult> {
        let exclude = match (request.mode, &self.ai) {
            (RerankMode::Ai, Some(ai)) => {
                let reranker: &dyn Reranker = ai;
                return reranker
                    .rerank(&request.query, &request.items, &request.exclude)
                    .await;
            }
            (RerankMode::Math, _) => request.exclude.clone(),
            (RerankMode::Ai, None) => {
                warn!(
                    target: "edgequake_rerank::fallback",
                    reason = "no inference capability configured",
                    "neural rerank unavailable, falling back to math"
                );
                ExcludeSet::none()
            }
        };

        let ranked = Arc::clone(&self.math)
            .rank_blocking(request.query.clone(), request.items.clone(), exclude)
            .await?;
        Ok(RankedResult::new(ranked, RerankMode::Math))
    }
}
