//! Neural reranking with silent fallback to the math engine.
//!
//! # State machine
//!
//! ```ascii
//!   ┌────────┐  Ok(valid ranking)  ┌──────────────┐
//!   │ TryAi  │ ──────────────────► │ Done("ai")   │
//!   └───┬────┘                     └──────────────┘
//!       │ error | timeout | malformed
//!       ▼
//!   ┌────────┐                     ┌──────────────┐
//!   │  Math  │ ──────────────────► │ Done("math") │
//!   └────────┘  no exclusions      └──────────────┘
//! ```
//!
//! The transition is logged under the `edgequake_rerank::fallback` target
//! and never surfaces as an error.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::item::{ExcludeSet, Item, RerankMode};
use super::math::{sort_by_score, MathReranker};
use super::result::RankedResult;
use super::traits::Reranker;
use crate::error::{RerankError, Result};
use crate::inference::{InferenceCapability, InferenceRequest};

/// Default model id.
pub const DEFAULT_MODEL: &str = "@cf/baai/bge-reranker-base";

#[derive(Debug, Deserialize)]
struct ModelResponse {
    response: Vec<ModelScore>,
}

#[derive(Debug, Deserialize)]
struct ModelScore {
    id: usize,
    score: f64,
}

enum Attempt {
    TryAi,
    Math(RerankError),
}

/// Reranker delegating to an [`InferenceCapability`].
pub struct AiReranker {
    capability: Arc<dyn InferenceCapability>,
    model: String,
    fallback: Arc<MathReranker>,
    timeout: Duration,
}

impl AiReranker {
    pub fn new(capability: Arc<dyn InferenceCapability>, fallback: Arc<MathReranker>) -> Self {
        Self {
            capability,
            model: DEFAULT_MODEL.to_string(),
            fallback,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Upper bound on one inference call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Rank with the model, asking it for at most `top_k` results.
    ///
    /// `top_k` is clamped to the item count. When a `top_k` is sent the
    /// model may return fewer entries than items, and only those are kept.
    ///
    /// Model failures never surface here; the only error is a math fallback
    /// task that could not complete.
    pub async fn rerank_top_k(
        &self,
        query: &str,
        items: &[Item],
        top_k: Option<usize>,
    ) -> Result<RankedResult> {
        if items.is_empty() {
            return Ok(RankedResult::new(Vec::new(), RerankMode::Ai));
        }
        let top_k = top_k.map(|k| k.min(items.len()));

        let mut state = Attempt::TryAi;
        loop {
            match state {
                Attempt::TryAi => match self.try_model(query, items, top_k).await {
                    Ok(ranked) => {
                        debug!(model = %self.model, items = ranked.len(), "neural rerank succeeded");
                        return Ok(RankedResult::new(ranked, RerankMode::Ai));
                    }
                    Err(e) => state = Attempt::Math(e),
                },
                Attempt::Math(reason) => {
                    warn!(
                        target: "edgequake_rerank::fallback",
                        model = %self.model,
                        capability = self.capability.name(),
                        reason = %reason,
                        "neural rerank failed, falling back to math"
                    );
                    let ranked = Arc::clone(&self.fallback)
                        .rank_blocking(query.to_string(), items.to_vec(), ExcludeSet::none())
                        .await?;
                    return Ok(RankedResult::new(ranked, RerankMode::Math));
                }
            }
        }
    }

    async fn try_model(
        &self,
        query: &str,
        items: &[Item],
        top_k: Option<usize>,
    ) -> Result<Vec<Item>> {
        let mut request = InferenceRequest::new(query, items.iter().map(|i| i.content.clone()));
        if let Some(k) = top_k {
            request = request.with_top_k(k);
        }

        let body = tokio::time::timeout(self.timeout, self.capability.run(&self.model, &request))
            .await??;

        // Entries come back in input order, so the stable sort breaks ties by it.
        let scores = parse_response(body, items.len(), top_k.is_some())?;

        let mut ranked: Vec<Item> = scores
            .into_iter()
            .map(|s| {
                let source = &items[s.id];
                let mut out = source.stripped();
                out.length = Some(source.content.chars().count());
                out.final_score = Some(s.score);
                out
            })
            .collect();

        sort_by_score(&mut ranked);
        Ok(ranked)
    }
}

/// Validate a model response against the input size.
///
/// Malformed: not `{response: [...]}`, an empty array, an id out of range,
/// a repeated id, a non-finite score, or (when no `top_k` was requested)
/// fewer entries than items.
fn parse_response(body: serde_json::Value, items: usize, partial_ok: bool) -> Result<Vec<ModelScore>> {
    let parsed: ModelResponse = serde_json::from_value(body)
        .map_err(|e| RerankError::Upstream(format!("malformed model response: {e}")))?;

    if parsed.response.is_empty() {
        return Err(RerankError::Upstream("empty model response".to_string()));
    }

    let mut seen = HashSet::with_capacity(parsed.response.len());
    for entry in &parsed.response {
        if entry.id >= items {
            return Err(RerankError::Upstream(format!(
                "model returned id {} for {} items",
                entry.id, items
            )));
        }
        if !seen.insert(entry.id) {
            return Err(RerankError::Upstream(format!("model repeated id {}", entry.id)));
        }
        if !entry.score.is_finite() {
            return Err(RerankError::Upstream(format!(
                "model returned non-finite score for id {}",
                entry.id
            )));
        }
    }

    if !partial_ok && seen.len() != items {
        return Err(RerankError::Upstream(format!(
            "model ranked {} of {} items",
            seen.len(),
            items
        )));
    }

    let mut scores = parsed.response;
    scores.sort_by_key(|s| s.id);
    Ok(scores)
}

#[async_trait]
impl Reranker for AiReranker {
    fn name(&self) -> &str {
        "ai"
    }

    /// Exclusions do not apply to the model; the fallback path ignores them too.
    async fn rerank(
        &self,
        query: &str,
        items: &[Item],
        _exclude: &ExcludeSet,
    ) -> Result<RankedResult> {
        self.rerank_top_k(query, items, None).await
    }
}
