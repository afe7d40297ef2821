//! Neural reranking capability.
//!
//! The engine only needs one operation from a neural backend:
//! `run(model, {query, contexts, top_k?}) -> {response: [{id, score}]}`.
//!
//! ```ascii
//! ┌──────────────┐  InferenceRequest  ┌─────────────────────┐
//! │  AiReranker  │ ─────────────────► │ InferenceCapability │
//! └──────────────┘   serde_json::Value└──────────┬──────────┘
//!                                                │
//!                           ┌────────────────────┴──────────┐
//!                           ▼                               ▼
//!                   ┌───────────────┐               ┌───────────────┐
//!                   │ HttpInference │               │ MockInference │
//!                   │ (reqwest)     │               │ (scripted)    │
//!                   └───────────────┘               └───────────────┘
//! ```
//!
//! Response validation is the caller's job: a capability hands back the raw
//! JSON body and only fails on transport or status errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::InferenceConfig;
use crate::error::{RerankError, Result};

/// One passage handed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceContext {
    pub text: String,
}

/// Payload of a neural rerank call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub query: String,
    pub contexts: Vec<InferenceContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
}

impl InferenceRequest {
    /// Build a request with one context per text, in order.
    pub fn new<I, S>(query: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: query.into(),
            contexts: texts
                .into_iter()
                .map(|t| InferenceContext { text: t.into() })
                .collect(),
            top_k: None,
        }
    }

    /// Ask the model for at most `top_k` results.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// An opaque neural reranking backend.
#[async_trait]
pub trait InferenceCapability: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Run `model` over the request and return the raw response body.
    async fn run(&self, model: &str, request: &InferenceRequest) -> Result<serde_json::Value>;
}

/// Inference over HTTP: `POST {base_url}/{model}` with bearer auth.
///
/// One attempt per call, bounded by the client timeout. Both a bare
/// `{"response": [...]}` body and an enveloped
/// `{"result": {"response": [...]}}` body are accepted; the envelope is
/// stripped before returning.
#[derive(Debug, Clone)]
pub struct HttpInference {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpInference {
    /// Create a client for `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RerankError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Create a client from the `[inference]` section, reading the API key
    /// from the configured environment variable.
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        Self::new(
            config.base_url.clone(),
            api_key,
            Duration::from_millis(config.timeout_ms),
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model.trim_start_matches('/'))
    }

    fn unwrap_envelope(body: serde_json::Value) -> serde_json::Value {
        match body {
            serde_json::Value::Object(mut map)
                if !map.contains_key("response")
                    && map.get("result").is_some_and(|r| r.get("response").is_some()) =>
            {
                map.remove("result").unwrap_or(serde_json::Value::Null)
            }
            other => other,
        }
    }
}

#[async_trait]
impl InferenceCapability for HttpInference {
    fn name(&self) -> &str {
        "http"
    }

    async fn run(&self, model: &str, request: &InferenceRequest) -> Result<serde_json::Value> {
        let url = self.endpoint(model);
        debug!(url = %url, contexts = request.contexts.len(), "neural rerank request");

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");
        if let Some(ref api_key) = self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RerankError::Upstream(format!(
                "inference API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RerankError::Upstream(format!("failed to parse inference response: {e}")))?;

        Ok(Self::unwrap_envelope(body))
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Respond(serde_json::Value),
    Fail(String),
    Hang(Duration),
}

/// Scripted inference backend for tests.
///
/// Outcomes are consumed in FIFO order. An empty queue fails the call.
#[derive(Debug, Clone, Default)]
pub struct MockInference {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<InferenceRequest>>>,
    call_count: Arc<AtomicUsize>,
}

impl MockInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response body.
    pub async fn add_response(&self, body: serde_json::Value) {
        self.script.lock().await.push_back(Scripted::Respond(body));
    }

    /// Queue a well-formed `{response: [{id, score}]}` body.
    pub async fn add_scores(&self, scores: &[(usize, f64)]) {
        let response: Vec<serde_json::Value> = scores
            .iter()
            .map(|(id, score)| serde_json::json!({ "id": id, "score": score }))
            .collect();
        self.add_response(serde_json::json!({ "response": response }))
            .await;
    }

    /// Queue a failure.
    pub async fn add_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Fail(message.into()));
    }

    /// Queue a call that sleeps before failing.
    pub async fn add_hang(&self, duration: Duration) {
        self.script.lock().await.push_back(Scripted::Hang(duration));
    }

    /// Number of `run` calls so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// The most recent request received.
    pub async fn last_request(&self) -> Option<InferenceRequest> {
        self.requests.lock().await.last().cloned()
    }
}

#[async_trait]
impl InferenceCapability for MockInference {
    fn name(&self) -> &str {
        "mock"
    }

    async fn run(&self, _model: &str, request: &InferenceRequest) -> Result<serde_json::Value> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        let next = self.script.lock().await.pop_front();
        match next {
            Some(Scripted::Respond(body)) => Ok(body),
            Some(Scripted::Fail(message)) => Err(RerankError::Upstream(message)),
            Some(Scripted::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                Err(RerankError::Timeout)
            }
            None => Err(RerankError::Upstream("no scripted response".to_string())),
        }
    }
}
