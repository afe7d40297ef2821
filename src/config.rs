//! Service configuration.
//!
//! # Configuration File Location
//!
//! The config file is loaded from (in order of priority):
//! 1. `RERANKER_CONFIG` environment variable
//! 2. `./reranker.toml` (current working directory)
//! 3. `~/.edgequake/reranker.toml` (user config)
//! 4. Built-in defaults
//!
//! `RERANKER_HOST` and `RERANKER_PORT` override the server section afterwards.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8787
//!
//! [cache]
//! ttl_secs = 3600
//! max_entries = 10000
//!
//! [inference]
//! enabled = true
//! base_url = "https://api.example.com/ai/run"
//! model = "@cf/baai/bge-reranker-base"
//! api_key_env = "RERANKER_AI_API_KEY"
//!
//! [scoring]
//! recency_default = 0.7
//! max_fuzzy_terms = 32
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RerankError, Result};

// ============================================================================
// Sections
// ============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8787,
            cors_enabled: true,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Lifetime of a cached result.
    pub ttl_secs: u64,
    /// Capacity of the in-memory store.
    pub max_entries: usize,
    /// Prefix of every cache key.
    pub namespace: String,
    /// Digest hex characters kept in a key.
    pub key_hex_len: usize,
    /// Upper bound on one store call.
    pub timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            max_entries: 10_000,
            namespace: crate::fingerprint::DEFAULT_NAMESPACE.to_string(),
            key_hex_len: crate::fingerprint::DEFAULT_KEY_HEX_LEN,
            timeout_ms: 500,
        }
    }
}

/// Neural inference settings. Disabled by default; AI requests then run math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub enabled: bool,
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    pub timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: crate::reranker::DEFAULT_MODEL.to_string(),
            base_url: String::new(),
            api_key_env: "RERANKER_AI_API_KEY".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Math engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Year recency is measured against. Current UTC year when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_year: Option<i32>,
    /// Recency for content mentioning no year.
    pub recency_default: f64,
    /// Fuzzy edit budget as a fraction of term length.
    pub fuzzy_distance_ratio: f64,
    /// Distinct query terms fuzzy-matched per request; the rest are ignored.
    pub max_fuzzy_terms: usize,
    /// Inputs longer than this skip accent folding and lexicon tagging.
    pub max_tokenize_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            reference_year: None,
            recency_default: crate::scoring::DEFAULT_RECENCY,
            fuzzy_distance_ratio: crate::scoring::DEFAULT_DISTANCE_RATIO,
            max_fuzzy_terms: crate::scoring::DEFAULT_MAX_QUERY_TERMS,
            max_tokenize_chars: 200_000,
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub inference: InferenceConfig,
    pub scoring: ScoringConfig,
}

impl ServiceConfig {
    /// Load configuration from the default location, then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        if let Ok(path) = std::env::var("RERANKER_CONFIG") {
            if Path::new(&path).exists() {
                return Self::from_file(&path);
            }
        }

        let local_path = Path::new("reranker.toml");
        if local_path.exists() {
            return Self::from_file(local_path);
        }

        if let Some(home) = dirs::home_dir() {
            let user_path = home.join(".edgequake").join("reranker.toml");
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        Ok(Self::default())
    }

    /// Apply `RERANKER_HOST` / `RERANKER_PORT`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("RERANKER_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("RERANKER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| RerankError::Config(format!("RERANKER_PORT is not a port: '{port}'")))?;
        }
        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RerankError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| RerankError::Config(e.to_string()))
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RerankError::Config(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(RerankError::Config("server.port must be non-zero".to_string()));
        }
        if self.cache.ttl_secs == 0 {
            return Err(RerankError::Config("cache.ttl_secs must be non-zero".to_string()));
        }
        if !(16..=64).contains(&self.cache.key_hex_len) {
            return Err(RerankError::Config(format!(
                "cache.key_hex_len must be within 16..=64, got {}",
                self.cache.key_hex_len
            )));
        }
        let ratio = self.scoring.fuzzy_distance_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(RerankError::Config(format!(
                "scoring.fuzzy_distance_ratio must be within (0, 1], got {ratio}"
            )));
        }
        if self.scoring.max_fuzzy_terms == 0 {
            return Err(RerankError::Config(
                "scoring.max_fuzzy_terms must be non-zero".to_string(),
            ));
        }
        if self.inference.enabled && self.inference.base_url.trim().is_empty() {
            return Err(RerankError::Config(
                "inference.base_url is required when inference is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
