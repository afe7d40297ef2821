//! Cache key derivation.
//!
//! ```ascii
//! canonical = JSON [ query, [[id, content], ...], mode, [sorted excludes] ]
//! key       = namespace + hex(sha256(canonical))[..hex_len]
//! ```
//!
//! Item order and exact content are part of the key. Exclude factors are a
//! set, so their order and duplicates are not. JSON encoding keeps field
//! boundaries unambiguous: `("a:b", "c")` and `("a", "b:c")` never collide.

use sha2::{Digest, Sha256};

use crate::reranker::{ExcludeSet, Item, RerankMode};

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "rerank:";

/// Default number of hex digest characters kept.
pub const DEFAULT_KEY_HEX_LEN: usize = 32;

/// Builds cache keys with a fixed namespace and digest length.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    namespace: String,
    hex_len: usize,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_KEY_HEX_LEN)
    }
}

impl KeyDeriver {
    /// `hex_len` is clamped to the 64 characters of a SHA-256 digest.
    pub fn new(namespace: impl Into<String>, hex_len: usize) -> Self {
        Self {
            namespace: namespace.into(),
            hex_len: hex_len.clamp(1, 64),
        }
    }

    pub fn derive(
        &self,
        query: &str,
        items: &[Item],
        mode: RerankMode,
        exclude: &ExcludeSet,
    ) -> String {
        let canonical = canonical_form(query, items, mode, exclude);
        let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
        format!("{}{}", self.namespace, &digest[..self.hex_len])
    }
}

/// Key with the default namespace and length.
pub fn derive_key(query: &str, items: &[Item], mode: RerankMode, exclude: &ExcludeSet) -> String {
    KeyDeriver::default().derive(query, items, mode, exclude)
}

fn canonical_form(query: &str, items: &[Item], mode: RerankMode, exclude: &ExcludeSet) -> String {
    let pairs: Vec<[&str; 2]> = items
        .iter()
        .map(|i| [i.id.as_str(), i.content.as_str()])
        .collect();
    serde_json::json!([query, pairs, mode.as_str(), exclude.sorted_names()]).to_string()
}
