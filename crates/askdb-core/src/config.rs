//! Retrieval tunables, loaded via Figment.
//!
//! Merges `config.toml` + `config.<env>.toml` + `APP_*` env vars and extracts
//! the `[retrieval]` table into a typed struct. Every field has a default so
//! a missing file means default behavior, not an error.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Weight of the normalized lexical score in the fused score.
    pub lexical_weight: f32,
    /// Weight of the normalized dense score in the fused score.
    pub dense_weight: f32,
    pub top_m_lexical: usize,
    pub top_m_dense: usize,
    /// Candidate cap for plain queries.
    pub top_k: usize,
    /// Candidate cap for synthesis queries.
    pub top_k_synthesis: usize,
    pub rerank_batch_size: usize,
    /// Bound on concurrent per-collection fetches.
    pub pool_size: usize,
    pub collection_timeout_ms: u64,
    pub exact_ttl_secs: u64,
    pub semantic_ttl_secs: u64,
    /// Minimum cosine similarity for a semantic cache hit.
    pub semantic_threshold: f32,
    pub context_char_budget: usize,
    pub min_unique_sources: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            lexical_weight: 0.3,
            dense_weight: 0.7,
            top_m_lexical: 20,
            top_m_dense: 20,
            top_k: 20,
            top_k_synthesis: 30,
            rerank_batch_size: 16,
            pool_size: 5,
            collection_timeout_ms: 4000,
            exact_ttl_secs: 900,
            semantic_ttl_secs: 900,
            semantic_threshold: 0.90,
            context_char_budget: 8000,
            min_unique_sources: 3,
        }
    }
}

impl RetrievalConfig {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        if figment.find_value("retrieval").is_err() {
            return Ok(Self::default());
        }
        figment
            .extract_inner("retrieval")
            .map_err(|e| anyhow::anyhow!("Invalid [retrieval] config: {}", e))
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_millis(self.collection_timeout_ms)
    }

    pub fn exact_ttl(&self) -> Duration {
        Duration::from_secs(self.exact_ttl_secs)
    }

    pub fn semantic_ttl(&self) -> Duration {
        Duration::from_secs(self.semantic_ttl_secs)
    }

    /// Candidate cap for a request, by query kind.
    pub fn top_k_for(&self, is_synthesis: bool) -> usize {
        if is_synthesis { self.top_k_synthesis } else { self.top_k }
    }
}
