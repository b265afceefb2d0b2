//! askdb-cache
//!
//! Two-tier result cache consulted before any retrieval work: an exact tier
//! keyed by normalized query + collection scope, then a semantic tier matched
//! by query-embedding cosine similarity. Writes happen only after a fully
//! successful pipeline run; both tiers enforce TTL expiry and expose `clear()`.

pub mod exact;
pub mod semantic;

use std::sync::Arc;
use std::time::Duration;

use askdb_core::traits::PersistentCacheStore;
use askdb_core::types::AnswerPayload;

pub use exact::{cache_key, ExactCache};
pub use semantic::{cosine_similarity, ScanIndex, SemanticCache, SemanticIndex, SemanticMatch};

pub struct CacheLayer {
    exact: ExactCache,
    semantic: SemanticCache,
}

impl CacheLayer {
    pub fn new(
        exact_ttl: Duration,
        semantic_ttl: Duration,
        semantic_threshold: f32,
        persistent: Option<Arc<dyn PersistentCacheStore>>,
    ) -> Self {
        Self {
            exact: ExactCache::new(exact_ttl, persistent),
            semantic: SemanticCache::new(semantic_threshold, semantic_ttl),
        }
    }

    pub async fn lookup_exact(
        &self,
        normalized_query: &str,
        collection_ids: &[String],
    ) -> Option<AnswerPayload> {
        let key = cache_key(normalized_query, collection_ids);
        let hit = self.exact.get(&key).await;
        if hit.is_some() {
            tracing::debug!("Exact cache hit for {}", key);
        }
        hit
    }

    pub fn lookup_semantic(&self, query_embedding: &[f32]) -> Option<SemanticMatch> {
        let hit = self.semantic.get(query_embedding);
        if let Some(m) = &hit {
            tracing::debug!(
                "Semantic cache hit (similarity {:.3}) via {:?}",
                m.similarity,
                m.original_query_text
            );
        }
        hit
    }

    /// Record a fully successful answer in both tiers. `query_embedding` is
    /// None when the embedding provider was unavailable for this request, in
    /// which case only the exact tier is written.
    pub async fn store(
        &self,
        normalized_query: &str,
        collection_ids: &[String],
        raw_query: &str,
        query_embedding: Option<Vec<f32>>,
        payload: &AnswerPayload,
    ) {
        let key = cache_key(normalized_query, collection_ids);
        self.exact.put(key, payload.clone()).await;
        if let Some(embedding) = query_embedding {
            self.semantic.put(embedding, raw_query.to_string(), payload.clone());
        }
    }

    pub fn clear(&self) {
        self.exact.clear();
        self.semantic.clear();
    }
}
