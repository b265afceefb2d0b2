//! The query engine: one façade owning the collaborators, the cache layer,
//! and the retrieval components.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use askdb_cache::CacheLayer;
use askdb_core::config::RetrievalConfig;
use askdb_core::error::{Error, Result};
use askdb_core::traits::{
    CrossEncoder, EmbeddingProvider, LexicalIndex, PersistentCacheStore, VectorStore,
};
use askdb_core::types::{
    AnswerPayload, CacheHit, ChunkId, CollectionInfo, CollectionScope, DocumentChunk, QueryAnswer,
    QueryRecord, RetrievalCandidate,
};
use askdb_query::{classify, generate, normalize_query};
use askdb_retrieve::{assemble, resolve_targets, CollectionRouter, HybridRetriever, Reranker};

pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    retriever: HybridRetriever,
    router: CollectionRouter,
    reranker: Reranker,
    cache: CacheLayer,
    collections: Vec<CollectionInfo>,
    cfg: RetrievalConfig,
}

impl QueryEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        lexical: Arc<dyn LexicalIndex>,
        vectors: Arc<dyn VectorStore>,
        encoder: Arc<dyn CrossEncoder>,
        persistent_cache: Option<Arc<dyn PersistentCacheStore>>,
        collections: Vec<CollectionInfo>,
        cfg: RetrievalConfig,
    ) -> Self {
        let retriever = HybridRetriever::new(lexical, Arc::clone(&vectors), &cfg);
        let router = CollectionRouter::new(&cfg);
        let reranker = Reranker::new(encoder, &cfg);
        let cache = CacheLayer::new(
            cfg.exact_ttl(),
            cfg.semantic_ttl(),
            cfg.semantic_threshold,
            persistent_cache,
        );
        Self { embedder, vectors, retriever, router, reranker, cache, collections, cfg }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Run the full pipeline for one query.
    ///
    /// Returns assembled evidence, never generated prose. `EmptyQuery` is the
    /// only pre-validation error; collaborator trouble is degraded internally
    /// and surfaces as `RetrievalFailed` only when no retrieval path across
    /// the targeted collections produced anything.
    pub async fn answer_query(
        &self,
        query: &str,
        scope: CollectionScope,
        synthesis_override: Option<bool>,
    ) -> Result<QueryAnswer> {
        let raw_query = query.trim();
        if raw_query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let normalized_query = normalize_query(raw_query);
        let target_collections = resolve_targets(&scope, &self.collections);
        if target_collections.is_empty() {
            tracing::warn!("No available collection matches scope {:?}", scope);
            return Err(Error::RetrievalFailed);
        }

        // Tier 1: exact. A hit costs no collaborator call at all.
        if let Some(payload) = self.cache.lookup_exact(&normalized_query, &target_collections).await
        {
            return Ok(QueryAnswer::from_payload(payload, CacheHit::Exact));
        }

        // Tier 2: semantic, reusing this embedding later for variant 0.
        let query_embedding = match self.embedder.embed(raw_query).await {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Embedding provider unavailable, lexical-only retrieval: {}", e);
                None
            }
        };
        if let Some(embedding) = &query_embedding {
            if let Some(m) = self.cache.lookup_semantic(embedding) {
                return Ok(QueryAnswer::from_payload(
                    m.payload,
                    CacheHit::Semantic { similarity: m.similarity },
                ));
            }
        }

        let classification = classify(raw_query);
        let is_synthesis = synthesis_override.unwrap_or(classification.is_synthesis);
        let record = QueryRecord {
            raw_query: raw_query.to_string(),
            normalized_query,
            is_synthesis,
            query_variants: generate(raw_query, is_synthesis),
            target_collections,
        };
        tracing::debug!(
            "Query runs {} variant(s) over {} collection(s) (synthesis: {}, signals: {:?})",
            record.query_variants.len(),
            record.target_collections.len(),
            record.is_synthesis,
            classification.signals
        );

        let variant_vectors = self.embed_variants(&record.query_variants, &query_embedding).await;
        let top_k = self.cfg.top_k_for(record.is_synthesis);
        let outcome = self
            .router
            .fan_out(
                &self.retriever,
                &record.query_variants,
                variant_vectors.as_deref(),
                &record.target_collections,
                top_k,
            )
            .await;

        let mut warnings = outcome.skipped;
        let mut candidates = outcome.candidates;
        candidates.truncate(top_k);
        if candidates.is_empty() {
            return Err(Error::RetrievalFailed);
        }

        let chunks = self.fetch_chunks(&candidates).await;
        candidates.retain(|c| chunks.contains_key(&c.chunk_id));
        if candidates.is_empty() {
            return Err(Error::RetrievalFailed);
        }

        let texts: HashMap<ChunkId, String> =
            chunks.iter().map(|(id, c)| (id.clone(), c.text.clone())).collect();
        self.reranker.rerank(&record.raw_query, &mut candidates, &texts).await;

        let assembled = assemble(
            &candidates,
            &chunks,
            self.cfg.context_char_budget,
            record.is_synthesis,
            self.cfg.min_unique_sources,
        );
        if let Some(w) = assembled.warning {
            warnings.push(w);
        }

        let payload = AnswerPayload {
            context_text: assembled.context_text,
            source_manifest: assembled.source_manifest,
            warnings,
        };
        self.cache
            .store(
                &record.normalized_query,
                &record.target_collections,
                &record.raw_query,
                query_embedding,
                &payload,
            )
            .await;
        Ok(QueryAnswer::from_payload(payload, CacheHit::None))
    }

    /// Embed all variants, reusing the already computed query embedding for
    /// variant 0. Returns None when the provider is down; retrieval then
    /// degrades to lexical-only.
    async fn embed_variants(
        &self,
        variants: &[String],
        query_embedding: &Option<Vec<f32>>,
    ) -> Option<Vec<Vec<f32>>> {
        let first = query_embedding.as_ref()?.clone();
        if variants.len() == 1 {
            return Some(vec![first]);
        }
        match self.embedder.embed_batch(&variants[1..]).await {
            Ok(rest) => {
                let mut all = Vec::with_capacity(variants.len());
                all.push(first);
                all.extend(rest);
                Some(all)
            }
            Err(e) => {
                tracing::warn!("Variant embedding failed, lexical-only retrieval: {}", e);
                None
            }
        }
    }

    async fn fetch_chunks(
        &self,
        candidates: &[RetrievalCandidate],
    ) -> HashMap<ChunkId, DocumentChunk> {
        let mut by_collection: BTreeMap<&str, Vec<ChunkId>> = BTreeMap::new();
        for c in candidates {
            by_collection
                .entry(c.source_collection_id.as_str())
                .or_default()
                .push(c.chunk_id.clone());
        }
        let mut out = HashMap::new();
        for (collection_id, ids) in by_collection {
            match self.vectors.get_by_ids(collection_id, &ids).await {
                Ok(fetched) => {
                    for chunk in fetched {
                        out.insert(chunk.chunk_id.clone(), chunk);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Dropping {} candidate(s) from {}: chunk fetch failed: {}",
                        ids.len(),
                        collection_id,
                        e
                    );
                }
            }
        }
        out
    }
}
