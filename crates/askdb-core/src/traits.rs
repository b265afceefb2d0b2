//! Collaborator contracts consumed by the pipeline.
//!
//! Everything behind these traits is an external system: embedding inference,
//! the lexical index, the vector store, the cross-encoder, and the optional
//! persistent cache backend. The pipeline never reaches past them.

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{ChunkId, DocumentChunk};

/// Text embedding service. Must be deterministic per input text and return
/// vectors of `dim()` length.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// BM25-style keyword index, one logical index per collection.
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    async fn search(
        &self,
        collection_id: &str,
        query_text: &str,
        top_n: usize,
    ) -> anyhow::Result<Vec<(ChunkId, f32)>>;
}

/// Nearest-neighbor store over chunk embeddings, one table per collection.
/// Also the canonical path for fetching chunk bodies by id.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(
        &self,
        collection_id: &str,
        query_vector: &[f32],
        top_n: usize,
    ) -> anyhow::Result<Vec<(ChunkId, f32)>>;

    async fn get_by_ids(
        &self,
        collection_id: &str,
        ids: &[ChunkId],
    ) -> anyhow::Result<Vec<DocumentChunk>>;
}

/// Cross-attention reranking model. Scores are returned in input order.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    async fn score_pairs(&self, query_text: &str, texts: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// Optional external cache backend. The cache layer degrades to memory-only
/// when any of these calls fail.
#[async_trait]
pub trait PersistentCacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}
