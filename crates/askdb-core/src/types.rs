//! Domain types shared by the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type ChunkId = String;
pub type CollectionId = String;
pub type Meta = HashMap<String, String>;

/// A chunk of a source document, produced by the out-of-scope indexing
/// subsystem and read-only here.
///
/// - `chunk_id`: globally unique chunk identifier
/// - `source_file_id`: stable identity of the originating file
/// - `collection_id`: the collection this chunk is indexed under
/// - `position_index`/`total_chunks_in_file`: position within the parent file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: ChunkId,
    pub source_file_id: String,
    pub collection_id: CollectionId,
    pub text: String,
    pub token_count: usize,
    pub position_index: usize,
    pub total_chunks_in_file: usize,
    pub metadata: Meta,
}

/// An independently searchable collection of indexed chunks. External and
/// read-only; the router only needs the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub collection_id: CollectionId,
    pub chunk_count: usize,
    pub last_indexed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-request state assembled before retrieval runs.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub raw_query: String,
    pub normalized_query: String,
    pub is_synthesis: bool,
    pub query_variants: Vec<String>,
    pub target_collections: Vec<CollectionId>,
}

/// One scored chunk flowing through fusion and reranking.
///
/// Candidates are deduplicated by `chunk_id`; `fused_score` is the maximum
/// across the variants that surfaced the chunk, and `contributing_variants`
/// records which variant indices did.
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    pub chunk_id: ChunkId,
    pub lexical_score: f32,
    pub dense_score: f32,
    pub fused_score: f32,
    pub rerank_score: Option<f32>,
    pub contributing_variants: BTreeSet<usize>,
    pub source_collection_id: CollectionId,
}

impl RetrievalCandidate {
    /// Index of the earliest variant that surfaced this chunk. Used as the
    /// first tie-break after the fused score.
    pub fn first_variant(&self) -> usize {
        self.contributing_variants.iter().next().copied().unwrap_or(usize::MAX)
    }
}

/// Deterministic candidate ordering: fused score descending, then earliest
/// contributing variant, then chunk id lexical order.
pub fn fused_ordering(a: &RetrievalCandidate, b: &RetrievalCandidate) -> std::cmp::Ordering {
    b.fused_score
        .partial_cmp(&a.fused_score)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.first_variant().cmp(&b.first_variant()))
        .then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

/// Which cache tier answered the request, if any. Semantic hits carry the
/// cosine similarity that matched them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CacheHit {
    None,
    Exact,
    Semantic { similarity: f32 },
}

/// One distinct source file referenced by the assembled context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_file_id: String,
    pub collection_id: CollectionId,
}

/// The cacheable portion of a successful answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub context_text: String,
    pub source_manifest: Vec<SourceRef>,
    pub warnings: Vec<String>,
}

/// What `answer_query` hands to the chat layer. The final natural-language
/// generation happens elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub context_text: String,
    pub source_manifest: Vec<SourceRef>,
    pub cache_hit: CacheHit,
    pub warnings: Vec<String>,
}

impl QueryAnswer {
    pub fn from_payload(payload: AnswerPayload, cache_hit: CacheHit) -> Self {
        Self {
            context_text: payload.context_text,
            source_manifest: payload.source_manifest,
            cache_hit,
            warnings: payload.warnings,
        }
    }
}

/// Which collections a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionScope {
    Single(CollectionId),
    All,
}
