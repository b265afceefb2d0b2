//! Collection routing and bounded parallel fan-out.
//!
//! Single-collection scope is a pass-through. All-collections scope runs the
//! same variants against every collection concurrently, bounded by the pool
//! size, with a per-collection timeout. A collection that errors or times out
//! is skipped with a warning; the remaining collections still answer.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use askdb_core::config::RetrievalConfig;
use askdb_core::error::Error;
use askdb_core::types::{
    fused_ordering, ChunkId, CollectionId, CollectionInfo, CollectionScope, RetrievalCandidate,
};

use crate::hybrid::HybridRetriever;

pub fn resolve_targets(scope: &CollectionScope, available: &[CollectionInfo]) -> Vec<CollectionId> {
    match scope {
        CollectionScope::Single(id) => available
            .iter()
            .filter(|c| &c.collection_id == id)
            .map(|c| c.collection_id.clone())
            .collect(),
        CollectionScope::All => available.iter().map(|c| c.collection_id.clone()).collect(),
    }
}

pub struct FanOutOutcome {
    /// Candidates from all surviving collections, merged and fused-ordered.
    pub candidates: Vec<RetrievalCandidate>,
    /// One warning per skipped collection.
    pub skipped: Vec<String>,
    pub attempted: usize,
}

pub struct CollectionRouter {
    pool_size: usize,
    timeout: Duration,
}

impl CollectionRouter {
    pub fn new(cfg: &RetrievalConfig) -> Self {
        Self { pool_size: cfg.pool_size.max(1), timeout: cfg.collection_timeout() }
    }

    pub async fn fan_out(
        &self,
        retriever: &HybridRetriever,
        variants: &[String],
        variant_vectors: Option<&[Vec<f32>]>,
        targets: &[CollectionId],
        top_k: usize,
    ) -> FanOutOutcome {
        let fetches = stream::iter(targets.iter().map(|cid| {
            let cid = cid.clone();
            async move {
                let result = tokio::time::timeout(
                    self.timeout,
                    retriever.retrieve(variants, variant_vectors, &cid, top_k),
                )
                .await;
                (cid, result)
            }
        }))
        .buffer_unordered(self.pool_size)
        .collect::<Vec<_>>()
        .await;

        let mut candidates: Vec<RetrievalCandidate> = Vec::new();
        let mut skipped = Vec::new();
        for (cid, result) in fetches {
            match result {
                Ok(Ok(found)) => {
                    tracing::debug!("Collection {} contributed {} candidates", cid, found.len());
                    candidates.extend(found);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Skipping collection {}: {}", cid, e);
                    skipped.push(format!("Skipped collection {}: {}", cid, e));
                }
                Err(_) => {
                    let e = Error::Timeout(format!("collection {}", cid));
                    tracing::warn!("Skipping collection {}: {}", cid, e);
                    skipped.push(format!("Skipped collection {}: {}", cid, e));
                }
            }
        }
        skipped.sort();

        let candidates = merge_across_collections(candidates);
        FanOutOutcome { candidates, skipped, attempted: targets.len() }
    }
}

/// Concatenate per-collection results, deduplicating by chunk id (max fused
/// score wins, contributing variants union) and restoring deterministic
/// order regardless of fan-out completion order.
fn merge_across_collections(candidates: Vec<RetrievalCandidate>) -> Vec<RetrievalCandidate> {
    let mut by_id: HashMap<ChunkId, RetrievalCandidate> = HashMap::new();
    for cand in candidates {
        match by_id.get_mut(&cand.chunk_id) {
            Some(existing) => {
                existing.contributing_variants.extend(cand.contributing_variants.iter().copied());
                if cand.fused_score > existing.fused_score {
                    let variants = existing.contributing_variants.clone();
                    *existing = cand;
                    existing.contributing_variants = variants;
                }
            }
            None => {
                by_id.insert(cand.chunk_id.clone(), cand);
            }
        }
    }
    let mut merged: Vec<RetrievalCandidate> = by_id.into_values().collect();
    merged.sort_by(fused_ordering);
    merged
}
