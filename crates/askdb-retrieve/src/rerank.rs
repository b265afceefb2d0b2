//! Cross-encoder reranking with a fused-order fallback.

use std::collections::HashMap;
use std::sync::Arc;

use askdb_core::config::RetrievalConfig;
use askdb_core::traits::CrossEncoder;
use askdb_core::types::{fused_ordering, ChunkId, RetrievalCandidate};

pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
    batch_size: usize,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>, cfg: &RetrievalConfig) -> Self {
        Self { encoder, batch_size: cfg.rerank_batch_size.max(1) }
    }

    /// Rescore candidates against the ORIGINAL query (variants widened
    /// recall; the user's own words decide final order) and re-sort.
    ///
    /// Any encoder failure falls back to fused-score order. That is a
    /// required degraded path: reranking is an accuracy refinement, never a
    /// reason to fail the request.
    pub async fn rerank(
        &self,
        original_query: &str,
        candidates: &mut Vec<RetrievalCandidate>,
        texts: &HashMap<ChunkId, String>,
    ) {
        candidates.sort_by(fused_ordering);
        if candidates.is_empty() {
            return;
        }

        let scored: Vec<(usize, String)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(i, c)| texts.get(&c.chunk_id).map(|t| (i, t.clone())))
            .collect();

        let mut scores: Vec<(usize, f32)> = Vec::with_capacity(scored.len());
        for batch in scored.chunks(self.batch_size) {
            let batch_texts: Vec<String> = batch.iter().map(|(_, t)| t.clone()).collect();
            match self.encoder.score_pairs(original_query, &batch_texts).await {
                Ok(batch_scores) if batch_scores.len() == batch.len() => {
                    scores.extend(batch.iter().map(|(i, _)| *i).zip(batch_scores));
                }
                Ok(batch_scores) => {
                    tracing::warn!(
                        "Cross-encoder returned {} scores for {} pairs, using fused order",
                        batch_scores.len(),
                        batch.len()
                    );
                    self.fall_back(candidates);
                    return;
                }
                Err(e) => {
                    tracing::warn!("Cross-encoder failed, using fused order: {}", e);
                    self.fall_back(candidates);
                    return;
                }
            }
        }

        for (i, score) in scores {
            candidates[i].rerank_score = Some(score);
        }
        candidates.sort_by(rerank_ordering);
    }

    fn fall_back(&self, candidates: &mut [RetrievalCandidate]) {
        for c in candidates.iter_mut() {
            c.rerank_score = None;
        }
        candidates.sort_by(fused_ordering);
    }
}

/// Rerank-score order when both candidates were scored; fused order otherwise.
fn rerank_ordering(a: &RetrievalCandidate, b: &RetrievalCandidate) -> std::cmp::Ordering {
    match (a.rerank_score, b.rerank_score) {
        (Some(x), Some(y)) => y
            .partial_cmp(&x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| fused_ordering(a, b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => fused_ordering(a, b),
    }
}
