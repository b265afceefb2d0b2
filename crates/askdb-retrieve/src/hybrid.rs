//! Hybrid lexical + dense retrieval with cross-variant fusion.

use std::collections::HashMap;
use std::sync::Arc;

use askdb_core::config::RetrievalConfig;
use askdb_core::error::{Error, Result};
use askdb_core::traits::{LexicalIndex, VectorStore};
use askdb_core::types::{fused_ordering, ChunkId, RetrievalCandidate};

pub struct HybridRetriever {
    lexical: Arc<dyn LexicalIndex>,
    vectors: Arc<dyn VectorStore>,
    lexical_weight: f32,
    dense_weight: f32,
    top_m_lexical: usize,
    top_m_dense: usize,
}

impl HybridRetriever {
    pub fn new(
        lexical: Arc<dyn LexicalIndex>,
        vectors: Arc<dyn VectorStore>,
        cfg: &RetrievalConfig,
    ) -> Self {
        Self {
            lexical,
            vectors,
            lexical_weight: cfg.lexical_weight,
            dense_weight: cfg.dense_weight,
            top_m_lexical: cfg.top_m_lexical,
            top_m_dense: cfg.top_m_dense,
        }
    }

    /// Run every query variant against one collection and merge the results.
    ///
    /// Each variant gets a lexical pass and (when variant embeddings are
    /// available) a dense pass; the two lists are min-max normalized and
    /// fused per variant. Across variants a chunk keeps its best fused score
    /// and the union of the variant indices that surfaced it, so a chunk
    /// invisible to the literal query can still be rescued by any variant.
    ///
    /// Errors only when every attempted collaborator pass failed; partial
    /// failure degrades to whatever the surviving passes returned.
    pub async fn retrieve(
        &self,
        variants: &[String],
        variant_vectors: Option<&[Vec<f32>]>,
        collection_id: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        let mut merged: HashMap<ChunkId, RetrievalCandidate> = HashMap::new();
        let mut attempted = 0usize;
        let mut failed = 0usize;

        for (vi, variant) in variants.iter().enumerate() {
            attempted += 1;
            let lexical_hits = match self.lexical.search(collection_id, variant, self.top_m_lexical).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!("Lexical pass failed for {} variant {}: {}", collection_id, vi, e);
                    failed += 1;
                    Vec::new()
                }
            };

            let dense_hits = match variant_vectors {
                Some(vecs) => {
                    attempted += 1;
                    match self.vectors.search(collection_id, &vecs[vi], self.top_m_dense).await {
                        Ok(hits) => hits,
                        Err(e) => {
                            tracing::warn!("Dense pass failed for {} variant {}: {}", collection_id, vi, e);
                            failed += 1;
                            Vec::new()
                        }
                    }
                }
                None => Vec::new(),
            };

            self.fuse_variant(vi, &lexical_hits, &dense_hits, collection_id, &mut merged);
        }

        if attempted > 0 && failed == attempted {
            return Err(Error::CollaboratorUnavailable(format!(
                "all search passes failed for collection {}",
                collection_id
            )));
        }

        let mut candidates: Vec<RetrievalCandidate> = merged.into_values().collect();
        candidates.sort_by(fused_ordering);
        candidates.truncate(top_k);
        Ok(candidates)
    }

    /// Fuse one variant's lexical and dense hit lists and merge them into the
    /// cross-variant accumulator. A chunk present in only one list scores 0
    /// on the other dimension rather than being excluded.
    fn fuse_variant(
        &self,
        variant_index: usize,
        lexical_hits: &[(ChunkId, f32)],
        dense_hits: &[(ChunkId, f32)],
        collection_id: &str,
        merged: &mut HashMap<ChunkId, RetrievalCandidate>,
    ) {
        let lexical_norm = min_max_normalize(lexical_hits);
        let dense_norm = min_max_normalize(dense_hits);
        let lexical_raw: HashMap<&str, f32> =
            lexical_hits.iter().map(|(id, s)| (id.as_str(), *s)).collect();
        let dense_raw: HashMap<&str, f32> =
            dense_hits.iter().map(|(id, s)| (id.as_str(), *s)).collect();

        let mut ids: Vec<&ChunkId> = lexical_hits.iter().map(|(id, _)| id).collect();
        for (id, _) in dense_hits {
            if !lexical_raw.contains_key(id.as_str()) {
                ids.push(id);
            }
        }

        for id in ids {
            let lex_n = lexical_norm.get(id.as_str()).copied().unwrap_or(0.0);
            let dense_n = dense_norm.get(id.as_str()).copied().unwrap_or(0.0);
            let fused = self.lexical_weight * lex_n + self.dense_weight * dense_n;

            match merged.get_mut(id) {
                Some(existing) => {
                    existing.contributing_variants.insert(variant_index);
                    if fused > existing.fused_score {
                        existing.fused_score = fused;
                        existing.lexical_score = lexical_raw.get(id.as_str()).copied().unwrap_or(0.0);
                        existing.dense_score = dense_raw.get(id.as_str()).copied().unwrap_or(0.0);
                    }
                }
                None => {
                    let mut contributing_variants = std::collections::BTreeSet::new();
                    contributing_variants.insert(variant_index);
                    merged.insert(
                        id.clone(),
                        RetrievalCandidate {
                            chunk_id: id.clone(),
                            lexical_score: lexical_raw.get(id.as_str()).copied().unwrap_or(0.0),
                            dense_score: dense_raw.get(id.as_str()).copied().unwrap_or(0.0),
                            fused_score: fused,
                            rerank_score: None,
                            contributing_variants,
                            source_collection_id: collection_id.to_string(),
                        },
                    );
                }
            }
        }
    }
}

/// Min-max normalize one hit list into [0, 1]. A list whose scores are all
/// equal (including a single hit) maps to 1.0: the engine returned it as a
/// top result and there is nothing to scale against.
pub fn min_max_normalize(hits: &[(ChunkId, f32)]) -> HashMap<String, f32> {
    let mut out = HashMap::new();
    if hits.is_empty() {
        return out;
    }
    let min = hits.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
    let max = hits.iter().map(|(_, s)| *s).fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    for (id, score) in hits {
        let norm = if range > 0.0 { (score - min) / range } else { 1.0 };
        out.insert(id.clone(), norm);
    }
    out
}
