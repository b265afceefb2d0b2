use std::collections::BTreeSet;

use askdb_core::config::RetrievalConfig;
use askdb_core::types::{fused_ordering, RetrievalCandidate};

fn candidate(id: &str, fused: f32, variants: &[usize]) -> RetrievalCandidate {
    RetrievalCandidate {
        chunk_id: id.to_string(),
        lexical_score: 0.0,
        dense_score: 0.0,
        fused_score: fused,
        rerank_score: None,
        contributing_variants: variants.iter().copied().collect::<BTreeSet<_>>(),
        source_collection_id: "main".to_string(),
    }
}

#[test]
fn ordering_prefers_fused_score_then_variant_then_chunk_id() {
    let mut candidates = vec![
        candidate("c", 0.5, &[0]),
        candidate("b", 0.5, &[1]),
        candidate("a", 0.5, &[1]),
        candidate("d", 0.9, &[2]),
    ];
    candidates.sort_by(fused_ordering);
    let ids: Vec<&str> = candidates.iter().map(|c| c.chunk_id.as_str()).collect();
    // Highest fused first; equal scores fall back to earliest variant, then id.
    assert_eq!(ids, vec!["d", "c", "a", "b"]);
}

#[test]
fn first_variant_is_the_minimum_contributing_index() {
    let c = candidate("a", 1.0, &[3, 1, 2]);
    assert_eq!(c.first_variant(), 1);
}

#[test]
fn default_config_matches_documented_tunables() {
    let cfg = RetrievalConfig::default();
    assert!((cfg.lexical_weight - 0.3).abs() < f32::EPSILON);
    assert!((cfg.dense_weight - 0.7).abs() < f32::EPSILON);
    assert_eq!(cfg.top_m_lexical, 20);
    assert_eq!(cfg.top_m_dense, 20);
    assert_eq!(cfg.rerank_batch_size, 16);
    assert_eq!(cfg.pool_size, 5);
    assert!((cfg.semantic_threshold - 0.90).abs() < f32::EPSILON);
    assert_eq!(cfg.exact_ttl().as_secs(), 900);
    assert_eq!(cfg.min_unique_sources, 3);
}

#[test]
fn top_k_switches_on_synthesis() {
    let cfg = RetrievalConfig::default();
    assert_eq!(cfg.top_k_for(false), 20);
    assert_eq!(cfg.top_k_for(true), 30);
}
