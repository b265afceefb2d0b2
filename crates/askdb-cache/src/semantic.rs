//! Semantic cache tier: embedding-similarity lookup over past answers.
//!
//! The default index is a linear cosine scan, which is fine at the
//! thousands-of-entries scale this tier sees. `SemanticIndex` is a trait so a
//! real nearest-neighbor structure can replace the scan without touching the
//! cache layer. Expired entries are pruned as the scan walks.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use askdb_core::types::AnswerPayload;

#[derive(Clone)]
pub struct SemanticEntry {
    pub query_embedding: Vec<f32>,
    pub original_query_text: String,
    pub payload: AnswerPayload,
    created_at: Instant,
    ttl: Duration,
}

impl SemanticEntry {
    /// Index implementations must never return an expired entry.
    pub fn expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// A semantic hit and the similarity that produced it, kept for audit logs.
pub struct SemanticMatch {
    pub similarity: f32,
    pub original_query_text: String,
    pub payload: AnswerPayload,
}

pub trait SemanticIndex: Send + Sync {
    fn insert(&self, entry: SemanticEntry);
    /// Highest-similarity live entry at or above `threshold`, or None.
    fn best_match(&self, embedding: &[f32], threshold: f32) -> Option<SemanticMatch>;
    fn clear(&self);
}

/// Linear-scan index over all live entries.
#[derive(Default)]
pub struct ScanIndex {
    entries: RwLock<Vec<SemanticEntry>>,
}

impl ScanIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SemanticIndex for ScanIndex {
    fn insert(&self, entry: SemanticEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(entry);
        }
    }

    fn best_match(&self, embedding: &[f32], threshold: f32) -> Option<SemanticMatch> {
        let mut entries = self.entries.write().ok()?;
        entries.retain(|e| !e.expired());
        let mut best: Option<(f32, &SemanticEntry)> = None;
        for entry in entries.iter() {
            let sim = cosine_similarity(embedding, &entry.query_embedding);
            if sim >= threshold && best.map_or(true, |(b, _)| sim > b) {
                best = Some((sim, entry));
            }
        }
        best.map(|(similarity, entry)| SemanticMatch {
            similarity,
            original_query_text: entry.original_query_text.clone(),
            payload: entry.payload.clone(),
        })
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

pub struct SemanticCache {
    index: Box<dyn SemanticIndex>,
    threshold: f32,
    ttl: Duration,
}

impl SemanticCache {
    pub fn new(threshold: f32, ttl: Duration) -> Self {
        Self::with_index(Box::new(ScanIndex::new()), threshold, ttl)
    }

    pub fn with_index(index: Box<dyn SemanticIndex>, threshold: f32, ttl: Duration) -> Self {
        Self { index, threshold, ttl }
    }

    pub fn get(&self, query_embedding: &[f32]) -> Option<SemanticMatch> {
        self.index.best_match(query_embedding, self.threshold)
    }

    pub fn put(&self, query_embedding: Vec<f32>, original_query_text: String, payload: AnswerPayload) {
        self.index.insert(SemanticEntry {
            query_embedding,
            original_query_text,
            payload,
            created_at: Instant::now(),
            ttl: self.ttl,
        });
    }

    pub fn clear(&self) {
        self.index.clear();
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
