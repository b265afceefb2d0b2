//! askdb-embed
//!
//! Deterministic hashing embedding provider. Each whitespace token is hashed
//! into a bucket of the output vector and the result is L2-normalized, so the
//! same text always produces the same unit vector and token overlap shows up
//! as cosine similarity. Real model inference lives behind the same
//! `EmbeddingProvider` trait in an external service.

use std::hash::{Hash, Hasher};

use anyhow::Result;
use async_trait::async_trait;
use twox_hash::XxHash64;

use askdb_core::traits::EmbeddingProvider;

pub const DEFAULT_DIM: usize = 256;

pub struct HashingProvider {
    dim: usize,
}

impl HashingProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Stable identifier for cache partitioning and diagnostics.
    pub fn provider_id(&self) -> String {
        format!("hash:xx64:d{}", self.dim)
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic_and_normalized() {
        let provider = HashingProvider::new(64);
        let a = provider.embed("solar panel maintenance").await.expect("embed");
        let b = provider.embed("solar panel maintenance").await.expect("embed");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn overlapping_text_is_closer_than_disjoint_text() {
        let provider = HashingProvider::new(128);
        let base = provider.embed("battery storage capacity").await.expect("embed");
        let near = provider.embed("battery storage sizing").await.expect("embed");
        let far = provider.embed("goat fencing ideas").await.expect("embed");
        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(a, b)| a * b).sum::<f32>();
        assert!(dot(&base, &near) > dot(&base, &far));
    }
}
