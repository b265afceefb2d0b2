use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use askdb_cache::{cache_key, cosine_similarity, CacheLayer};
use askdb_core::traits::PersistentCacheStore;
use askdb_core::types::{AnswerPayload, SourceRef};
use async_trait::async_trait;

fn payload(text: &str) -> AnswerPayload {
    AnswerPayload {
        context_text: text.to_string(),
        source_manifest: vec![SourceRef {
            source_file_id: "doc.txt".to_string(),
            collection_id: "main".to_string(),
        }],
        warnings: vec![],
    }
}

fn scope(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn cache_key_ignores_scope_order() {
    let a = cache_key("what is x", &scope(&["beta", "alpha"]));
    let b = cache_key("what is x", &scope(&["alpha", "beta"]));
    assert_eq!(a, b);
    let c = cache_key("what is x", &scope(&["alpha"]));
    assert_ne!(a, c);
}

#[tokio::test]
async fn exact_roundtrip_within_ttl() {
    let cache = CacheLayer::new(Duration::from_secs(60), Duration::from_secs(60), 0.90, None);
    let ids = scope(&["main"]);
    assert!(cache.lookup_exact("q", &ids).await.is_none());
    cache.store("q", &ids, "Q", None, &payload("ctx")).await;
    let hit = cache.lookup_exact("q", &ids).await.expect("hit");
    assert_eq!(hit.context_text, "ctx");
}

#[tokio::test]
async fn exact_entries_expire_at_ttl() {
    let cache = CacheLayer::new(Duration::ZERO, Duration::from_secs(60), 0.90, None);
    let ids = scope(&["main"]);
    cache.store("q", &ids, "Q", None, &payload("ctx")).await;
    assert!(cache.lookup_exact("q", &ids).await.is_none());
}

#[tokio::test]
async fn clear_empties_both_tiers() {
    let cache = CacheLayer::new(Duration::from_secs(60), Duration::from_secs(60), 0.90, None);
    let ids = scope(&["main"]);
    cache.store("q", &ids, "Q", Some(vec![1.0, 0.0]), &payload("ctx")).await;
    cache.clear();
    assert!(cache.lookup_exact("q", &ids).await.is_none());
    assert!(cache.lookup_semantic(&[1.0, 0.0]).is_none());
}

#[tokio::test]
async fn semantic_hit_above_threshold_carries_similarity() {
    let cache = CacheLayer::new(Duration::from_secs(60), Duration::from_secs(60), 0.90, None);
    let ids = scope(&["main"]);
    let stored = vec![1.0f32, 0.0];
    cache.store("q one", &ids, "Q one", Some(stored), &payload("ctx")).await;

    // cos = 0.93 against the stored embedding.
    let probe = vec![0.93f32, (1.0f32 - 0.93 * 0.93).sqrt()];
    let m = cache.lookup_semantic(&probe).expect("semantic hit");
    assert!((m.similarity - 0.93).abs() < 1e-3);
    assert_eq!(m.original_query_text, "Q one");
    assert_eq!(m.payload.context_text, "ctx");
}

#[tokio::test]
async fn semantic_miss_below_threshold() {
    let cache = CacheLayer::new(Duration::from_secs(60), Duration::from_secs(60), 0.90, None);
    let ids = scope(&["main"]);
    cache.store("q one", &ids, "Q one", Some(vec![1.0, 0.0]), &payload("ctx")).await;

    let probe = vec![0.80f32, (1.0f32 - 0.80 * 0.80).sqrt()];
    assert!(cache.lookup_semantic(&probe).is_none());
}

#[tokio::test]
async fn semantic_returns_highest_similarity_entry() {
    let cache = CacheLayer::new(Duration::from_secs(60), Duration::from_secs(60), 0.90, None);
    let ids = scope(&["main"]);
    cache.store("far", &ids, "far", Some(vec![0.92, (1.0f32 - 0.92 * 0.92).sqrt()]), &payload("far")).await;
    cache.store("near", &ids, "near", Some(vec![1.0, 0.0]), &payload("near")).await;

    let m = cache.lookup_semantic(&[1.0, 0.0]).expect("hit");
    assert_eq!(m.payload.context_text, "near");
    assert!(m.similarity > 0.999);
}

#[tokio::test]
async fn semantic_entries_expire_at_ttl() {
    let cache = CacheLayer::new(Duration::from_secs(60), Duration::ZERO, 0.90, None);
    let ids = scope(&["main"]);
    cache.store("q", &ids, "Q", Some(vec![1.0, 0.0]), &payload("ctx")).await;
    assert!(cache.lookup_semantic(&[1.0, 0.0]).is_none());
}

struct FailingStore {
    touched: AtomicBool,
}

#[async_trait]
impl PersistentCacheStore for FailingStore {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        self.touched.store(true, Ordering::SeqCst);
        Err(anyhow::anyhow!("backend down"))
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> anyhow::Result<()> {
        self.touched.store(true, Ordering::SeqCst);
        Err(anyhow::anyhow!("backend down"))
    }
    async fn delete(&self, _key: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("backend down"))
    }
}

#[tokio::test]
async fn unavailable_persistent_store_degrades_to_memory() {
    let store = Arc::new(FailingStore { touched: AtomicBool::new(false) });
    let cache = CacheLayer::new(
        Duration::from_secs(60),
        Duration::from_secs(60),
        0.90,
        Some(store.clone()),
    );
    let ids = scope(&["main"]);
    cache.store("q", &ids, "Q", None, &payload("ctx")).await;
    let hit = cache.lookup_exact("q", &ids).await.expect("memory hit despite store errors");
    assert_eq!(hit.context_text, "ctx");
    assert!(store.touched.load(Ordering::SeqCst), "store was consulted");
}

#[test]
fn cosine_handles_mismatched_and_zero_vectors() {
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
}
