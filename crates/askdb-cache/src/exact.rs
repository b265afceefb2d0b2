//! Exact-match cache tier.
//!
//! Keyed by a blake3 hash of the normalized query plus the sorted collection
//! scope, so the same question over the same collections hits regardless of
//! scope ordering. Entries live in an in-process map; an optional persistent
//! store is written through and consulted on memory misses, and any failure
//! there degrades the tier to memory-only rather than surfacing an error.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use askdb_core::traits::PersistentCacheStore;
use askdb_core::types::AnswerPayload;

pub fn cache_key(normalized_query: &str, collection_ids: &[String]) -> String {
    let mut scope: Vec<&str> = collection_ids.iter().map(String::as_str).collect();
    scope.sort_unstable();
    let mut hasher = blake3::Hasher::new();
    hasher.update(normalized_query.as_bytes());
    for id in scope {
        hasher.update(b"\n");
        hasher.update(id.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

struct StoredEntry {
    payload: AnswerPayload,
    created_at: Instant,
}

pub struct ExactCache {
    entries: RwLock<HashMap<String, StoredEntry>>,
    persistent: Option<Arc<dyn PersistentCacheStore>>,
    ttl: Duration,
}

impl ExactCache {
    pub fn new(ttl: Duration, persistent: Option<Arc<dyn PersistentCacheStore>>) -> Self {
        Self { entries: RwLock::new(HashMap::new()), persistent, ttl }
    }

    pub async fn get(&self, key: &str) -> Option<AnswerPayload> {
        if let Some(payload) = self.get_memory(key) {
            return Some(payload);
        }
        self.get_persistent(key).await
    }

    fn get_memory(&self, key: &str) -> Option<AnswerPayload> {
        {
            let entries = self.entries.read().ok()?;
            match entries.get(key) {
                Some(e) if e.created_at.elapsed() < self.ttl => return Some(e.payload.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop it so the map does not accumulate stale entries.
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
        None
    }

    async fn get_persistent(&self, key: &str) -> Option<AnswerPayload> {
        let store = self.persistent.as_ref()?;
        match store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<AnswerPayload>(&raw) {
                Ok(payload) => {
                    if let Ok(mut entries) = self.entries.write() {
                        entries.insert(
                            key.to_string(),
                            StoredEntry { payload: payload.clone(), created_at: Instant::now() },
                        );
                    }
                    Some(payload)
                }
                Err(e) => {
                    tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Persistent cache unavailable, serving memory only: {}", e);
                None
            }
        }
    }

    pub async fn put(&self, key: String, payload: AnswerPayload) {
        if let Some(store) = &self.persistent {
            match serde_json::to_string(&payload) {
                Ok(raw) => {
                    if let Err(e) = store.set(&key, &raw, self.ttl).await {
                        tracing::warn!("Persistent cache write failed for {}: {}", key, e);
                    }
                }
                Err(e) => tracing::warn!("Could not encode cache entry {}: {}", key, e),
            }
        }
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, StoredEntry { payload, created_at: Instant::now() });
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}
