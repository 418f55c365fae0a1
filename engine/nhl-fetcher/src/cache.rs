use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Raw upstream response cache.
///
/// Entries are fresh while younger than the TTL the caller asks for; expired entries are kept
/// so a failed fetch can still be answered with stale data.
pub struct ResponseCache {
    max_entries: usize,
    entries: Arc<RwLock<HashMap<String, CachedResponse>>>,
}

#[derive(Debug, Clone)]
struct CachedResponse {
    body: Value,
    cached_at: DateTime<Utc>,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Cached body if it is younger than `ttl_secs`
    pub async fn get_fresh(&self, key: &str, ttl_secs: u64) -> Option<Value> {
        let entries = self.entries.read().await;
        let cached = entries.get(key)?;

        let age = Utc::now() - cached.cached_at;
        if age >= Duration::seconds(ttl_secs as i64) {
            debug!("Cache entry {} expired (age: {:?})", key, age);
            return None;
        }

        Some(cached.body.clone())
    }

    /// Cached body regardless of age
    pub async fn get_stale(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries.get(key).map(|cached| cached.body.clone())
    }

    pub async fn store(&self, key: &str, body: Value) {
        let mut entries = self.entries.write().await;

        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            // Drop the oldest entries to make room
            let mut by_age: Vec<_> = entries
                .iter()
                .map(|(k, v)| (k.clone(), v.cached_at))
                .collect();
            by_age.sort_by_key(|(_, cached_at)| *cached_at);

            let to_remove = entries.len() + 1 - self.max_entries;
            for (old_key, _) in by_age.into_iter().take(to_remove) {
                entries.remove(&old_key);
            }
            info!("Response cache full, evicted {} entries", to_remove);
        }

        entries.insert(
            key.to_string(),
            CachedResponse {
                body,
                cached_at: Utc::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fresh_and_stale_lookup() {
        let cache = ResponseCache::new(8);
        cache.store("nhl:boxscore:1", json!({ "id": 1 })).await;

        assert_eq!(cache.get_fresh("nhl:boxscore:1", 60).await, Some(json!({ "id": 1 })));
        // A zero TTL means the entry is already expired but still usable as stale data
        assert_eq!(cache.get_fresh("nhl:boxscore:1", 0).await, None);
        assert_eq!(cache.get_stale("nhl:boxscore:1").await, Some(json!({ "id": 1 })));
        assert_eq!(cache.get_stale("nhl:boxscore:2").await, None);
    }

    #[tokio::test]
    async fn test_oldest_entry_evicted_when_full() {
        let cache = ResponseCache::new(2);
        cache.store("a", json!(1)).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cache.store("b", json!(2)).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cache.store("c", json!(3)).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get_stale("a").await, None);
        assert_eq!(cache.get_stale("c").await, Some(json!(3)));
    }
}
