use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::plugins::{EntityEvent, HookPoint, Plugin, PluginError};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    hits: u64,
    inserted_at: Instant,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Built-in memoization plugin for entity lookups.
///
/// Fixed capacity; when full, the least-hit (oldest first among ties)
/// quarter of the entries is evicted. Entries also expire after a TTL.
#[derive(Debug)]
pub struct CachePlugin {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl Default for CachePlugin {
    fn default() -> Self {
        Self::new(512, Duration::from_secs(300))
    }
}

impl CachePlugin {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner();
        let expired = inner
            .entries
            .get(key)
            .map(|entry| entry.inserted_at.elapsed() > self.ttl);
        match expired {
            None => {
                inner.misses += 1;
                None
            }
            Some(true) => {
                inner.entries.remove(key);
                inner.misses += 1;
                None
            }
            Some(false) => {
                inner.hits += 1;
                let entry = inner.entries.get_mut(key)?;
                entry.hits += 1;
                Some(entry.value.clone())
            }
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        let mut inner = self.inner();
        if inner.entries.len() >= self.capacity {
            let evict = (self.capacity / 4).max(1);
            let mut candidates: Vec<(String, u64, Instant)> = inner
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.hits, e.inserted_at))
                .collect();
            candidates.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)));
            for (key, _, _) in candidates.into_iter().take(evict) {
                inner.entries.remove(&key);
                inner.evictions += 1;
            }
            debug!(evicted = evict, "cache eviction pass");
        }
        inner.entries.insert(
            key.into(),
            CacheEntry {
                value,
                hits: 0,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner();
        CacheStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }

    /// Cache keys for an entity: its ID, plus a type-specific unique field
    /// (alias, code, legal name) so conflict resolution can look entities up
    /// by the value that collided.
    fn derive_keys(event: &EntityEvent<'_>) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(id) = event.id {
            keys.push(format!("{}:{id}", event.kind));
        }
        for field in ["alias", "code", "legalName", "name"] {
            if let Some(value) = event.payload.get(field).and_then(Value::as_str) {
                keys.push(format!("{}:{value}", event.kind));
                break;
            }
        }
        keys
    }
}

#[async_trait]
impl Plugin for CachePlugin {
    fn name(&self) -> &str {
        "cache"
    }

    fn capabilities(&self) -> &'static [HookPoint] {
        &[HookPoint::AfterEntity]
    }

    async fn on_after_entity(&self, event: &EntityEvent<'_>) -> Result<(), PluginError> {
        for key in Self::derive_keys(event) {
            self.insert(key, event.payload.clone());
        }
        Ok(())
    }

    async fn teardown(&self) {
        let mut inner = self.inner();
        inner.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hit_and_miss_accounting() {
        let cache = CachePlugin::new(8, Duration::from_secs(60));
        cache.insert("account:a1", json!({"id": "a1"}));
        assert!(cache.get("account:a1").is_some());
        assert!(cache.get("account:zz").is_none());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn evicts_least_hit_entries_when_full() {
        let cache = CachePlugin::new(4, Duration::from_secs(60));
        for i in 0..4 {
            cache.insert(format!("k{i}"), json!(i));
        }
        // k3 is the hottest entry.
        cache.get("k3");
        cache.get("k3");
        cache.insert("k4", json!(4));

        assert!(cache.get("k3").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn entities_are_cached_under_id_and_unique_field() {
        use ledgerforge_core::EntityKind;

        let cache = CachePlugin::default();
        let payload = json!({"id": "org-1", "legalName": "Acme Corp"});
        cache
            .on_after_entity(&EntityEvent {
                kind: EntityKind::Organization,
                id: Some("org-1"),
                payload: &payload,
            })
            .await
            .unwrap();

        assert!(cache.get("organization:org-1").is_some());
        assert!(cache.get("organization:Acme Corp").is_some());
    }

    #[test]
    fn ttl_expires_entries() {
        let cache = CachePlugin::new(4, Duration::from_millis(0));
        cache.insert("k", json!(1));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("k").is_none());
    }
}
