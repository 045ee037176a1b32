//! Read-side caches for leaderboard queries.

pub mod etag;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub use etag::EtagGeneration;

struct CachedValue {
    value: serde_json::Value,
    expires_at: Instant,
}

/// In-memory TTL cache of serialized query results, keyed by string.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<RwLock<HashMap<String, CachedValue>>>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.inner.read().await;
        let cached = cache.get(key)?;

        if cached.expires_at <= Instant::now() {
            debug!(key, "Query cache entry expired");
            return None;
        }

        serde_json::from_value(cached.value.clone()).ok()
    }

    pub async fn set<T: Serialize>(&self, key: impl Into<String>, value: &T) {
        let key = key.into();
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "Not caching unserializable value: {}", e);
                return;
            }
        };

        let mut cache = self.inner.write().await;
        cache.retain(|_, cached| cached.expires_at > Instant::now());
        cache.insert(
            key,
            CachedValue {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drops every key starting with `prefix`. Returns how many were removed.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut cache = self.inner.write().await;
        let before = cache.len();
        cache.retain(|key, _| !key.starts_with(prefix));
        before - cache.len()
    }

    pub async fn invalidate_all(&self) -> usize {
        let mut cache = self.inner.write().await;
        let removed = cache.len();
        cache.clear();
        removed
    }
}
