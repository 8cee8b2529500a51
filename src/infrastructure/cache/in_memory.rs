use crate::core::errors::ForumError;
use crate::infrastructure::cache::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Clone)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        let store = self.store.read().await;
        store.values().filter(|(_, expiry)| *expiry > Instant::now()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, ForumError> {
        let store = self.store.read().await;
        match store.get(key) {
            Some((value, expiry)) if *expiry > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                drop(store);
                let mut store = self.store.write().await;
                // Another writer may have refreshed the entry since the read.
                if store.get(key).is_some_and(|(_, expiry)| *expiry <= Instant::now()) {
                    store.remove(key);
                }
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), ForumError> {
        let expiry = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| ForumError::CacheError(format!("TTL out of range: {:?}", ttl)))?;
        let mut store = self.store.write().await;
        store.insert(key.to_string(), (value, expiry));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryCache::new();
        cache
            .put_raw("k", "v".to_string(), Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(cache.get_raw("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get_raw("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get_raw("k").await.unwrap().is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn later_write_replaces_entry() {
        let cache = InMemoryCache::new();
        cache.put_raw("k", "a".to_string(), Duration::from_secs(60)).await.unwrap();
        cache.put_raw("k", "b".to_string(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get_raw("k").await.unwrap().as_deref(), Some("b"));
        assert_eq!(cache.len().await, 1);
    }
}
