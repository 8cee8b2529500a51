pub mod cache_keys;
pub mod in_memory;

use crate::core::errors::ForumError;
use async_trait::async_trait;
use std::time::Duration;

/// Key/value store of opaque serialized blobs. Entries expire by TTL only.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, ForumError>;
    async fn put_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), ForumError>;
}
