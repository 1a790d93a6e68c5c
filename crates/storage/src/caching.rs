//! Caching object-store decorator
//!
//! Wraps any [`ObjectStore`] with a shared in-memory cache: read-through on
//! `get`, write-through on `put`, invalidate on `delete`. `refresh_and_get`
//! is the escape hatch that reloads from the inner store and repopulates the
//! cache; the synchronized store uses it after a download so readers see
//! the just-written item. Bytes and child stores pass through uncached.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::trace;

use vitalsync_core::{ObjectStore, Result, SharedItemCache};

/// Decorator adding a shared item cache in front of an object store
pub struct CachingObjectStore {
    inner: Arc<dyn ObjectStore>,
    cache: SharedItemCache,
}

impl CachingObjectStore {
    /// Wrap `inner` with `cache`
    pub fn new(inner: Arc<dyn ObjectStore>, cache: SharedItemCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ObjectStore for CachingObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        if let Some(hit) = self.cache.get(&key.to_string()) {
            trace!(key, "cache hit");
            return Ok(Some(hit));
        }
        let value = self.inner.get(key).await?;
        if let Some(value) = &value {
            self.cache.put(key.to_string(), value.clone());
        }
        Ok(value)
    }

    async fn refresh_and_get(&self, key: &str) -> Result<Option<Value>> {
        let value = self.inner.refresh_and_get(key).await?;
        match &value {
            Some(value) => self.cache.put(key.to_string(), value.clone()),
            None => self.cache.remove(&key.to_string()),
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        self.inner.put(key, value).await?;
        self.cache.put(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await?;
        self.cache.remove(&key.to_string());
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.inner.delete_all().await?;
        self.cache.clear();
        Ok(())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>> {
        self.inner.get_all_keys().await
    }

    async fn get_update_date(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        self.inner.get_update_date(key).await
    }

    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get_bytes(key).await
    }

    async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.inner.put_bytes(key, bytes).await
    }

    async fn create_child_store(&self, name: &str) -> Result<Arc<dyn ObjectStore>> {
        self.inner.create_child_store(name).await
    }

    async fn delete_child_store(&self, name: &str) -> Result<()> {
        self.inner.delete_child_store(name).await
    }
}
