//! Abstractions over the persistence backend and the remote record
//!
//! The synchronization core never talks to the filesystem or the network
//! directly. It goes through these seams, which keeps every layer testable
//! with swapped-in fakes and lets stores be composed decorator-style
//! (cache-over-folder, encryption-over-folder) without an inheritance
//! hierarchy.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::query::{ItemFilter, ItemQuery};
use crate::types::{PendingItem, RecordItem};

/// Asynchronous key-value object store with child-store (namespace) support
///
/// Values cross this boundary as JSON documents; typed access happens at the
/// call sites. Implementations must be safe for concurrent use.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Fetch bypassing any caching layer, repopulating it on the way out
    ///
    /// For undecorated stores this is equivalent to `get`.
    async fn refresh_and_get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any existing value
    async fn put(&self, key: &str, value: &Value) -> Result<()>;

    /// Delete the value under `key`; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every value and child store under this store
    async fn delete_all(&self) -> Result<()>;

    /// All keys with a stored value (child-store names excluded)
    async fn get_all_keys(&self) -> Result<Vec<String>>;

    /// Last-write timestamp for `key`, or `None` if absent
    async fn get_update_date(&self, key: &str) -> Result<Option<DateTime<Utc>>>;

    /// Fetch raw bytes stored under `key` (blob support)
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store raw bytes under `key`
    async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Open (creating if needed) the named child store
    async fn create_child_store(&self, name: &str) -> Result<Arc<dyn ObjectStore>>;

    /// Delete the named child store and everything in it
    async fn delete_child_store(&self, name: &str) -> Result<()>;
}

/// Remote query capability of one authorized health record
///
/// Implemented by the wire-protocol client; faked in tests.
#[async_trait]
pub trait Record: Send + Sync {
    /// Persistent identity of this record
    fn id(&self) -> &str;

    /// Fetch full items matching `query` (typically a by-key query)
    async fn get_all_items(&self, query: &ItemQuery) -> Result<Vec<RecordItem>>;

    /// List keys and effective dates matching the filters
    async fn get_keys_and_date(
        &self,
        filters: &[ItemFilter],
        max_results: Option<u32>,
    ) -> Result<Vec<PendingItem>>;
}

/// Bounded in-memory cache with recency-based eviction
///
/// `max_count` of 0 disables eviction entirely. All operations must be safe
/// under concurrent calls; `get` promotes the entry to most-recently-used.
pub trait Cache<K, V>: Send + Sync {
    /// Look up `key`, promoting it on a hit
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or update `key`, evicting least-recently-used entries while
    /// over capacity
    fn put(&self, key: K, value: V);

    /// Remove `key` if present
    fn remove(&self, key: &K);

    /// Drop every entry
    fn clear(&self);

    /// Snapshot of all cached keys, in no particular order
    fn keys(&self) -> Vec<K>;

    /// Current capacity; 0 means unbounded
    fn max_count(&self) -> usize;

    /// Change capacity; takes effect on the next eviction-triggering put
    fn set_max_count(&self, max_count: usize);
}

/// Shared handle to the item cache used across a record store table
pub type SharedItemCache = Arc<dyn Cache<String, Value>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_store_is_object_safe_and_send_sync() {
        fn accepts(_: &dyn ObjectStore) {}
        fn assert_send_sync<T: Send + Sync>() {}
        let _ = accepts as fn(&dyn ObjectStore);
        assert_send_sync::<Arc<dyn ObjectStore>>();
    }

    #[test]
    fn test_record_is_object_safe_and_send_sync() {
        fn accepts(_: &dyn Record) {}
        fn assert_send_sync<T: Send + Sync>() {}
        let _ = accepts as fn(&dyn Record);
        assert_send_sync::<Arc<dyn Record>>();
    }

    #[test]
    fn test_cache_is_object_safe() {
        fn accepts(_: &dyn Cache<String, Value>) {}
        let _ = accepts as fn(&dyn Cache<String, Value>);
    }
}
