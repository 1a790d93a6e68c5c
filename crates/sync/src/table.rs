//! Process-wide record store registry
//!
//! One table owns the root object store, the shared bounded item cache, and
//! at most one [`LocalRecordStore`] per record identity. The table is an
//! explicit object handed to whoever needs it, not a process global, so
//! tests can run several side by side.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use vitalsync_core::{Cache, Error, ObjectStore, Record, Result, SharedItemCache, StoreSettings};
use vitalsync_storage::LruCache;

use crate::record_store::LocalRecordStore;

/// Registry mapping record identity to its local store
pub struct LocalRecordStoreTable {
    root: Arc<dyn ObjectStore>,
    item_cache: Arc<LruCache<String, Value>>,
    stores: Mutex<HashMap<String, Arc<LocalRecordStore>>>,
    settings: StoreSettings,
}

impl LocalRecordStoreTable {
    /// Create a table over a root object store
    pub fn new(root: Arc<dyn ObjectStore>, settings: StoreSettings) -> Self {
        Self {
            root,
            item_cache: Arc::new(LruCache::new(settings.max_cached_items)),
            stores: Mutex::new(HashMap::new()),
            settings,
        }
    }

    /// Capacity of the shared item cache
    pub fn max_cached_items(&self) -> usize {
        self.item_cache.max_count()
    }

    /// Change the shared cache capacity; applies on the next
    /// eviction-triggering put
    pub fn set_max_cached_items(&self, max_count: usize) {
        self.item_cache.set_max_count(max_count);
    }

    /// The cache shared by every item store this table creates
    pub fn item_cache(&self) -> SharedItemCache {
        Arc::clone(&self.item_cache) as SharedItemCache
    }

    /// Get or lazily create the store for `record`
    ///
    /// The stored entry's record handle is refreshed to the one passed in:
    /// the session layer reissues records with fresh auth context.
    pub async fn store_for_record(&self, record: Arc<dyn Record>) -> Result<Arc<LocalRecordStore>> {
        if record.id().is_empty() {
            return Err(Error::InvalidArgument("record.id"));
        }
        let mut stores = self.stores.lock().await;
        if let Some(existing) = stores.get(record.id()) {
            existing.set_record(record);
            return Ok(Arc::clone(existing));
        }

        let store = Arc::new(
            LocalRecordStore::new(
                Arc::clone(&record),
                &self.root,
                Some(self.item_cache()),
                self.settings.clone(),
            )
            .await?,
        );
        stores.insert(record.id().to_string(), Arc::clone(&store));
        debug!(record = record.id(), "record store created");
        Ok(store)
    }

    /// Remove one record's store, deleting its namespace on disk
    ///
    /// The shared cache is cleared wholesale: its entries are not segregated
    /// per record.
    pub async fn remove_store_for_record(&self, record_id: &str) -> Result<()> {
        if record_id.is_empty() {
            return Err(Error::InvalidArgument("record_id"));
        }
        let mut stores = self.stores.lock().await;
        self.item_cache.clear();
        stores.remove(record_id);
        self.root.delete_child_store(record_id).await
    }

    /// Remove every record store and delete everything under the root
    pub async fn remove_all_stores(&self) -> Result<()> {
        let mut stores = self.stores.lock().await;
        self.item_cache.clear();
        stores.clear();
        self.root.delete_all().await
    }
}
