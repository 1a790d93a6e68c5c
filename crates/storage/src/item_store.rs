//! Local store of record items
//!
//! Items are persisted under their item ID in one object-store namespace,
//! optionally fronted by the shared bounded cache (decoration happens once,
//! at construction). Reads validate the requested version stamp: a mismatch
//! means "needs refresh" and comes back as `None`, never as an error.
//!
//! Every operation takes the store-wide lock for the duration of its
//! object-store call, so gets and puts on one instance never interleave.

use std::sync::Arc;

use tokio::sync::Mutex;

use vitalsync_core::{
    CancelToken, Error, ItemKey, ObjectStore, RecordItem, Result, SharedItemCache, TypedData,
};

use crate::caching::CachingObjectStore;

/// Per-record store of individual items keyed by item ID
pub struct LocalItemStore {
    store: Arc<dyn ObjectStore>,
    lock: Mutex<()>,
}

impl LocalItemStore {
    /// Create an item store; supplying a cache decorates the backing store
    pub fn new(store: Arc<dyn ObjectStore>, cache: Option<SharedItemCache>) -> Self {
        let store: Arc<dyn ObjectStore> = match cache {
            Some(cache) => Arc::new(CachingObjectStore::new(store, cache)),
            None => store,
        };
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// All stored item IDs
    pub async fn item_ids(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        self.store.get_all_keys().await
    }

    /// Fetch the item for `key`, validating its version stamp
    ///
    /// Returns `None` if the item is absent or its stored stamp does not
    /// satisfy the requested one.
    pub async fn get_item(&self, key: &ItemKey) -> Result<Option<RecordItem>> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;
        let Some(value) = self.store.get(&key.id).await? else {
            return Ok(None);
        };
        let item: RecordItem = serde_json::from_value(value)?;
        if !item.key.is_version(&key.version) {
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// Fetch bypassing any cache layer, still validating the version stamp
    pub async fn refresh_and_get_item(&self, key: &ItemKey) -> Result<Option<RecordItem>> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;
        let Some(value) = self.store.refresh_and_get(&key.id).await? else {
            return Ok(None);
        };
        let item: RecordItem = serde_json::from_value(value)?;
        if !item.key.is_version(&key.version) {
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// Fetch by ID alone, ignoring version stamps
    pub async fn get_item_by_id(&self, item_id: &str) -> Result<Option<RecordItem>> {
        if item_id.is_empty() {
            return Err(Error::InvalidArgument("item_id"));
        }
        let _guard = self.lock.lock().await;
        let Some(value) = self.store.get(item_id).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Fetch the typed payload for `key`
    ///
    /// `None` if the item is absent, version-mismatched, or has no payload.
    pub async fn get(&self, key: &ItemKey) -> Result<Option<TypedData>> {
        Ok(self
            .get_item(key)
            .await?
            .and_then(RecordItem::into_typed_data))
    }

    /// Fetch the typed payload by ID alone
    pub async fn get_by_id(&self, item_id: &str) -> Result<Option<TypedData>> {
        Ok(self
            .get_item_by_id(item_id)
            .await?
            .and_then(RecordItem::into_typed_data))
    }

    /// Fetch many items, positionally aligned with `keys`
    ///
    /// Missing or version-mismatched entries are `None` slots, so callers
    /// can pair results back to their request by ordinal.
    pub async fn get_items_aligned(
        &self,
        keys: &[ItemKey],
        cancel: &CancelToken,
    ) -> Result<Vec<Option<RecordItem>>> {
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            cancel.check()?;
            items.push(self.get_item(key).await?);
        }
        Ok(items)
    }

    /// Fetch many items, omitting the ones not locally available
    pub async fn get_items_present(
        &self,
        keys: &[ItemKey],
        cancel: &CancelToken,
    ) -> Result<Vec<RecordItem>> {
        let aligned = self.get_items_aligned(keys, cancel).await?;
        Ok(aligned.into_iter().flatten().collect())
    }

    /// Fetch many typed payloads, positionally aligned with `keys`
    pub async fn get_multiple(
        &self,
        keys: &[ItemKey],
        cancel: &CancelToken,
    ) -> Result<Vec<Option<TypedData>>> {
        let aligned = self.get_items_aligned(keys, cancel).await?;
        Ok(aligned
            .into_iter()
            .map(|item| item.and_then(RecordItem::into_typed_data))
            .collect())
    }

    /// Store one item under its key's ID
    pub async fn put_item(&self, item: &RecordItem) -> Result<()> {
        validate_key(&item.key)?;
        let value = serde_json::to_value(item)?;
        let _guard = self.lock.lock().await;
        self.store.put(&item.key.id, &value).await
    }

    /// Store many items under one lock scope
    pub async fn put_items(&self, items: &[RecordItem], cancel: &CancelToken) -> Result<()> {
        for item in items {
            validate_key(&item.key)?;
        }
        let _guard = self.lock.lock().await;
        for item in items {
            cancel.check()?;
            let value = serde_json::to_value(item)?;
            self.store.put(&item.key.id, &value).await?;
        }
        Ok(())
    }

    /// Delete the item with `key`'s ID
    pub async fn remove_item(&self, key: &ItemKey) -> Result<()> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;
        self.store.delete(&key.id).await
    }

    /// Last-write timestamp for `key`'s ID
    pub async fn update_date_for(
        &self,
        key: &ItemKey,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;
        self.store.get_update_date(&key.id).await
    }
}

fn validate_key(key: &ItemKey) -> Result<()> {
    if key.id.is_empty() {
        return Err(Error::InvalidArgument("key"));
    }
    Ok(())
}
