//! Per-record local store
//!
//! Each record gets three independently-scoped namespaces under its own
//! child store: `Data` (items, behind the synchronized store), `Metadata`
//! (views and stored queries), and `Blobs` (opaque attachments). Metadata
//! access serializes through its own lock, so view bookkeeping never blocks
//! item reads and writes.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use vitalsync_core::{
    Error, ItemQuery, ObjectStore, Record, Result, SharedItemCache, StoreSettings,
};
use vitalsync_storage::{LocalItemStore, LocalStore};

use crate::store::SynchronizedStore;
use crate::view::SynchronizedView;
use crate::view_data::{StoredQuery, ViewData};

const DATA_STORE: &str = "Data";
const METADATA_STORE: &str = "Metadata";
const BLOB_STORE: &str = "Blobs";

fn view_key(name: &str) -> String {
    format!("{name}_View")
}

fn stored_query_key(name: &str) -> String {
    format!("{name}_StoredQuery")
}

/// Local store for one record: data, metadata, and blobs
pub struct LocalRecordStore {
    record: RwLock<Arc<dyn Record>>,
    data: Arc<SynchronizedStore>,
    metadata: LocalStore,
    metadata_lock: Mutex<()>,
    blobs: LocalStore,
    settings: StoreSettings,
}

impl LocalRecordStore {
    /// Create the store, setting up the record's namespaces
    ///
    /// Construction completes only once the namespaces exist; the returned
    /// store is ready for use.
    pub async fn new(
        record: Arc<dyn Record>,
        parent_store: &Arc<dyn ObjectStore>,
        cache: Option<SharedItemCache>,
        settings: StoreSettings,
    ) -> Result<Self> {
        let root = parent_store.create_child_store(record.id()).await?;

        let data_store = root.create_child_store(DATA_STORE).await?;
        let item_store = Arc::new(LocalItemStore::new(data_store, cache));
        let data = Arc::new(SynchronizedStore::new(Arc::clone(&record), item_store));
        data.set_sections_to_fetch(settings.sections_to_fetch);

        let metadata = LocalStore::new(root.create_child_store(METADATA_STORE).await?);
        let blobs = LocalStore::new(root.create_child_store(BLOB_STORE).await?);

        Ok(Self {
            record: RwLock::new(record),
            data,
            metadata,
            metadata_lock: Mutex::new(()),
            blobs,
            settings,
        })
    }

    /// The record this store belongs to
    pub fn record(&self) -> Arc<dyn Record> {
        Arc::clone(&self.record.read())
    }

    /// Swap in a reissued record handle; the data store follows
    pub fn set_record(&self, record: Arc<dyn Record>) {
        *self.record.write() = Arc::clone(&record);
        self.data.set_record(record);
    }

    /// The synchronized item store for this record
    pub fn data(&self) -> &Arc<SynchronizedStore> {
        &self.data
    }

    /// The blob namespace
    pub fn blobs(&self) -> &LocalStore {
        &self.blobs
    }

    /// Build an in-memory (not yet persisted) view for `query`
    pub fn create_view(&self, query: ItemQuery) -> SynchronizedView {
        let view = SynchronizedView::new(Arc::clone(&self.data), query);
        self.apply_settings(&view);
        view
    }

    /// Build an in-memory view with an explicit name
    pub fn create_named_view(&self, name: &str, query: ItemQuery) -> Result<SynchronizedView> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("name"));
        }
        let view = SynchronizedView::with_name(Arc::clone(&self.data), query, name);
        self.apply_settings(&view);
        Ok(view)
    }

    fn apply_settings(&self, view: &SynchronizedView) {
        // Chunk size is clamped to 1, so the setter cannot reject it.
        let chunk = self.settings.read_ahead_chunk_size.max(1);
        let _ = view.set_read_ahead_chunk_size(chunk);
    }

    /// Load the named view from metadata, if present
    ///
    /// A payload stored under the right key but carrying a different name is
    /// treated as absent.
    pub async fn get_view(&self, name: &str) -> Result<Option<SynchronizedView>> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("name"));
        }
        let _guard = self.metadata_lock.lock().await;
        let Some(data) = self.metadata.get::<ViewData>(&view_key(name)).await? else {
            return Ok(None);
        };
        if data.name != name {
            return Ok(None);
        }
        let view = SynchronizedView::from_data(Arc::clone(&self.data), data)?;
        self.apply_settings(&view);
        Ok(Some(view))
    }

    /// Persist the view's current state under its name
    pub async fn put_view(&self, view: &SynchronizedView) -> Result<()> {
        let name = view.name();
        if name.is_empty() {
            return Err(Error::InvalidArgument("view.name"));
        }
        let _guard = self.metadata_lock.lock().await;
        self.metadata.put(&view_key(&name), &view.data()).await
    }

    /// Delete the named view's persisted state
    pub async fn delete_view(&self, name: &str) -> Result<()> {
        let _guard = self.metadata_lock.lock().await;
        self.metadata.delete(&view_key(name)).await
    }

    /// Load the named stored query, if present
    pub async fn get_stored_query(&self, name: &str) -> Result<Option<StoredQuery>> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("name"));
        }
        let _guard = self.metadata_lock.lock().await;
        self.metadata.get(&stored_query_key(name)).await
    }

    /// Persist a stored query under `name`
    pub async fn put_stored_query(&self, name: &str, query: &StoredQuery) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("name"));
        }
        let _guard = self.metadata_lock.lock().await;
        self.metadata.put(&stored_query_key(name), query).await
    }

    /// Delete the named stored query
    pub async fn delete_stored_query(&self, name: &str) -> Result<()> {
        let _guard = self.metadata_lock.lock().await;
        self.metadata.delete(&stored_query_key(name)).await
    }
}
