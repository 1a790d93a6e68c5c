//! vitalsync - client-side synchronization and caching for remote
//! health-record stores
//!
//! The remote service holds the authoritative, versioned items; this crate
//! maintains a local persistent cache of them and serves reads local-first,
//! downloading whatever is missing either awaited or in the background.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use vitalsync::{
//!     CancelToken, FolderObjectStore, ItemFilter, ItemQuery, LocalRecordStoreTable,
//!     ObjectStore, StoreSettings,
//! };
//!
//! // One table per process, rooted in the app's data folder
//! let root: Arc<dyn ObjectStore> =
//!     Arc::new(FolderObjectStore::create("./health-data").await?);
//! let table = LocalRecordStoreTable::new(root, StoreSettings::default());
//!
//! // `record` is the wire client's handle for an authorized record
//! let store = table.store_for_record(record).await?;
//!
//! // Build a view over the record's weight measurements and synchronize it
//! let view = store.create_view(ItemQuery::filtered(
//!     "weights",
//!     ItemFilter::for_type("weight.v2"),
//! ));
//! view.synchronize(&CancelToken::new()).await?;
//!
//! // Local-first read: items already cached come back now, the rest are
//! // fetched in the background and announced via the view's events
//! let first_page = view.get_items(0, 25, &CancelToken::new()).await?;
//! ```
//!
//! # Architecture
//!
//! `vitalsync-core` defines the value types and the seams (object store,
//! remote record, cache); `vitalsync-storage` implements the local half
//! (folder store, LRU cache, item store); `vitalsync-sync` reconciles the
//! two. This facade re-exports the public API.

pub use vitalsync_core::{
    CancelToken, Error, ItemFilter, ItemKey, ItemQuery, ItemSections, ItemType, ObjectStore,
    PendingItem, Record, RecordItem, Result, SharedItemCache, StoreSettings, TypedData,
};
pub use vitalsync_storage::{
    CachingObjectStore, FolderObjectStore, LocalItemStore, LocalStore, LruCache,
};
pub use vitalsync_sync::{
    LocalRecordStore, LocalRecordStoreTable, PendingGetCallback, PendingGetResult, StoredQuery,
    SynchronizedStore, SynchronizedView, ViewData, ViewEvents, ViewKey, ViewKeyCollection,
    DEFAULT_READ_AHEAD_CHUNK_SIZE,
};
