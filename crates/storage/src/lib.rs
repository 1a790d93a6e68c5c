//! Local persistence layer for vitalsync
//!
//! This crate implements the local half of the synchronization story:
//! - `FolderObjectStore`: directory-backed object store with child namespaces
//! - `CachingObjectStore`: read-through/write-through cache decorator
//! - `LruCache`: the shared bounded item cache
//! - `LocalStore`: typed access for metadata and blobs
//! - `LocalItemStore`: version-validated record-item storage

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod caching;
pub mod folder;
pub mod item_store;
pub mod local;
pub mod lru;

pub use caching::CachingObjectStore;
pub use folder::FolderObjectStore;
pub use item_store::LocalItemStore;
pub use local::LocalStore;
pub use lru::LruCache;
