//! Synchronization layer for vitalsync
//!
//! This crate reconciles the local persistence layer with a remote record:
//! - `SynchronizedStore`: local-first reads with awaited or background
//!   download of whatever is missing
//! - `SynchronizedView`: ordered, named query snapshots with read-ahead
//! - `ViewKeyCollection`: the sorted, ID-indexed key set behind a view
//! - `LocalRecordStore` / `LocalRecordStoreTable`: per-record aggregation
//!   and the process-wide registry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod notify;
pub mod pending;
pub mod record_store;
pub mod store;
pub mod table;
pub mod view;
pub mod view_data;
pub mod view_key;

pub use notify::ViewEvents;
pub use pending::{PendingGetCallback, PendingGetResult};
pub use record_store::LocalRecordStore;
pub use store::SynchronizedStore;
pub use table::LocalRecordStoreTable;
pub use view::{SynchronizedView, DEFAULT_READ_AHEAD_CHUNK_SIZE};
pub use view_data::{StoredQuery, ViewData};
pub use view_key::{ViewKey, ViewKeyCollection};
