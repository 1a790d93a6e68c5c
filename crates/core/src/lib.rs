//! Core types and seams for vitalsync
//!
//! This crate defines the value types of the record-item domain, the query
//! model, the error taxonomy, cooperative cancellation, and the traits
//! behind which the persistence backend and the remote record live. It has
//! no I/O of its own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod error;
pub mod query;
pub mod settings;
pub mod traits;
pub mod types;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use query::{ItemFilter, ItemQuery, ItemSections};
pub use settings::StoreSettings;
pub use traits::{Cache, ObjectStore, Record, SharedItemCache};
pub use types::{ItemKey, ItemType, PendingItem, RecordItem, TypedData};
