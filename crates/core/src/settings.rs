//! Store configuration
//!
//! Settings are an explicit value passed to constructors, never process
//! globals, so tests can run tables side by side with different shapes.

use serde::{Deserialize, Serialize};

use crate::query::ItemSections;

/// Configuration for a record store table and the views built under it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Capacity of the shared item cache; 0 disables eviction
    pub max_cached_items: usize,
    /// How many keys a view read-ahead batches per miss
    pub read_ahead_chunk_size: usize,
    /// Sections fetched by synchronized-store downloads
    pub sections_to_fetch: ItemSections,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_cached_items: 0,
            read_ahead_chunk_size: 25,
            sections_to_fetch: ItemSections::Standard,
        }
    }
}
