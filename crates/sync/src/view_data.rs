//! Persisted view and stored-query state
//!
//! `ViewData` is what a view writes to the metadata namespace: its name, its
//! defining query, the last key snapshot, and when that snapshot was taken.
//! The in-memory view (`SynchronizedView`) is reconstructed from this on
//! load; load-pending flags are never part of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vitalsync_core::ItemQuery;

use crate::view_key::ViewKey;

/// Persisted state of one named view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewData {
    /// View name; also the metadata key stem
    pub name: String,
    /// The query this view snapshots
    pub query: ItemQuery,
    /// Ordered key snapshot; `None` until the first synchronization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<ViewKey>>,
    /// When the key snapshot was last rebuilt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ViewData {
    /// Fresh, never-synchronized view state
    pub fn new(query: ItemQuery, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query,
            keys: None,
            last_updated: None,
        }
    }

    /// True once a key snapshot exists (even an empty one)
    pub fn has_keys(&self) -> bool {
        self.keys.is_some()
    }

    /// True if the snapshot is older than `max_age`, or was never taken
    pub fn is_stale(&self, max_age: std::time::Duration) -> bool {
        match self.last_updated {
            Some(stamp) => {
                let age = Utc::now().signed_duration_since(stamp);
                age > chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX)
            }
            None => true,
        }
    }
}

/// A query saved under a name in the metadata namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredQuery {
    /// The saved query
    pub query: ItemQuery,
}

impl StoredQuery {
    /// Save a query
    pub fn new(query: ItemQuery) -> Self {
        Self { query }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vitalsync_core::{ItemFilter, ItemKey};

    #[test]
    fn test_new_view_data_has_no_keys_and_is_stale() {
        let data = ViewData::new(ItemQuery::default(), "meds");
        assert!(!data.has_keys());
        assert!(data.is_stale(Duration::from_secs(3600)));
    }

    #[test]
    fn test_fresh_stamp_is_not_stale() {
        let data = ViewData {
            keys: Some(Vec::new()),
            last_updated: Some(Utc::now()),
            ..ViewData::new(ItemQuery::default(), "meds")
        };
        assert!(data.has_keys());
        assert!(!data.is_stale(Duration::from_secs(3600)));
    }

    #[test]
    fn test_old_stamp_is_stale() {
        let data = ViewData {
            keys: Some(Vec::new()),
            last_updated: Some(Utc::now() - chrono::Duration::seconds(120)),
            ..ViewData::new(ItemQuery::default(), "meds")
        };
        assert!(data.is_stale(Duration::from_secs(60)));
        assert!(!data.is_stale(Duration::from_secs(600)));
    }

    #[test]
    fn test_view_data_round_trips() {
        let data = ViewData {
            keys: Some(vec![ViewKey::new(ItemKey::new("a", "v1"), None)]),
            last_updated: Some(Utc::now()),
            ..ViewData::new(
                ItemQuery::filtered("meds", ItemFilter::for_type("medication.v1")),
                "meds",
            )
        };
        let decoded: ViewData =
            serde_json::from_value(serde_json::to_value(&data).unwrap()).unwrap();
        assert_eq!(decoded, data);
    }
}
