//! View keys and the ordered key collection
//!
//! A view holds a lightweight index entry per item: its key, its effective
//! date, and a transient load-pending flag. The collection keeps the entries
//! sorted on demand by `(effective date descending, item ID ascending)` with
//! a secondary ID index for O(log n) positional lookup.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use vitalsync_core::{Error, ItemKey, PendingItem, RecordItem, Result};

/// Index entry referencing one item within a view
///
/// `is_load_pending` is run-time state only: no in-flight request survives a
/// process restart, so the flag is excluded from serialization and always
/// loads as false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewKey {
    /// Identity of the referenced item
    pub key: ItemKey,
    /// Effective date used for ordering, if dated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
    /// True while a download for this key is in flight
    #[serde(skip)]
    pub is_load_pending: bool,
}

impl ViewKey {
    /// Create a view key
    pub fn new(key: ItemKey, effective_date: Option<DateTime<Utc>>) -> Self {
        Self {
            key,
            effective_date,
            is_load_pending: false,
        }
    }

    /// Build from a key/date listing row
    pub fn from_pending_item(item: &PendingItem) -> Self {
        Self::new(item.key.clone(), item.effective_date)
    }

    /// Build from a full item
    pub fn from_item(item: &RecordItem) -> Self {
        Self::new(item.key.clone(), item.effective_date)
    }

    /// Item ID this entry is identified by
    pub fn id(&self) -> &str {
        &self.key.id
    }
}

// Sort order: effective date descending (undated entries last), then item ID
// ascending as the deterministic tie-break.
fn compare(a_date: &Option<DateTime<Utc>>, a_id: &str, b_date: &Option<DateTime<Utc>>, b_id: &str) -> std::cmp::Ordering {
    b_date.cmp(a_date).then_with(|| a_id.cmp(b_id))
}

struct Inner {
    keys: Vec<ViewKey>,
    // ID -> effective date, enough to rebuild the sort key for binary search
    by_id: HashMap<String, Option<DateTime<Utc>>>,
    sorted: bool,
}

impl Inner {
    fn ensure_sorted(&mut self) {
        if self.sorted {
            return;
        }
        self.keys
            .sort_by(|a, b| compare(&a.effective_date, a.id(), &b.effective_date, b.id()));
        self.sorted = true;
    }

    fn add(&mut self, key: ViewKey) -> Result<()> {
        // The ID index is updated first so a duplicate is rejected before
        // the visible list changes.
        if self.by_id.contains_key(key.id()) {
            return Err(Error::DuplicateId(key.id().to_string()));
        }
        self.by_id.insert(key.id().to_string(), key.effective_date);
        self.keys.push(key);
        self.sorted = false;
        Ok(())
    }

    fn index_of_id(&mut self, id: &str) -> Option<usize> {
        let date = *self.by_id.get(id)?;
        self.ensure_sorted();
        self.keys
            .binary_search_by(|probe| compare(&probe.effective_date, probe.id(), &date, id))
            .ok()
    }

    fn corrected_count(&self, start_at: usize, count: usize) -> usize {
        count.min(self.keys.len().saturating_sub(start_at))
    }
}

/// Sorted-on-demand, ID-indexed collection of view keys
///
/// Safe for concurrent use; every operation takes the collection-wide lock.
/// Range reads snapshot under the lock, so a concurrent mutation between two
/// reads is visible (weak isolation).
pub struct ViewKeyCollection {
    inner: Mutex<Inner>,
}

impl Default for ViewKeyCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewKeyCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                keys: Vec::new(),
                by_id: HashMap::new(),
                sorted: false,
            }),
        }
    }

    /// Build a collection from existing keys, rejecting duplicate IDs
    pub fn from_keys(keys: Vec<ViewKey>) -> Result<Self> {
        let collection = Self::new();
        {
            let mut inner = collection.inner.lock();
            for key in keys {
                inner.add(key)?;
            }
        }
        Ok(collection)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    /// True if the collection holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add one key; fails on a duplicate ID without altering the set
    pub fn add(&self, key: ViewKey) -> Result<()> {
        self.inner.lock().add(key)
    }

    /// Add many keys; stops at the first duplicate
    pub fn add_range(&self, keys: impl IntoIterator<Item = ViewKey>) -> Result<()> {
        let mut inner = self.inner.lock();
        for key in keys {
            inner.add(key)?;
        }
        Ok(())
    }

    /// Add keys built from a key/date listing
    pub fn add_from_pending_items(&self, items: &[PendingItem]) -> Result<()> {
        self.add_range(items.iter().map(ViewKey::from_pending_item))
    }

    /// Replace the whole key set (used by a full resynchronization)
    pub fn replace_contents(&self, keys: Vec<ViewKey>) -> Result<()> {
        let mut staged = Inner {
            keys: Vec::new(),
            by_id: HashMap::new(),
            sorted: false,
        };
        for key in keys {
            staged.add(key)?;
        }
        *self.inner.lock() = staged;
        Ok(())
    }

    /// Drop every key
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.keys.clear();
        inner.by_id.clear();
        inner.sorted = false;
    }

    /// The key at sorted position `index`
    pub fn get(&self, index: usize) -> Result<ViewKey> {
        let mut inner = self.inner.lock();
        inner.ensure_sorted();
        inner
            .keys
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                index,
                count: inner.keys.len(),
            })
    }

    /// Look a key up by item ID
    pub fn get_by_id(&self, id: &str) -> Option<ViewKey> {
        let mut inner = self.inner.lock();
        let index = inner.index_of_id(id)?;
        Some(inner.keys[index].clone())
    }

    /// Sorted position of the key with the given item ID
    pub fn index_of_id(&self, id: &str) -> Option<usize> {
        self.inner.lock().index_of_id(id)
    }

    /// True if a key with this item ID is present
    pub fn contains_id(&self, id: &str) -> bool {
        self.inner.lock().by_id.contains_key(id)
    }

    /// Remove the key with this item ID, returning its former sorted index
    ///
    /// Index 0 is removable like any other position.
    pub fn remove_by_id(&self, id: &str) -> Option<usize> {
        let mut inner = self.inner.lock();
        let index = inner.index_of_id(id)?;
        inner.keys.remove(index);
        inner.by_id.remove(id);
        Some(index)
    }

    /// Latest effective date present, once sorted (first element)
    pub fn max_date(&self) -> Option<DateTime<Utc>> {
        let mut inner = self.inner.lock();
        inner.ensure_sorted();
        inner.keys.first().and_then(|k| k.effective_date)
    }

    /// Earliest effective date present, once sorted (last element)
    pub fn min_date(&self) -> Option<DateTime<Utc>> {
        let mut inner = self.inner.lock();
        inner.ensure_sorted();
        inner.keys.last().and_then(|k| k.effective_date)
    }

    /// Item keys for the sorted range, count clamped to the available tail
    pub fn select_item_keys(&self, start_at: usize, count: usize) -> Result<Vec<ItemKey>> {
        let mut inner = self.inner.lock();
        inner.ensure_sorted();
        if start_at >= inner.keys.len() && !(start_at == 0 && inner.keys.is_empty()) {
            return Err(Error::IndexOutOfRange {
                index: start_at,
                count: inner.keys.len(),
            });
        }
        let count = inner.corrected_count(start_at, count);
        Ok(inner.keys[start_at..start_at + count]
            .iter()
            .map(|k| k.key.clone())
            .collect())
    }

    /// Keys in the sorted range whose load-pending flag is clear
    pub fn select_keys_not_already_loading(&self, start_at: usize, count: usize) -> Vec<ViewKey> {
        let mut inner = self.inner.lock();
        inner.ensure_sorted();
        let count = inner.corrected_count(start_at, count);
        inner.keys[start_at..start_at + count]
            .iter()
            .filter(|k| !k.is_load_pending)
            .cloned()
            .collect()
    }

    /// Select the not-yet-loading keys in the range and mark them pending,
    /// in one lock scope, so concurrent misses over the same chunk coalesce
    /// into a single download
    pub fn collect_for_loading(&self, start_at: usize, count: usize) -> Vec<ItemKey> {
        let mut inner = self.inner.lock();
        inner.ensure_sorted();
        let count = inner.corrected_count(start_at, count);
        let mut selected = Vec::new();
        for key in &mut inner.keys[start_at..start_at + count] {
            if !key.is_load_pending {
                key.is_load_pending = true;
                selected.push(key.key.clone());
            }
        }
        selected
    }

    /// Set the load-pending flag for each key, matched by item ID
    ///
    /// Keys no longer present (the set changed since the request was issued)
    /// are skipped silently.
    pub fn set_load_pending(&self, keys: &[ItemKey], pending: bool) {
        let mut inner = self.inner.lock();
        for key in keys {
            if let Some(index) = inner.index_of_id(&key.id) {
                inner.keys[index].is_load_pending = pending;
            }
        }
    }

    /// Clamp `count` so `start_at + count` stays within the key range
    pub fn corrected_count(&self, start_at: usize, count: usize) -> usize {
        self.inner.lock().corrected_count(start_at, count)
    }

    /// Sorted snapshot of the keys, for persistence
    pub fn snapshot(&self) -> Vec<ViewKey> {
        let mut inner = self.inner.lock();
        inner.ensure_sorted();
        inner.keys.clone()
    }
}
