//! Shared test fixtures: a scripted remote record and store builders

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Semaphore;

use vitalsync_core::{
    Error, ItemFilter, ItemKey, ItemQuery, ItemType, PendingItem, Record, RecordItem, Result,
    TypedData,
};
use vitalsync_storage::{FolderObjectStore, LocalItemStore};
use vitalsync_sync::SynchronizedStore;

/// Scripted remote record: a map of items, a key listing, a call counter,
/// an optional failure switch, and a gate for holding downloads open.
pub struct FakeRecord {
    id: String,
    items: Mutex<HashMap<String, RecordItem>>,
    listing: Mutex<Vec<PendingItem>>,
    item_calls: AtomicUsize,
    listing_calls: AtomicUsize,
    fail_downloads: AtomicBool,
    holding: AtomicBool,
    gate: Semaphore,
}

impl FakeRecord {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            items: Mutex::new(HashMap::new()),
            listing: Mutex::new(Vec::new()),
            item_calls: AtomicUsize::new(0),
            listing_calls: AtomicUsize::new(0),
            fail_downloads: AtomicBool::new(false),
            holding: AtomicBool::new(false),
            gate: Semaphore::new(0),
        })
    }

    /// Make an item available remotely and list it with the given date
    pub fn add_item(&self, item: RecordItem, effective_date: Option<DateTime<Utc>>) {
        self.listing.lock().push(PendingItem {
            key: item.key.clone(),
            effective_date,
        });
        self.items.lock().insert(item.key.id.clone(), item);
    }

    /// List a key without holding an item for it (downloads will miss it)
    pub fn add_phantom(&self, key: ItemKey, effective_date: Option<DateTime<Utc>>) {
        self.listing.lock().push(PendingItem {
            key,
            effective_date,
        });
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    pub fn fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    /// Make `get_all_items` wait for a matching `release_download` call
    pub fn hold_downloads(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    /// Let one held download proceed
    pub fn release_download(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl Record for FakeRecord {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_all_items(&self, query: &ItemQuery) -> Result<Vec<RecordItem>> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        if self.holding.load(Ordering::SeqCst) {
            self.gate.acquire().await.expect("gate closed").forget();
        }
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(Error::Remote("service unavailable".into()));
        }
        let items = self.items.lock();
        Ok(query
            .keys
            .iter()
            .filter_map(|key| items.get(&key.id).cloned())
            .collect())
    }

    async fn get_keys_and_date(
        &self,
        _filters: &[ItemFilter],
        max_results: Option<u32>,
    ) -> Result<Vec<PendingItem>> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let mut listing = self.listing.lock().clone();
        if let Some(max) = max_results {
            listing.truncate(max as usize);
        }
        Ok(listing)
    }
}

/// An item whose type-version matches its payload
pub fn item(id: &str, version: &str, type_id: &str) -> RecordItem {
    RecordItem::new(
        ItemKey::new(id, version),
        ItemType::new(type_id),
        TypedData::new(type_id, json!({ "id": id, "version": version })),
    )
}

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, d, 9, 0, 0).unwrap()
}

/// A synchronized store over a fresh folder-backed item store
pub async fn synced_store(
    record: Arc<FakeRecord>,
) -> (tempfile::TempDir, Arc<SynchronizedStore>) {
    let dir = tempfile::tempdir().unwrap();
    let folder = FolderObjectStore::create(dir.path().join("Data"))
        .await
        .unwrap();
    let local = Arc::new(LocalItemStore::new(Arc::new(folder), None));
    let store = Arc::new(SynchronizedStore::new(record as Arc<dyn Record>, local));
    (dir, store)
}
