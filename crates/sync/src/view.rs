//! Ordered, named view over a synchronized store
//!
//! A view is the UI-facing shape of one saved query: an ordered key set with
//! per-key availability. Reads are local-first; a miss kicks off a read-ahead
//! download in the background and hands back a placeholder, so a list UI can
//! render instantly and fill in as items arrive.
//!
//! Per key, availability moves `NotLoaded -> LoadPending -> Available` or
//! `-> NotFound`. Load-pending is advisory, in-memory state; it never
//! persists, because no in-flight request survives a process restart.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use vitalsync_core::{CancelToken, Error, ItemQuery, Result, TypedData};

use crate::notify::ViewEvents;
use crate::pending::{PendingGetCallback, PendingGetResult};
use crate::store::{RefreshOutcome, SynchronizedStore};
use crate::view_data::ViewData;
use crate::view_key::{ViewKey, ViewKeyCollection};

/// Keys fetched per read-ahead batch unless configured otherwise
pub const DEFAULT_READ_AHEAD_CHUNK_SIZE: usize = 25;

/// An ordered, named snapshot of a query's keys with item availability
///
/// Safe for concurrent use; concurrent misses over one chunk coalesce into a
/// single download via the load-pending flags.
pub struct SynchronizedView {
    store: Arc<SynchronizedStore>,
    name: RwLock<String>,
    query: ItemQuery,
    keys: Arc<ViewKeyCollection>,
    // A snapshot exists (even an empty one) once synchronize() has run.
    has_keys: AtomicBool,
    last_updated: RwLock<Option<DateTime<Utc>>>,
    type_versions: HashSet<String>,
    read_ahead_chunk_size: AtomicUsize,
    events: Arc<ViewEvents>,
}

impl SynchronizedView {
    /// Create an in-memory (not yet persisted) view over a store
    ///
    /// The view's name defaults from the query's name.
    pub fn new(store: Arc<SynchronizedStore>, query: ItemQuery) -> Self {
        let name = query.name.clone().unwrap_or_default();
        Self::with_name(store, query, name)
    }

    /// Create a view with an explicit name
    pub fn with_name(
        store: Arc<SynchronizedStore>,
        query: ItemQuery,
        name: impl Into<String>,
    ) -> Self {
        let type_versions = query.type_versions.iter().cloned().collect();
        Self {
            store,
            name: RwLock::new(name.into()),
            query,
            keys: Arc::new(ViewKeyCollection::new()),
            has_keys: AtomicBool::new(false),
            last_updated: RwLock::new(None),
            type_versions,
            read_ahead_chunk_size: AtomicUsize::new(DEFAULT_READ_AHEAD_CHUNK_SIZE),
            events: Arc::new(ViewEvents::default()),
        }
    }

    /// Rebuild a view from its persisted state
    pub fn from_data(store: Arc<SynchronizedStore>, data: ViewData) -> Result<Self> {
        let view = Self::with_name(store, data.query, data.name);
        if let Some(keys) = data.keys {
            view.keys.replace_contents(keys)?;
            view.has_keys.store(true, Ordering::Relaxed);
        }
        *view.last_updated.write() = data.last_updated;
        Ok(view)
    }

    /// Snapshot the persistable state of this view
    pub fn data(&self) -> ViewData {
        let keys = if self.has_keys.load(Ordering::Relaxed) {
            Some(self.keys.snapshot())
        } else {
            None
        };
        ViewData {
            name: self.name(),
            query: self.query.clone(),
            keys,
            last_updated: *self.last_updated.read(),
        }
    }

    /// View name
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Rename the view (persisted on the next `put_view`)
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    /// The query this view snapshots
    pub fn query(&self) -> &ItemQuery {
        &self.query
    }

    /// The synchronized store this view reads through
    pub fn store(&self) -> &Arc<SynchronizedStore> {
        &self.store
    }

    /// The ordered key set
    pub fn keys(&self) -> &Arc<ViewKeyCollection> {
        &self.keys
    }

    /// Event subscriptions for this view
    pub fn events(&self) -> &Arc<ViewEvents> {
        &self.events
    }

    /// Number of keys in the current snapshot
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Read-ahead batch size
    pub fn read_ahead_chunk_size(&self) -> usize {
        self.read_ahead_chunk_size.load(Ordering::Relaxed)
    }

    /// Change the read-ahead batch size (must be non-zero)
    pub fn set_read_ahead_chunk_size(&self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidArgument("read_ahead_chunk_size"));
        }
        self.read_ahead_chunk_size.store(size, Ordering::Relaxed);
        Ok(())
    }

    /// True if the view has no key snapshot yet or the snapshot is older
    /// than `max_age`
    pub fn is_stale(&self, max_age: std::time::Duration) -> bool {
        if !self.has_keys.load(Ordering::Relaxed) {
            return true;
        }
        match *self.last_updated.read() {
            Some(stamp) => {
                let age = Utc::now().signed_duration_since(stamp);
                age > chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX)
            }
            None => true,
        }
    }

    /// Fully replace the key snapshot from the remote's current listing
    ///
    /// This is a full reconciliation, not a merge: the previous key set is
    /// discarded, and `last_updated` is stamped with the current time.
    pub async fn synchronize(&self, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        let record = self.store.record();
        let listed = record
            .get_keys_and_date(&self.query.filters, self.query.max_results)
            .await?;
        cancel.check()?;

        let new_keys: Vec<ViewKey> = listed.iter().map(ViewKey::from_pending_item).collect();
        let count = new_keys.len();
        self.keys.replace_contents(new_keys)?;
        self.has_keys.store(true, Ordering::Relaxed);
        *self.last_updated.write() = Some(Utc::now());
        debug!(view = %self.name(), count, "view synchronized");
        Ok(())
    }

    /// Item at `index` if locally available; otherwise `None` now, plus a
    /// background read-ahead starting at `index`
    pub async fn get_item(&self, index: usize, cancel: &CancelToken) -> Result<Option<TypedData>> {
        self.get_impl(index, false, cancel).await
    }

    /// Items for the range, placeholders included, count clamped to the
    /// available keys
    pub async fn get_items(
        &self,
        start_at: usize,
        count: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Option<TypedData>>> {
        if !self.has_keys.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }
        self.validate_index(start_at)?;
        let count = self.keys.corrected_count(start_at, count);

        let mut items = Vec::with_capacity(count);
        for index in start_at..start_at + count {
            items.push(self.get_impl(index, false, cancel).await?);
        }
        Ok(items)
    }

    /// Like [`SynchronizedView::get_item`], but awaits the triggered refresh
    ///
    /// If the key was already marked load-pending by an earlier call that
    /// was not awaited, this returns `None` instead of joining that caller's
    /// in-flight request.
    pub async fn ensure_item_available_and_get(
        &self,
        index: usize,
        cancel: &CancelToken,
    ) -> Result<Option<TypedData>> {
        self.get_impl(index, true, cancel).await
    }

    /// Batch form of [`SynchronizedView::ensure_item_available_and_get`]
    pub async fn ensure_items_available_and_get(
        &self,
        start_at: usize,
        count: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Option<TypedData>>> {
        if !self.has_keys.load(Ordering::Relaxed) {
            return Ok(Vec::new());
        }
        self.validate_index(start_at)?;
        let count = self.keys.corrected_count(start_at, count);

        let mut items = Vec::with_capacity(count);
        for index in start_at..start_at + count {
            items.push(self.get_impl(index, true, cancel).await?);
        }
        Ok(items)
    }

    /// Blocking form of [`SynchronizedView::get_item`]
    ///
    /// Runs the async operation to completion on the ambient multi-thread
    /// tokio runtime. Calling this from a task that the same runtime needs
    /// to make progress (or from a current-thread runtime) risks deadlock.
    pub fn get_item_blocking(&self, index: usize) -> Result<Option<TypedData>> {
        let handle = blocking_handle()?;
        let cancel = CancelToken::new();
        tokio::task::block_in_place(|| handle.block_on(self.get_impl(index, false, &cancel)))
    }

    /// Blocking form of [`SynchronizedView::ensure_item_available_and_get`];
    /// the same deadlock caveat applies
    pub fn ensure_item_available_and_get_blocking(
        &self,
        index: usize,
    ) -> Result<Option<TypedData>> {
        let handle = blocking_handle()?;
        let cancel = CancelToken::new();
        tokio::task::block_in_place(|| handle.block_on(self.get_impl(index, true, &cancel)))
    }

    fn validate_index(&self, index: usize) -> Result<()> {
        let count = self.keys.len();
        if !self.has_keys.load(Ordering::Relaxed) || index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }
        Ok(())
    }

    fn accepts_type(&self, type_id: &str) -> bool {
        self.type_versions.is_empty() || self.type_versions.contains(type_id)
    }

    async fn get_impl(
        &self,
        index: usize,
        should_await_refresh: bool,
        cancel: &CancelToken,
    ) -> Result<Option<TypedData>> {
        self.validate_index(index)?;
        let view_key = self.keys.get(index)?;

        if let Some(item) = self.store.local().get(&view_key.key).await? {
            if self.accepts_type(&item.type_id) {
                return Ok(Some(item));
            }
        }

        // Not available locally. Fetch it, reading ahead while we are at it.
        self.begin_refresh(index, should_await_refresh, cancel)
            .await?;

        if !should_await_refresh {
            return Ok(None);
        }
        self.store.local().get(&view_key.key).await
    }

    /// Collect up to one chunk of not-yet-pending keys starting at
    /// `start_at`, mark them pending, and refresh them
    async fn begin_refresh(
        &self,
        start_at: usize,
        should_await: bool,
        cancel: &CancelToken,
    ) -> Result<()> {
        let chunk = self.read_ahead_chunk_size();
        let to_download = self.keys.collect_for_loading(start_at, chunk);
        if to_download.is_empty() {
            // Everything in the chunk is already in flight elsewhere.
            return Ok(());
        }

        let type_versions: Vec<String> = self.type_versions.iter().cloned().collect();

        let callback: Option<PendingGetCallback> = if should_await {
            None
        } else {
            let keys = Arc::clone(&self.keys);
            let events = Arc::clone(&self.events);
            Some(Arc::new(move |result: &PendingGetResult| {
                process_completion(&keys, &events, result);
            }))
        };

        let outcome = match self
            .store
            .refresh_unchecked(&to_download, &type_versions, callback, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                // The refresh never started a download; nothing will clear
                // the flags we just set.
                self.keys.set_load_pending(&to_download, false);
                return Err(error);
            }
        };

        match outcome {
            RefreshOutcome::NoPendingWork => {
                // The items arrived through another path since we checked.
                self.keys.set_load_pending(&to_download, false);
                Ok(())
            }
            RefreshOutcome::Dispatched => Ok(()),
            RefreshOutcome::Completed(result) => {
                process_completion(&self.keys, &self.events, &result);
                result.ensure_success()
            }
        }
    }
}

fn blocking_handle() -> Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current()
        .map_err(|_| Error::InvalidOperation("blocking accessors need a tokio runtime"))
}

/// Clear pending flags for a finished batch and fire the matching events
///
/// Keys whose IDs are no longer in the collection (the snapshot was replaced
/// while the request was in flight) are skipped silently.
fn process_completion(keys: &ViewKeyCollection, events: &ViewEvents, result: &PendingGetResult) {
    match result.failure() {
        Some(error) => {
            keys.set_load_pending(&result.keys_requested, false);
            events.notify_error(error);
        }
        None => {
            if result.has_keys_found() {
                keys.set_load_pending(&result.keys_found, false);
                events.notify_items_available(&result.keys_found);
            }
            let not_found = result.keys_not_found();
            if !not_found.is_empty() {
                keys.set_load_pending(&not_found, false);
                events.notify_items_not_found(&not_found);
            }
        }
    }
}
