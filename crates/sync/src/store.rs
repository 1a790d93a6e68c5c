//! Read-through/write-through synchronization over a local item store
//!
//! Read-only synchronization: reads come from the local store first, and
//! whatever is missing or type-mismatched is downloaded from the remote
//! record, either awaited (the caller sees the completed list) or in the
//! background (the caller gets the local items now and a completion callback
//! later). Writes pass through to the local store without remote interaction.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use vitalsync_core::{
    CancelToken, Error, ItemKey, ItemQuery, ItemSections, Record, RecordItem, Result, TypedData,
};
use vitalsync_storage::LocalItemStore;

use crate::pending::{dispatch_completion, PendingGetCallback, PendingGetResult};

/// What a refresh did, for callers that manage per-key pending state
pub(crate) enum RefreshOutcome {
    /// Every key was already locally present and acceptable
    NoPendingWork,
    /// The download is running in the background; the callback observes it
    Dispatched,
    /// The awaited download finished; the result may carry a failure
    Completed(PendingGetResult),
}

/// Orchestrator reconciling a local item store with one remote record
pub struct SynchronizedStore {
    record: RwLock<Arc<dyn Record>>,
    local: Arc<LocalItemStore>,
    sections_to_fetch: RwLock<ItemSections>,
}

impl SynchronizedStore {
    /// Create a synchronized store over a record and its local item store
    pub fn new(record: Arc<dyn Record>, local: Arc<LocalItemStore>) -> Self {
        Self {
            record: RwLock::new(record),
            local,
            sections_to_fetch: RwLock::new(ItemSections::Standard),
        }
    }

    /// Current remote record handle
    pub fn record(&self) -> Arc<dyn Record> {
        Arc::clone(&self.record.read())
    }

    /// Swap in a reissued record handle (fresh auth context)
    pub fn set_record(&self, record: Arc<dyn Record>) {
        *self.record.write() = record;
    }

    /// The local item store serving reads
    pub fn local(&self) -> &Arc<LocalItemStore> {
        &self.local
    }

    /// Sections requested by downloads
    pub fn sections_to_fetch(&self) -> ItemSections {
        *self.sections_to_fetch.read()
    }

    /// Change the sections requested by downloads
    pub fn set_sections_to_fetch(&self, sections: ItemSections) {
        *self.sections_to_fetch.write() = sections;
    }

    /// Fetch typed payloads for `keys`, positionally aligned
    ///
    /// Each slot is the payload if locally available and acceptable, else a
    /// `None` placeholder. Without a callback the call waits for the missing
    /// entries to download and fills them in; with a callback it returns the
    /// local state immediately and notifies once the background fetch ends.
    pub async fn get(
        &self,
        keys: &[ItemKey],
        type_versions: &[String],
        callback: Option<PendingGetCallback>,
        cancel: &CancelToken,
    ) -> Result<Vec<Option<TypedData>>> {
        let items = self.get_items(keys, type_versions, callback, cancel).await?;
        Ok(items
            .into_iter()
            .map(|item| item.and_then(RecordItem::into_typed_data))
            .collect())
    }

    /// Like [`SynchronizedStore::get`], returning full items
    pub async fn get_items(
        &self,
        keys: &[ItemKey],
        type_versions: &[String],
        callback: Option<PendingGetCallback>,
        cancel: &CancelToken,
    ) -> Result<Vec<Option<RecordItem>>> {
        if keys.is_empty() {
            return Err(Error::InvalidArgument("keys"));
        }

        // Aligned local pass: None slots mark items we do not have yet.
        let mut found = self.local.get_items_aligned(keys, cancel).await?;

        let pending = collect_keys_needing_download(keys, type_versions, &found);
        if pending.is_empty() {
            return Ok(found);
        }

        let result = self
            .download_impl(&pending, type_versions, callback, cancel, true)
            .await?;

        // Background mode: the caller gets the local state as-is.
        let Some(result) = result else {
            return Ok(found);
        };

        if result.has_keys_found() {
            self.load_new_items(&mut found, keys, &result.keys_found, cancel)
                .await?;
        }
        Ok(found)
    }

    /// Write one item to the local store; no remote interaction
    pub async fn put(&self, item: &RecordItem) -> Result<()> {
        self.local.put_item(item).await
    }

    /// Write items to the local store; no remote interaction
    pub async fn put_items(&self, items: &[RecordItem], cancel: &CancelToken) -> Result<()> {
        self.local.put_items(items, cancel).await
    }

    /// Ensure local freshness for `keys` without returning items
    ///
    /// `Ok(None)` means no pending work: every key was already present and
    /// acceptable (or the download was dispatched to the background).
    pub async fn refresh(
        &self,
        keys: &[ItemKey],
        type_versions: &[String],
        callback: Option<PendingGetCallback>,
        cancel: &CancelToken,
    ) -> Result<Option<PendingGetResult>> {
        match self.refresh_impl(keys, type_versions, callback, cancel).await? {
            RefreshOutcome::Completed(result) => {
                result.ensure_success()?;
                Ok(Some(result))
            }
            RefreshOutcome::NoPendingWork | RefreshOutcome::Dispatched => Ok(None),
        }
    }

    /// Unconditionally (re)fetch `keys` from the remote
    pub async fn download(
        &self,
        keys: &[ItemKey],
        type_versions: &[String],
        callback: Option<PendingGetCallback>,
        cancel: &CancelToken,
    ) -> Result<Option<PendingGetResult>> {
        if keys.is_empty() {
            return Err(Error::InvalidArgument("keys"));
        }
        self.download_impl(keys, type_versions, callback, cancel, true)
            .await
    }

    /// Refresh without re-raising a captured batch failure
    ///
    /// The awaited result carries its failure for the caller to process;
    /// used by views, which clear their load-pending flags first.
    pub(crate) async fn refresh_unchecked(
        &self,
        keys: &[ItemKey],
        type_versions: &[String],
        callback: Option<PendingGetCallback>,
        cancel: &CancelToken,
    ) -> Result<RefreshOutcome> {
        self.refresh_impl(keys, type_versions, callback, cancel).await
    }

    async fn refresh_impl(
        &self,
        keys: &[ItemKey],
        type_versions: &[String],
        callback: Option<PendingGetCallback>,
        cancel: &CancelToken,
    ) -> Result<RefreshOutcome> {
        let found = self.local.get_items_aligned(keys, cancel).await?;
        let pending = collect_keys_needing_download(keys, type_versions, &found);
        if pending.is_empty() {
            return Ok(RefreshOutcome::NoPendingWork);
        }
        match self
            .download_impl(&pending, type_versions, callback, cancel, false)
            .await?
        {
            Some(result) => Ok(RefreshOutcome::Completed(result)),
            None => Ok(RefreshOutcome::Dispatched),
        }
    }

    /// Run the download either awaited or in the background
    ///
    /// Awaited (`callback` is `None`): returns `Some(result)`; when `check`
    /// is set, a captured failure is re-raised here. Background: spawns the
    /// fetch, returns `Ok(None)` immediately, and the callback is the only
    /// observer of the outcome.
    async fn download_impl(
        &self,
        keys: &[ItemKey],
        type_versions: &[String],
        callback: Option<PendingGetCallback>,
        cancel: &CancelToken,
        check: bool,
    ) -> Result<Option<PendingGetResult>> {
        let record = self.record();
        let local = Arc::clone(&self.local);
        let sections = self.sections_to_fetch();
        let keys = keys.to_vec();
        let type_versions = type_versions.to_vec();

        if let Some(callback) = callback {
            let cancel = cancel.clone();
            debug!(count = keys.len(), "background download dispatched");
            tokio::spawn(async move {
                download_items(record, local, sections, keys, type_versions, Some(callback), cancel)
                    .await;
            });
            return Ok(None);
        }

        let result = download_items(
            record,
            local,
            sections,
            keys,
            type_versions,
            None,
            cancel.clone(),
        )
        .await;
        if check {
            result.ensure_success()?;
        }
        Ok(Some(result))
    }

    /// Reload the slots whose keys the download found, so any cache layer
    /// observes the just-written items
    async fn load_new_items(
        &self,
        items: &mut [Option<RecordItem>],
        keys_requested: &[ItemKey],
        keys_found: &[ItemKey],
        cancel: &CancelToken,
    ) -> Result<()> {
        if items.len() != keys_requested.len() {
            return Err(Error::InternalConsistency(format!(
                "item list length {} != requested key count {}",
                items.len(),
                keys_requested.len()
            )));
        }

        let found: HashSet<(&str, &str)> = keys_found
            .iter()
            .map(|k| (k.id.as_str(), k.version.as_str()))
            .collect();

        for (slot, requested) in items.iter_mut().zip(keys_requested) {
            cancel.check()?;
            if found.contains(&(requested.id.as_str(), requested.version.as_str())) {
                *slot = self.local.get_item(requested).await?;
            }
        }
        Ok(())
    }
}

/// Keys at each ordinal whose local item is absent or fails the
/// type-version check
fn collect_keys_needing_download(
    requested: &[ItemKey],
    type_versions: &[String],
    local_items: &[Option<RecordItem>],
) -> Vec<ItemKey> {
    let versions: Option<HashSet<&str>> = if type_versions.is_empty() {
        None
    } else {
        Some(type_versions.iter().map(String::as_str).collect())
    };

    requested
        .iter()
        .zip(local_items)
        .filter(|(_, local)| match local {
            None => true,
            Some(item) => versions
                .as_ref()
                .is_some_and(|set| !set.contains(item.item_type.id.as_str())),
        })
        .map(|(key, _)| key.clone())
        .collect()
}

/// Execute one batch download: query the remote for exactly `keys`, write
/// everything returned into the local store, and record the outcome
///
/// Failures are captured into the result, never thrown; the completion
/// callback (if any) is always invoked exactly once.
async fn download_items(
    record: Arc<dyn Record>,
    local: Arc<LocalItemStore>,
    sections: ItemSections,
    keys: Vec<ItemKey>,
    type_versions: Vec<String>,
    callback: Option<PendingGetCallback>,
    cancel: CancelToken,
) -> PendingGetResult {
    let mut result = PendingGetResult::new(keys.clone());

    let outcome = async {
        cancel.check()?;
        let query = ItemQuery {
            sections,
            type_versions,
            ..ItemQuery::for_keys(keys)
        };
        let items = record.get_all_items(&query).await?;
        cancel.check()?;
        local.put_items(&items, &cancel).await?;
        Ok::<Vec<ItemKey>, Error>(items.into_iter().map(|item| item.key).collect())
    }
    .await;

    match outcome {
        Ok(found) => result.keys_found = found,
        Err(error) => {
            warn!(%error, "batch download failed");
            result.set_failure(error);
        }
    }

    dispatch_completion(callback.as_ref(), &result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vitalsync_core::ItemType;

    fn item(id: &str, version: &str, type_id: &str) -> RecordItem {
        RecordItem::new(
            ItemKey::new(id, version),
            ItemType::new(type_id),
            TypedData::new(type_id, json!({"id": id})),
        )
    }

    fn keys(ids: &[&str]) -> Vec<ItemKey> {
        ids.iter().map(|id| ItemKey::new(*id, "v1")).collect()
    }

    // === Needs-download decision ===

    #[test]
    fn test_missing_slots_need_download() {
        let requested = keys(&["a", "b", "c"]);
        let local = vec![Some(item("a", "v1", "t")), None, None];
        let pending = collect_keys_needing_download(&requested, &[], &local);
        let ids: Vec<&str> = pending.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_empty_type_version_set_accepts_any_type() {
        let requested = keys(&["a"]);
        let local = vec![Some(item("a", "v1", "anything"))];
        assert!(collect_keys_needing_download(&requested, &[], &local).is_empty());
    }

    #[test]
    fn test_unlisted_type_needs_download() {
        let requested = keys(&["a", "b"]);
        let local = vec![
            Some(item("a", "v1", "weight.v1")),
            Some(item("b", "v1", "weight.v2")),
        ];
        let pending =
            collect_keys_needing_download(&requested, &["weight.v2".to_string()], &local);
        let ids: Vec<&str> = pending.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_all_local_means_no_pending() {
        let requested = keys(&["a", "b"]);
        let local = vec![Some(item("a", "v1", "t")), Some(item("b", "v1", "t"))];
        assert!(collect_keys_needing_download(&requested, &[], &local).is_empty());
    }
}
