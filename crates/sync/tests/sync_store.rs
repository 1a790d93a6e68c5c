//! Synchronized store behavior against a scripted remote

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{item, synced_store, FakeRecord};
use vitalsync_core::{CancelToken, Error, ItemKey};
use vitalsync_sync::{PendingGetCallback, PendingGetResult};

fn keys(ids: &[&str]) -> Vec<ItemKey> {
    ids.iter().map(|id| ItemKey::new(*id, "v1")).collect()
}

// === Awaited gets ===

#[tokio::test]
async fn awaited_get_fills_missing_items_from_remote() {
    let record = FakeRecord::new("r1");
    record.add_item(item("b", "v1", "t"), None);
    record.add_item(item("c", "v1", "t"), None);
    let (_dir, store) = synced_store(Arc::clone(&record)).await;

    store.put(&item("a", "v1", "t")).await.unwrap();

    let requested = keys(&["a", "b", "c"]);
    let result = store
        .get(&requested, &[], None, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    assert!(result.iter().all(Option::is_some));
    assert_eq!(record.item_calls(), 1);

    // The downloaded items are now local; a second get stays local.
    let again = store
        .get(&requested, &[], None, &CancelToken::new())
        .await
        .unwrap();
    assert!(again.iter().all(Option::is_some));
    assert_eq!(record.item_calls(), 1);
}

#[tokio::test]
async fn merge_keeps_placeholders_for_keys_the_remote_lacks() {
    // Requested [a, b, c]; local has a; remote has b only.
    let record = FakeRecord::new("r1");
    record.add_item(item("b", "v1", "t"), None);
    let (_dir, store) = synced_store(Arc::clone(&record)).await;
    store.put(&item("a", "v1", "t")).await.unwrap();

    let result = store
        .get_items(&keys(&["a", "b", "c"]), &[], None, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result[0].as_ref().unwrap().key.id, "a");
    assert_eq!(result[1].as_ref().unwrap().key.id, "b");
    assert!(result[2].is_none());
}

#[tokio::test]
async fn result_slots_never_hold_a_different_key() {
    let record = FakeRecord::new("r1");
    record.add_item(item("b", "v1", "t"), None);
    let (_dir, store) = synced_store(record).await;

    let requested = keys(&["b", "a"]);
    let result = store
        .get_items(&requested, &[], None, &CancelToken::new())
        .await
        .unwrap();

    for (slot, key) in result.iter().zip(&requested) {
        if let Some(item) = slot {
            assert_eq!(item.key.id, key.id);
        }
    }
}

#[tokio::test]
async fn empty_key_list_is_a_validation_error() {
    let record = FakeRecord::new("r1");
    let (_dir, store) = synced_store(record).await;
    let err = store
        .get(&[], &[], None, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument("keys")));
}

// === Type-version staleness ===

#[tokio::test]
async fn unlisted_type_version_triggers_redownload() {
    let record = FakeRecord::new("r1");
    record.add_item(item("a", "v1", "weight.v2"), None);
    let (_dir, store) = synced_store(Arc::clone(&record)).await;

    // Locally stored under the old schema version
    store.put(&item("a", "v1", "weight.v1")).await.unwrap();

    let result = store
        .get_items(
            &keys(&["a"]),
            &["weight.v2".to_string()],
            None,
            &CancelToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(record.item_calls(), 1);
    assert_eq!(result[0].as_ref().unwrap().item_type.id, "weight.v2");
}

// === Background gets ===

#[tokio::test]
async fn background_get_returns_placeholders_then_notifies_once() {
    let record = FakeRecord::new("r1");
    record.add_item(item("b", "v1", "t"), None);
    let (_dir, store) = synced_store(Arc::clone(&record)).await;
    store.put(&item("a", "v1", "t")).await.unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let calls = Arc::new(AtomicUsize::new(0));
    let callback: PendingGetCallback = {
        let calls = Arc::clone(&calls);
        Arc::new(move |result: &PendingGetResult| {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(result.clone());
        })
    };

    let immediate = store
        .get(&keys(&["a", "b"]), &[], Some(callback), &CancelToken::new())
        .await
        .unwrap();

    // Local state now: a present, b pending
    assert!(immediate[0].is_some());
    assert!(immediate[1].is_none());

    let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("callback within deadline")
        .expect("callback fired");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.keys_found.len(), 1);
    assert_eq!(result.keys_found[0].id, "b");

    // And the item is locally available afterwards
    let after = store
        .get(&keys(&["b"]), &[], None, &CancelToken::new())
        .await
        .unwrap();
    assert!(after[0].is_some());
}

#[tokio::test]
async fn background_failure_reaches_only_the_callback() {
    let record = FakeRecord::new("r1");
    record.fail_downloads(true);
    let (_dir, store) = synced_store(Arc::clone(&record)).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let callback: PendingGetCallback = Arc::new(move |result: &PendingGetResult| {
        let _ = tx.send(result.failure().is_some());
    });

    // The call itself succeeds: local items now, failure later via callback.
    let immediate = store
        .get(&keys(&["a"]), &[], Some(callback), &CancelToken::new())
        .await
        .unwrap();
    assert!(immediate[0].is_none());

    let failed = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(failed);
}

// === Refresh ===

#[tokio::test]
async fn refresh_is_idempotent_when_nothing_changed() {
    let record = FakeRecord::new("r1");
    record.add_item(item("a", "v1", "t"), None);
    record.add_item(item("b", "v1", "t"), None);
    let (_dir, store) = synced_store(Arc::clone(&record)).await;

    let first = store
        .refresh(&keys(&["a", "b"]), &[], None, &CancelToken::new())
        .await
        .unwrap();
    assert!(first.is_some());
    assert_eq!(record.item_calls(), 1);

    // Everything is now local and version-matching: no pending work.
    let second = store
        .refresh(&keys(&["a", "b"]), &[], None, &CancelToken::new())
        .await
        .unwrap();
    assert!(second.is_none());
    assert_eq!(record.item_calls(), 1);
}

#[tokio::test]
async fn awaited_refresh_reraises_remote_failure() {
    let record = FakeRecord::new("r1");
    record.fail_downloads(true);
    let (_dir, store) = synced_store(record).await;

    let err = store
        .refresh(&keys(&["a"]), &[], None, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Download(_)));
}

// === Forced download ===

#[tokio::test]
async fn download_refetches_even_when_local_is_fresh() {
    let record = FakeRecord::new("r1");
    record.add_item(item("a", "v1", "t"), None);
    let (_dir, store) = synced_store(Arc::clone(&record)).await;
    store.put(&item("a", "v1", "t")).await.unwrap();

    let result = store
        .download(&keys(&["a"]), &[], None, &CancelToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.item_calls(), 1);
    assert_eq!(result.keys_found.len(), 1);
    assert!(result.keys_not_found().is_empty());
}

// === Writes and cancellation ===

#[tokio::test]
async fn puts_never_touch_the_remote() {
    let record = FakeRecord::new("r1");
    let (_dir, store) = synced_store(Arc::clone(&record)).await;

    store.put(&item("a", "v1", "t")).await.unwrap();
    store
        .put_items(
            &[item("b", "v1", "t"), item("c", "v1", "t")],
            &CancelToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(record.item_calls(), 0);
    assert_eq!(record.listing_calls(), 0);
}

#[tokio::test]
async fn cancelled_get_unwinds_before_remote_work() {
    let record = FakeRecord::new("r1");
    let (_dir, store) = synced_store(Arc::clone(&record)).await;

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = store
        .get(&keys(&["a"]), &[], None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(record.item_calls(), 0);
}
