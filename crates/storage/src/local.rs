//! Typed access over an object store
//!
//! `LocalStore` is the thin seam the metadata and blob namespaces use:
//! serde at the boundary, no locking of its own (the owning record store
//! serializes metadata access with its own lock).

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use vitalsync_core::{ObjectStore, Result};

/// Typed wrapper over one object-store namespace
#[derive(Clone)]
pub struct LocalStore {
    store: Arc<dyn ObjectStore>,
}

impl LocalStore {
    /// Wrap an object store
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The underlying object store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Fetch and deserialize the value under `key`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store `value` under `key`
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.store.put(key, &value).await
    }

    /// Delete the value under `key`
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key).await
    }

    /// Fetch raw bytes under `key`
    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.store.get_bytes(key).await
    }

    /// Store raw bytes under `key`
    pub async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.store.put_bytes(key, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folder::FolderObjectStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Marker {
        label: String,
        count: u32,
    }

    async fn local() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderObjectStore::create(dir.path().join("meta"))
            .await
            .unwrap();
        (dir, LocalStore::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let (_dir, store) = local().await;
        let value = Marker {
            label: "summary".into(),
            count: 3,
        };
        store.put("m", &value).await.unwrap();
        assert_eq!(store.get::<Marker>("m").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_missing_is_none() {
        let (_dir, store) = local().await;
        assert_eq!(store.get::<Marker>("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_none() {
        let (_dir, store) = local().await;
        store
            .put(
                "m",
                &Marker {
                    label: "x".into(),
                    count: 0,
                },
            )
            .await
            .unwrap();
        store.delete("m").await.unwrap();
        assert_eq!(store.get::<Marker>("m").await.unwrap(), None);
    }
}
