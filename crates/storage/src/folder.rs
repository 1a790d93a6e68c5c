//! Folder-backed object store
//!
//! One directory per store, one file per key: JSON documents as
//! `<key>.json`, blobs as `<key>.bin`, child stores as subdirectories.
//! Keys must be plain names; anything that could escape the folder is
//! rejected before I/O.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use vitalsync_core::{Error, ObjectStore, Result};

const VALUE_EXT: &str = "json";
const BLOB_EXT: &str = "bin";

/// Object store persisting each value as a file under a root directory
pub struct FolderObjectStore {
    root: PathBuf,
}

impl FolderObjectStore {
    /// Open a store rooted at an existing directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed and open a store over it
    pub async fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory this store persists into
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, key: &str, ext: &str) -> Result<PathBuf> {
        validate_name(key)?;
        Ok(self.root.join(format!("{key}.{ext}")))
    }

    async fn read_optional(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("key"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::InvalidArgument("key"));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FolderObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.file_path(key, VALUE_EXT)?;
        match self.read_optional(&path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn refresh_and_get(&self, key: &str) -> Result<Option<Value>> {
        // No cache layer here; a refresh is a plain read.
        self.get(key).await
    }

    async fn put(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.file_path(key, VALUE_EXT)?;
        let bytes = serde_json::to_vec(value)?;
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.file_path(key, VALUE_EXT)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_all(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                fs::remove_dir_all(&path).await?;
            } else {
                fs::remove_file(&path).await?;
            }
        }
        debug!(root = %self.root.display(), "object store emptied");
        Ok(())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }

    async fn get_update_date(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let path = self.file_path(key, VALUE_EXT)?;
        match fs::metadata(&path).await {
            Ok(meta) => {
                let modified = meta.modified()?;
                Ok(Some(DateTime::<Utc>::from(modified)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.file_path(key, BLOB_EXT)?;
        self.read_optional(&path).await
    }

    async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.file_path(key, BLOB_EXT)?;
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn create_child_store(&self, name: &str) -> Result<Arc<dyn ObjectStore>> {
        validate_name(name)?;
        let child = self.root.join(name);
        fs::create_dir_all(&child).await?;
        Ok(Arc::new(FolderObjectStore::new(child)))
    }

    async fn delete_child_store(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let child = self.root.join(name);
        match fs::remove_dir_all(&child).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
