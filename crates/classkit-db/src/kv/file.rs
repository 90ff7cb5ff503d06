//! JSON-file implementation of KeyValueStore.

use async_trait::async_trait;
use classkit_core::ports::KeyValueStore;
use classkit_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Device state persisted as a single JSON object on disk.
///
/// Every write rewrites the file through a temporary sibling and a rename,
/// so a crash leaves either the old or the new document. The mutex
/// serializes read-modify-write cycles within the process.
pub struct FileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::Serialization(format!("corrupt state file {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(storage_error(&self.path, e)),
        }
    }

    async fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        debug!(path = %self.path.display(), keys = values.len(), "State file written");
        Ok(())
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> Error {
    Error::StorageUnavailable(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values).await
    }

    async fn get_or_insert(&self, key: &str, value: &str) -> Result<String> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        if let Some(existing) = values.get(key) {
            return Ok(existing.clone());
        }
        values.insert(key.to_string(), value.to_string());
        self.save(&values).await?;
        Ok(value.to_string())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.load().await?;
        if values.remove(key).is_some() {
            self.save(&values).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileKeyValueStore::new(&path);
        store.set("premium_status", "true").await.unwrap();
        store.get_or_insert("device_id", "A1B2C3D4E5F60718").await.unwrap();

        let reopened = FileKeyValueStore::new(&path);
        assert_eq!(
            reopened.get("premium_status").await.unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(
            reopened.get_or_insert("device_id", "other").await.unwrap(),
            "A1B2C3D4E5F60718"
        );
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested").join("state.json"));
        assert!(store.get("device_id").await.unwrap().is_none());

        store.set("device_id", "X").await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileKeyValueStore::new(&path);
        let err = store.get("device_id").await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[tokio::test]
    async fn test_unwritable_location_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let store = FileKeyValueStore::new(blocker.join("state.json"));
        let err = store.set("device_id", "X").await.unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }
}
