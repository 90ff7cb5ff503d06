//! JSON-file implementation of LicenseStore, for single-machine setups.

use async_trait::async_trait;
use chrono::Utc;
use classkit_core::ids::LicenseCode;
use classkit_core::license::{LicenseSlot, SlotRecord};
use classkit_core::ports::LicenseStore;
use classkit_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Registry persisted as one JSON document keyed by code.
///
/// The mutex is held across each read-modify-write, which makes
/// `compare_and_swap` atomic within the process. Writes go through a
/// temporary sibling and a rename.
pub struct FileLicenseStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLicenseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<LicenseCode, SlotRecord>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::Serialization(format!("corrupt registry {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(storage_error(&self.path, e)),
        }
    }

    async fn save(&self, records: &BTreeMap<LicenseCode, SlotRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }

        let content = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| storage_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))?;
        debug!(path = %self.path.display(), codes = records.len(), "Registry file written");
        Ok(())
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> Error {
    Error::StorageUnavailable(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl LicenseStore for FileLicenseStore {
    async fn get(&self, code: &LicenseCode) -> Result<Option<SlotRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(code))
    }

    async fn insert_if_absent(&self, code: &LicenseCode, slot: &LicenseSlot) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.contains_key(code) {
            return Ok(false);
        }
        records.insert(
            code.clone(),
            SlotRecord {
                code: code.clone(),
                slot: slot.clone(),
                version: 0,
                created_at: Utc::now(),
            },
        );
        self.save(&records).await?;
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        code: &LicenseCode,
        expected_version: u64,
        slot: &LicenseSlot,
    ) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        match records.get_mut(code) {
            Some(record) if record.version == expected_version => {
                record.slot = slot.clone();
                record.version += 1;
            }
            _ => return Ok(false),
        }
        self.save(&records).await?;
        Ok(true)
    }

    async fn remove(&self, code: &LicenseCode) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.remove(code).is_none() {
            return Ok(false);
        }
        self.save(&records).await?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<SlotRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classkit_core::ids::DeviceId;

    #[tokio::test]
    async fn test_activations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let code = LicenseCode::new("COFFEE2024");

        let store = FileLicenseStore::new(&path);
        assert!(store.insert_if_absent(&code, &LicenseSlot::new(1)).await.unwrap());
        let mut slot = LicenseSlot::new(1);
        slot.claim(&DeviceId::new("AAA111"));
        assert!(store.compare_and_swap(&code, 0, &slot).await.unwrap());

        let reopened = FileLicenseStore::new(&path);
        let record = reopened.get(&code).await.unwrap().unwrap();
        assert_eq!(record.version, 1);
        assert!(record.slot.contains(&DeviceId::new("AAA111")));
        assert!(!reopened.compare_and_swap(&code, 0, &LicenseSlot::new(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_and_list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLicenseStore::new(dir.path().join("registry.json"));
        for code in ["LITOI_UNLOCK", "CAMEROON_EDU"] {
            store.insert_if_absent(&LicenseCode::new(code), &LicenseSlot::new(1)).await.unwrap();
        }

        let codes: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.code.to_string()).collect();
        assert_eq!(codes, vec!["CAMEROON_EDU", "LITOI_UNLOCK"]);

        assert!(store.remove(&LicenseCode::new("CAMEROON_EDU")).await.unwrap());
        assert!(!store.remove(&LicenseCode::new("CAMEROON_EDU")).await.unwrap());
    }
}
