//! Per-installation device identity.

use async_trait::async_trait;
use chrono::Utc;
use classkit_core::Result;
use classkit_core::ids::DeviceId;
use classkit_core::keys;
use classkit_core::ports::{DeviceIdentityProvider, KeyValueStore};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

/// Length of the device token in hex characters.
const DEVICE_ID_LEN: usize = 16;

/// Attributes of the machine we are running on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub hostname: String,
    pub device_name: String,
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub cpu_count: usize,
    /// OS-provided installation identifier, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
}

impl DeviceInfo {
    /// Gather what the OS tells us about this machine.
    pub fn collect() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        let os_name = std::env::consts::OS.to_string();
        let os_version = os_version().unwrap_or_else(|| "unknown".to_string());
        let arch = std::env::consts::ARCH.to_string();

        Self {
            device_name: format!("{} ({} {})", hostname, os_name, arch),
            hostname,
            os_name,
            os_version,
            arch,
            cpu_count: num_cpus::get(),
            installation_id: installation_id(),
        }
    }

    fn fingerprint_material(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.hostname,
            self.os_name,
            self.os_version,
            self.arch,
            self.cpu_count,
            self.installation_id.as_deref().unwrap_or("")
        )
    }
}

#[cfg(target_os = "linux")]
fn os_version() -> Option<String> {
    let content = std::fs::read_to_string("/etc/os-release").ok()?;
    content
        .lines()
        .find_map(|line| line.strip_prefix("VERSION_ID="))
        .map(|v| v.trim_matches('"').to_string())
}

#[cfg(not(target_os = "linux"))]
fn os_version() -> Option<String> {
    None
}

fn installation_id() -> Option<String> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .find_map(|path| std::fs::read_to_string(path).ok())
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Derive a fresh token from device attributes, the clock and random bytes.
///
/// The token is not attested. Clearing local storage yields a new identity,
/// which the registry sees as a new device.
pub fn derive_device_id(info: &DeviceInfo) -> DeviceId {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(info.fingerprint_material().as_bytes());
    hasher.update(Utc::now().timestamp_millis().to_be_bytes());
    hasher.update(salt);
    let digest = hex::encode_upper(hasher.finalize());

    DeviceId::new(&digest[..DEVICE_ID_LEN])
}

/// Stable device identifier persisted in the local store.
#[derive(Clone)]
pub struct DeviceIdentity {
    store: Arc<dyn KeyValueStore>,
    info: DeviceInfo,
}

impl DeviceIdentity {
    pub fn new(store: Arc<dyn KeyValueStore>, info: DeviceInfo) -> Self {
        Self { store, info }
    }

    /// Identity over the real machine attributes.
    pub fn from_system(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, DeviceInfo::collect())
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Read the persisted id or create it. Concurrent first calls agree on
    /// one value because creation is an insert-if-absent.
    pub async fn get_or_create_device_id(&self) -> Result<DeviceId> {
        if let Some(existing) = self.store.get(keys::DEVICE_ID).await? {
            debug!(device_id = %existing, "Using stored device id");
            return Ok(DeviceId::new(existing));
        }

        let candidate = derive_device_id(&self.info);
        let stored = self
            .store
            .get_or_insert(keys::DEVICE_ID, candidate.as_str())
            .await?;
        if stored == candidate.as_str() {
            info!(device_id = %stored, "Created device id");
        }
        Ok(DeviceId::new(stored))
    }
}

#[async_trait]
impl DeviceIdentityProvider for DeviceIdentity {
    async fn device_id(&self) -> Result<DeviceId> {
        self.get_or_create_device_id().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classkit_core::Error;
    use classkit_db::MemoryKeyValueStore;

    fn sample_info() -> DeviceInfo {
        DeviceInfo {
            hostname: "classroom-01".to_string(),
            device_name: "classroom-01 (linux x86_64)".to_string(),
            os_name: "linux".to_string(),
            os_version: "12".to_string(),
            arch: "x86_64".to_string(),
            cpu_count: 4,
            installation_id: Some("abc".to_string()),
        }
    }

    #[test]
    fn test_derived_id_shape() {
        let id = derive_device_id(&sample_info());
        assert_eq!(id.as_str().len(), DEVICE_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_derivation_includes_entropy() {
        let info = sample_info();
        assert_ne!(derive_device_id(&info), derive_device_id(&info));
    }

    #[tokio::test]
    async fn test_device_id_is_stable() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let identity = DeviceIdentity::new(store.clone(), sample_info());

        let first = identity.get_or_create_device_id().await.unwrap();
        let second = identity.get_or_create_device_id().await.unwrap();
        assert_eq!(first, second);

        // A second provider over the same storage sees the same id
        let other = DeviceIdentity::new(store, sample_info());
        assert_eq!(other.device_id().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_converge() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let identity = DeviceIdentity::new(store, sample_info());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let identity = identity.clone();
                tokio::spawn(async move { identity.get_or_create_device_id().await.unwrap() })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::StorageUnavailable("disk gone".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::StorageUnavailable("disk gone".to_string()))
        }
        async fn get_or_insert(&self, _key: &str, _value: &str) -> Result<String> {
            Err(Error::StorageUnavailable("disk gone".to_string()))
        }
        async fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::StorageUnavailable("disk gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let identity = DeviceIdentity::new(Arc::new(BrokenStore), sample_info());
        let err = identity.get_or_create_device_id().await.unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }

    #[test]
    fn test_collect_fills_basics() {
        let info = DeviceInfo::collect();
        assert!(!info.os_name.is_empty());
        assert!(!info.arch.is_empty());
        assert!(info.cpu_count >= 1);
    }
}
