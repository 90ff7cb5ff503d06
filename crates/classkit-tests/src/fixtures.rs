//! Test fixtures for simulated devices.

use classkit_core::ports::{KeyValueStore, LicenseAuthority};
use classkit_db::MemoryKeyValueStore;
use classkit_licensing::{
    DeviceIdentity, DeviceInfo, FeatureGate, GatePolicy, HttpLicenseAuthority, LicenseManager,
    RemoteConfig, TrialClock,
};
use std::sync::Arc;

/// Factory for device descriptions.
pub struct DeviceFixture;

impl DeviceFixture {
    pub fn info(name: &str) -> DeviceInfo {
        DeviceInfo {
            hostname: name.to_lowercase(),
            device_name: name.to_string(),
            os_name: "android".to_string(),
            os_version: "14".to_string(),
            arch: "aarch64".to_string(),
            cpu_count: 8,
            installation_id: None,
        }
    }
}

/// One simulated installation with its own local storage.
pub struct SimulatedDevice {
    pub store: Arc<dyn KeyValueStore>,
    pub manager: LicenseManager,
    pub trial: TrialClock,
    pub gate: FeatureGate,
}

impl SimulatedDevice {
    pub fn new(name: &str, authority: Arc<dyn LicenseAuthority>) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let info = DeviceFixture::info(name);
        let identity = Arc::new(DeviceIdentity::new(store.clone(), info.clone()));
        let trial = TrialClock::new(store.clone());

        Self {
            manager: LicenseManager::new(identity, authority, store.clone(), info),
            gate: FeatureGate::new(trial.clone(), GatePolicy::default()),
            trial,
            store,
        }
    }

    /// A device that talks to the license service at `api_url`.
    pub fn remote(name: &str, api_url: &str) -> anyhow::Result<Self> {
        let authority = HttpLicenseAuthority::new(RemoteConfig {
            api_url: api_url.to_string(),
            ..Default::default()
        })?;
        Ok(Self::new(name, Arc::new(authority)))
    }
}
