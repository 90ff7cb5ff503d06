//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the licensing domain and its
//! adapters: the registry store, the per-device state, the activation
//! authority and the device identity source.

use crate::ids::{DeviceId, LicenseCode};
use crate::license::{ActivationOutcome, LicenseSlot, SlotRecord};
use crate::Result;
use async_trait::async_trait;

/// Storage for the code → slot registry.
///
/// Writes to an existing slot go through [`LicenseStore::compare_and_swap`]
/// so that a read-decide-write cycle on one code is atomic.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Get a slot by code.
    async fn get(&self, code: &LicenseCode) -> Result<Option<SlotRecord>>;

    /// Insert a slot unless the code exists. Returns true if inserted.
    async fn insert_if_absent(&self, code: &LicenseCode, slot: &LicenseSlot) -> Result<bool>;

    /// Replace a slot if its stored version still equals `expected_version`.
    /// Returns false when the version moved or the code is gone.
    async fn compare_and_swap(
        &self,
        code: &LicenseCode,
        expected_version: u64,
        slot: &LicenseSlot,
    ) -> Result<bool>;

    /// Delete a slot. Returns true if it existed.
    async fn remove(&self, code: &LicenseCode) -> Result<bool>;

    /// List all slots.
    async fn list(&self) -> Result<Vec<SlotRecord>>;
}

/// Small string key-value store holding the state of one device.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write `value` only if `key` is absent. Returns the value now stored.
    async fn get_or_insert(&self, key: &str, value: &str) -> Result<String>;

    /// Delete a value. Missing keys are not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Whatever decides activation requests: a local registry or a remote
/// license service.
#[async_trait]
pub trait LicenseAuthority: Send + Sync {
    /// Claim a slot of `code` for `device_id`.
    async fn activate(
        &self,
        code: &LicenseCode,
        device_id: &DeviceId,
        device_name: &str,
    ) -> Result<ActivationOutcome>;

    /// Release the slot held by `device_id`. No-op if not held.
    async fn deactivate(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<()>;

    /// Whether `device_id` still holds a slot of `code`.
    async fn check_still_valid(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<bool>;
}

/// Source of this installation's device identity.
#[async_trait]
pub trait DeviceIdentityProvider: Send + Sync {
    /// Return the stable identifier, creating it on first use.
    async fn device_id(&self) -> Result<DeviceId>;
}
