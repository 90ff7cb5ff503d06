//! The license registry: codes, device quotas and activations.

use crate::codes::{self, PREDEFINED_CODES};
use async_trait::async_trait;
use classkit_core::ids::{DeviceId, LicenseCode};
use classkit_core::license::{
    ActivationOutcome, LicenseInfo, LicenseSlot, LicenseStats, Rejection,
};
use classkit_core::ports::{LicenseAuthority, LicenseStore};
use classkit_core::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Attempts at a conflicting slot write before giving up.
const MAX_CAS_ATTEMPTS: u32 = 16;

/// Attempts at finding an unused code.
const MAX_GENERATE_ATTEMPTS: u32 = 8;

/// Source of truth for which codes exist and which devices hold them.
///
/// Every mutation of an existing slot is a read, a decision on the read
/// copy, and a compare-and-swap on its version. A lost race re-reads and
/// decides again, so two devices racing for the last slot cannot both win.
#[derive(Clone)]
pub struct LicenseRegistry {
    store: Arc<dyn LicenseStore>,
}

impl LicenseRegistry {
    pub fn new(store: Arc<dyn LicenseStore>) -> Self {
        Self { store }
    }

    /// Insert the predefined codes that are missing. Existing slots keep
    /// their activations.
    pub async fn ensure_seeded(&self) -> Result<()> {
        let mut inserted = 0;
        for code in PREDEFINED_CODES {
            if self
                .store
                .insert_if_absent(&LicenseCode::new(code), &LicenseSlot::new(1))
                .await?
            {
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!(inserted, "Seeded predefined license codes");
        }
        Ok(())
    }

    /// Issue a fresh `PREFIX_<time>_<random>` code allowing `max_devices`.
    pub async fn generate_code(&self, prefix: &str, max_devices: u32) -> Result<LicenseCode> {
        let prefix = prefix.trim().to_uppercase();
        if !codes::is_valid_prefix(&prefix) {
            return Err(Error::InvalidArgument(format!(
                "prefix must be letters only, got {:?}",
                prefix
            )));
        }
        if max_devices == 0 {
            return Err(Error::InvalidArgument(
                "max_devices must be at least 1".to_string(),
            ));
        }

        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code = codes::generate_code(&prefix);
            if self
                .store
                .insert_if_absent(&code, &LicenseSlot::new(max_devices))
                .await?
            {
                info!(code = %code, max_devices, "Generated license code");
                return Ok(code);
            }
            debug!(code = %code, "Generated code collided, retrying");
        }

        Err(Error::Internal(format!(
            "no unused code after {} attempts",
            MAX_GENERATE_ATTEMPTS
        )))
    }

    /// Register a code with a chosen name. Returns false if it exists.
    pub async fn register_code(&self, code: &LicenseCode, max_devices: u32) -> Result<bool> {
        if code.is_empty() || max_devices == 0 {
            return Err(Error::InvalidArgument(
                "code must be non-empty and max_devices at least 1".to_string(),
            ));
        }
        self.store
            .insert_if_absent(code, &LicenseSlot::new(max_devices))
            .await
    }

    /// Claim a slot of `code` for `device_id`.
    ///
    /// Unknown codes and full codes are rejections, not errors. A device
    /// that already holds a slot gets a success without any write.
    pub async fn validate_and_activate(
        &self,
        code: &LicenseCode,
        device_id: &DeviceId,
        device_name: &str,
    ) -> Result<ActivationOutcome> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(record) = self.store.get(code).await? else {
                info!(code = %code, "Activation with unknown code");
                return Ok(ActivationOutcome::Rejected(Rejection::InvalidCode {
                    code: code.clone(),
                }));
            };

            let info = LicenseInfo::activated_now(code.clone(), device_id.clone(), device_name);
            if record.slot.contains(device_id) {
                debug!(code = %code, device_id = %device_id, "Device already activated");
                return Ok(ActivationOutcome::Activated(info));
            }

            let mut slot = record.slot;
            if !slot.claim(device_id) {
                warn!(
                    code = %code,
                    device_id = %device_id,
                    max_devices = slot.max_devices,
                    "Device limit reached"
                );
                return Ok(ActivationOutcome::Rejected(Rejection::DeviceLimitReached {
                    code: code.clone(),
                    max_devices: slot.max_devices,
                }));
            }

            if self
                .store
                .compare_and_swap(code, record.version, &slot)
                .await?
            {
                info!(
                    code = %code,
                    device_id = %device_id,
                    active = slot.active_count(),
                    max_devices = slot.max_devices,
                    "License activated"
                );
                return Ok(ActivationOutcome::Activated(info));
            }
            debug!(code = %code, attempt, "Slot changed underneath, retrying");
        }

        Err(Error::StoreContention {
            code: code.to_string(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Free the slot `device_id` holds on `code`. No-op if it holds none.
    pub async fn deactivate(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<()> {
        self.release(code, device_id).await.map(|_| ())
    }

    /// Whether `device_id` currently holds a slot of `code`.
    pub async fn check_still_valid(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<bool> {
        Ok(self
            .store
            .get(code)
            .await?
            .is_some_and(|record| record.slot.contains(device_id)))
    }

    /// Delete a code and every activation on it. Returns false if unknown.
    pub async fn revoke(&self, code: &LicenseCode) -> Result<bool> {
        let removed = self.store.remove(code).await?;
        if removed {
            warn!(code = %code, "License code revoked");
        }
        Ok(removed)
    }

    /// Usage of every code.
    pub async fn stats(&self) -> Result<BTreeMap<LicenseCode, LicenseStats>> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .map(|record| {
                let stats = LicenseStats {
                    max_devices: record.slot.max_devices,
                    active_devices: record.slot.active_count(),
                };
                (record.code, stats)
            })
            .collect())
    }

    /// Support operation: free a device's slot. True iff the code exists.
    pub async fn reset_device_for_code(
        &self,
        code: &LicenseCode,
        device_id: &DeviceId,
    ) -> Result<bool> {
        let found = self.release(code, device_id).await?;
        if found {
            info!(code = %code, device_id = %device_id, "Device reset for code");
        }
        Ok(found)
    }

    /// Remove `device_id` from `code`'s slot. Returns whether the code exists.
    async fn release(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<bool> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let Some(record) = self.store.get(code).await? else {
                return Ok(false);
            };
            let mut slot = record.slot;
            if !slot.release(device_id) {
                return Ok(true);
            }
            if self
                .store
                .compare_and_swap(code, record.version, &slot)
                .await?
            {
                info!(code = %code, device_id = %device_id, "License deactivated");
                return Ok(true);
            }
        }

        Err(Error::StoreContention {
            code: code.to_string(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }
}

#[async_trait]
impl LicenseAuthority for LicenseRegistry {
    async fn activate(
        &self,
        code: &LicenseCode,
        device_id: &DeviceId,
        device_name: &str,
    ) -> Result<ActivationOutcome> {
        self.validate_and_activate(code, device_id, device_name).await
    }

    async fn deactivate(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<()> {
        LicenseRegistry::deactivate(self, code, device_id).await
    }

    async fn check_still_valid(&self, code: &LicenseCode, device_id: &DeviceId) -> Result<bool> {
        LicenseRegistry::check_still_valid(self, code, device_id).await
    }
}
