//! Device-side license orchestration.

use crate::device::DeviceInfo;
use crate::trial::TrialClock;
use chrono::{DateTime, Utc};
use classkit_core::ids::{DeviceId, LicenseCode};
use classkit_core::keys;
use classkit_core::license::{ActivationOutcome, LicenseCheck, LicenseInfo};
use classkit_core::ports::{DeviceIdentityProvider, KeyValueStore, LicenseAuthority};
use classkit_core::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Activates, checks and releases the license of this device.
///
/// Success is only reported once the license, the activation counter and
/// the premium flag are persisted locally. If any of those writes fails the
/// slot is handed back to the authority.
pub struct LicenseManager {
    identity: Arc<dyn DeviceIdentityProvider>,
    authority: Arc<dyn LicenseAuthority>,
    store: Arc<dyn KeyValueStore>,
    trial: TrialClock,
    device: DeviceInfo,
}

impl LicenseManager {
    pub fn new(
        identity: Arc<dyn DeviceIdentityProvider>,
        authority: Arc<dyn LicenseAuthority>,
        store: Arc<dyn KeyValueStore>,
        device: DeviceInfo,
    ) -> Self {
        Self {
            identity,
            authority,
            trial: TrialClock::new(store.clone()),
            store,
            device,
        }
    }

    pub fn trial(&self) -> &TrialClock {
        &self.trial
    }

    /// Redeem `code` on this device.
    ///
    /// A license for another code held by this device is released once the
    /// new one is saved.
    pub async fn activate(&self, code: &str) -> Result<ActivationOutcome> {
        let code = LicenseCode::new(code);
        let device_id = self.identity.device_id().await?;
        let previous = self.license_info().await?;
        let already_held = self.authority.check_still_valid(&code, &device_id).await?;

        let outcome = self
            .authority
            .activate(&code, &device_id, &self.device.device_name)
            .await?;
        let ActivationOutcome::Activated(info) = outcome else {
            return Ok(outcome);
        };

        if let Err(e) = self.persist_activation(&info).await {
            error!(code = %code, device_id = %device_id, error = %e, "Local activation write failed");
            let reason = if already_held {
                format!(
                    "could not save the license on this device ({}); the existing activation is kept",
                    e
                )
            } else {
                self.roll_back(&code, &device_id, previous.as_ref(), &e).await
            };
            return Err(Error::ActivationFailed {
                code: code.to_string(),
                reason,
            });
        }

        if let Some(previous) = previous
            && previous.code != code
            && previous.device_id == device_id
        {
            match self.authority.deactivate(&previous.code, &device_id).await {
                Ok(()) => info!(code = %previous.code, "Released the license this device held before"),
                Err(e) => warn!(code = %previous.code, error = %e, "Could not release the previous license"),
            }
        }

        info!(code = %code, device_id = %device_id, "License activated on this device");
        Ok(ActivationOutcome::Activated(info))
    }

    /// Undo a claim made by this call. Returns the failure reason.
    async fn roll_back(
        &self,
        code: &LicenseCode,
        device_id: &DeviceId,
        previous: Option<&LicenseInfo>,
        cause: &Error,
    ) -> String {
        let restored = match previous {
            Some(previous) => match serde_json::to_string(previous) {
                Ok(json) => self.store.set(keys::LICENSE_INFO, &json).await,
                Err(e) => Err(e.into()),
            },
            None => self.store.remove(keys::LICENSE_INFO).await,
        };
        if let Err(cleanup) = restored {
            warn!(error = %cleanup, "Could not restore the license record");
        }

        let premium = match previous {
            Some(previous) => self.trial.mark_premium(Some(&previous.code)).await,
            None => self.trial.clear_premium().await,
        };
        if let Err(cleanup) = premium {
            warn!(error = %cleanup, "Could not restore the premium flag");
        }

        match self.authority.deactivate(code, device_id).await {
            Ok(()) => format!("could not save the license on this device ({})", cause),
            Err(rollback) => format!(
                "could not save the license on this device ({}) and the slot could not be released ({}); it may still be consumed",
                cause, rollback
            ),
        }
    }

    async fn persist_activation(&self, info: &LicenseInfo) -> Result<()> {
        let json = serde_json::to_string(info)?;
        self.store.set(keys::LICENSE_INFO, &json).await?;

        let count = self
            .store
            .get(keys::ACTIVATION_COUNT)
            .await?
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        self.store
            .set(keys::ACTIVATION_COUNT, &(count + 1).to_string())
            .await?;

        self.trial.mark_premium(Some(&info.code)).await
    }

    /// The license record stored on this device, if any.
    pub async fn license_info(&self) -> Result<Option<LicenseInfo>> {
        match self.store.get(keys::LICENSE_INFO).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Re-validate the stored license against this device and the authority.
    pub async fn check_current_license(&self) -> Result<LicenseCheck> {
        let Some(info) = self.license_info().await? else {
            return Ok(LicenseCheck::NotFound);
        };

        let device_id = self.identity.device_id().await?;
        if info.device_id != device_id {
            warn!(stored = %info.device_id, current = %device_id, "Stored license belongs to another device");
            return Ok(LicenseCheck::WrongDevice);
        }

        if !self.authority.check_still_valid(&info.code, &device_id).await? {
            warn!(code = %info.code, "License no longer valid");
            return Ok(LicenseCheck::Revoked);
        }

        Ok(LicenseCheck::Valid(info))
    }

    /// Release this device's license. Returns false if there was none.
    pub async fn deactivate(&self) -> Result<bool> {
        let Some(info) = self.license_info().await? else {
            return Ok(false);
        };

        self.authority.deactivate(&info.code, &info.device_id).await?;
        self.store.remove(keys::LICENSE_INFO).await?;
        self.trial.clear_premium().await?;

        info!(code = %info.code, "License deactivated on this device");
        Ok(true)
    }

    /// Support summary of this device and its license.
    pub async fn device_report(&self) -> Result<DeviceReport> {
        let device_id = self.identity.device_id().await?;
        let license = self.license_info().await?;
        Ok(DeviceReport {
            device_id,
            device_name: self.device.device_name.clone(),
            os_name: self.device.os_name.clone(),
            os_version: self.device.os_version.clone(),
            license_code: license.as_ref().map(|l| l.code.clone()),
            activation_date: license.map(|l| l.activation_date),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReport {
    pub device_id: DeviceId,
    pub device_name: String,
    pub os_name: String,
    pub os_version: String,
    pub license_code: Option<LicenseCode>,
    pub activation_date: Option<DateTime<Utc>>,
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device ID: {}", self.device_id)?;
        writeln!(f, "Device: {}", self.device_name)?;
        writeln!(f, "OS: {} {}", self.os_name, self.os_version)?;
        match &self.license_code {
            Some(code) => writeln!(f, "License: {}", code)?,
            None => writeln!(f, "License: None")?,
        }
        match self.activation_date {
            Some(date) => write!(f, "Activated: {}", date.format("%Y-%m-%d %H:%M UTC")),
            None => write!(f, "Activated: Never"),
        }
    }
}
