//! Trial window and premium flag over the device store.

use chrono::{DateTime, Utc};
use classkit_core::ids::LicenseCode;
use classkit_core::keys;
use classkit_core::ports::KeyValueStore;
use classkit_core::trial::{TrialLimits, TrialStatus};
use classkit_core::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Tracks when the trial started and whether the device is premium.
#[derive(Clone)]
pub struct TrialClock {
    store: Arc<dyn KeyValueStore>,
}

impl TrialClock {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current status. The first call starts the trial.
    pub async fn status(&self) -> Result<TrialStatus> {
        self.status_at(Utc::now()).await
    }

    /// Status as seen at `now`. Starts the trial at `now` if it never began.
    pub async fn status_at(&self, now: DateTime<Utc>) -> Result<TrialStatus> {
        let start = self.trial_start(now).await?;
        let is_premium = self.is_premium().await?;
        let unlock_code = self
            .store
            .get(keys::UNLOCK_CODE)
            .await?
            .map(LicenseCode::new);
        Ok(TrialStatus::compute(start, is_premium, unlock_code, now))
    }

    async fn trial_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let candidate = now.to_rfc3339();
        let stored = self
            .store
            .get_or_insert(keys::TRIAL_START_DATE, &candidate)
            .await?;
        if stored == candidate {
            info!(trial_start_date = %stored, "Trial started");
        }
        DateTime::parse_from_rfc3339(&stored)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| {
                Error::Serialization(format!("invalid {} {:?}: {}", keys::TRIAL_START_DATE, stored, e))
            })
    }

    pub async fn is_premium(&self) -> Result<bool> {
        Ok(self
            .store
            .get(keys::PREMIUM_STATUS)
            .await?
            .is_some_and(|v| v == "true"))
    }

    /// Flag the device as premium, remembering the code that unlocked it.
    pub async fn mark_premium(&self, code: Option<&LicenseCode>) -> Result<()> {
        if let Some(code) = code {
            self.store.set(keys::UNLOCK_CODE, code.as_str()).await?;
        }
        // The flag goes last so a failed write never leaves premium on.
        self.store.set(keys::PREMIUM_STATUS, "true").await?;
        info!(code = ?code.map(LicenseCode::as_str), "Premium enabled");
        Ok(())
    }

    pub async fn clear_premium(&self) -> Result<()> {
        self.store.set(keys::PREMIUM_STATUS, "false").await?;
        self.store.remove(keys::UNLOCK_CODE).await
    }

    /// Forget the trial start and premium state. Support/testing only.
    pub async fn reset(&self) -> Result<()> {
        self.store.remove(keys::TRIAL_START_DATE).await?;
        self.store.remove(keys::PREMIUM_STATUS).await?;
        self.store.remove(keys::UNLOCK_CODE).await?;
        info!("Trial state reset");
        Ok(())
    }

    /// Quotas for the current tier.
    pub async fn limits(&self) -> Result<TrialLimits> {
        Ok(TrialLimits::for_tier(self.is_premium().await?))
    }
}
