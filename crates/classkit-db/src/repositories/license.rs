//! PostgreSQL implementation of LicenseStore.

use async_trait::async_trait;
use classkit_core::ids::{DeviceId, LicenseCode};
use classkit_core::license::{LicenseSlot, SlotRecord};
use classkit_core::ports::LicenseStore;
use classkit_core::{Error, Result};
use sqlx::{PgPool, Row};
use tracing::debug;

/// Registry backed by the `license_slots` table.
///
/// Slot writes are conditional on the `version` column, so concurrent
/// service instances cannot both claim the last device of a code. The
/// table's quota CHECK constraint backs the same invariant.
pub struct PgLicenseStore {
    pool: PgPool,
}

impl PgLicenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(r: &sqlx::postgres::PgRow) -> Result<SlotRecord> {
        let max_devices: i32 = r.get("max_devices");
        let version: i64 = r.get("version");
        let devices: Vec<String> = r.get("activated_devices");
        Ok(SlotRecord {
            code: LicenseCode::new(r.get::<String, _>("code")),
            slot: LicenseSlot {
                max_devices: u32::try_from(max_devices)
                    .map_err(|_| Error::Database(format!("invalid max_devices {}", max_devices)))?,
                activated_devices: devices.into_iter().map(DeviceId::new).collect(),
            },
            version: u64::try_from(version)
                .map_err(|_| Error::Database(format!("invalid version {}", version)))?,
            created_at: r.get("created_at"),
        })
    }

    fn device_column(slot: &LicenseSlot) -> Vec<String> {
        slot.activated_devices
            .iter()
            .map(|d| d.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl LicenseStore for PgLicenseStore {
    async fn get(&self, code: &LicenseCode) -> Result<Option<SlotRecord>> {
        let row = sqlx::query("SELECT code, max_devices, activated_devices, version, created_at FROM license_slots WHERE code = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn insert_if_absent(&self, code: &LicenseCode, slot: &LicenseSlot) -> Result<bool> {
        let result = sqlx::query("INSERT INTO license_slots (code, max_devices, activated_devices) VALUES ($1, $2, $3) ON CONFLICT (code) DO NOTHING")
            .bind(code.as_str())
            .bind(slot.max_devices as i32)
            .bind(Self::device_column(slot))
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn compare_and_swap(
        &self,
        code: &LicenseCode,
        expected_version: u64,
        slot: &LicenseSlot,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE license_slots SET max_devices = $3, activated_devices = $4, version = version + 1, updated_at = NOW() WHERE code = $1 AND version = $2")
            .bind(code.as_str())
            .bind(expected_version as i64)
            .bind(slot.max_devices as i32)
            .bind(Self::device_column(slot))
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        let swapped = result.rows_affected() == 1;
        if !swapped {
            debug!(code = %code, expected_version, "Slot version moved, write refused");
        }
        Ok(swapped)
    }

    async fn remove(&self, code: &LicenseCode) -> Result<bool> {
        let result = sqlx::query("DELETE FROM license_slots WHERE code = $1")
            .bind(code.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self) -> Result<Vec<SlotRecord>> {
        let rows = sqlx::query("SELECT code, max_devices, activated_devices, version, created_at FROM license_slots ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter().map(Self::row_to_record).collect()
    }
}
