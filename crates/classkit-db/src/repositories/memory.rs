//! In-process implementation of LicenseStore.

use async_trait::async_trait;
use chrono::Utc;
use classkit_core::Result;
use classkit_core::ids::LicenseCode;
use classkit_core::license::{LicenseSlot, SlotRecord};
use classkit_core::ports::LicenseStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Registry kept in process memory. Each call holds the map lock for its
/// whole duration, which makes `compare_and_swap` atomic.
#[derive(Default)]
pub struct MemoryLicenseStore {
    slots: RwLock<HashMap<LicenseCode, SlotRecord>>,
}

impl MemoryLicenseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LicenseStore for MemoryLicenseStore {
    async fn get(&self, code: &LicenseCode) -> Result<Option<SlotRecord>> {
        Ok(self.slots.read().await.get(code).cloned())
    }

    async fn insert_if_absent(&self, code: &LicenseCode, slot: &LicenseSlot) -> Result<bool> {
        let mut slots = self.slots.write().await;
        if slots.contains_key(code) {
            return Ok(false);
        }
        slots.insert(
            code.clone(),
            SlotRecord {
                code: code.clone(),
                slot: slot.clone(),
                version: 0,
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        code: &LicenseCode,
        expected_version: u64,
        slot: &LicenseSlot,
    ) -> Result<bool> {
        let mut slots = self.slots.write().await;
        match slots.get_mut(code) {
            Some(record) if record.version == expected_version => {
                record.slot = slot.clone();
                record.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, code: &LicenseCode) -> Result<bool> {
        Ok(self.slots.write().await.remove(code).is_some())
    }

    async fn list(&self) -> Result<Vec<SlotRecord>> {
        let mut records: Vec<SlotRecord> = self.slots.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(records)
    }
}
