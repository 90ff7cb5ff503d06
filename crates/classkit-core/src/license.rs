//! License slot and activation types.

use crate::ids::{DeviceId, LicenseCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Device quota of one code and the devices that consumed it.
///
/// `activated_devices.len() <= max_devices` always holds for slots built
/// through [`LicenseSlot::claim`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSlot {
    pub max_devices: u32,
    #[serde(default)]
    pub activated_devices: BTreeSet<DeviceId>,
}

impl LicenseSlot {
    pub fn new(max_devices: u32) -> Self {
        Self {
            max_devices,
            activated_devices: BTreeSet::new(),
        }
    }

    pub fn contains(&self, device_id: &DeviceId) -> bool {
        self.activated_devices.contains(device_id)
    }

    pub fn active_count(&self) -> u32 {
        self.activated_devices.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.active_count() >= self.max_devices
    }

    pub fn remaining(&self) -> u32 {
        self.max_devices.saturating_sub(self.active_count())
    }

    /// Add a device if there is room. Returns false when the slot is full.
    /// Claiming a device that is already present succeeds without change.
    pub fn claim(&mut self, device_id: &DeviceId) -> bool {
        if self.contains(device_id) {
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.activated_devices.insert(device_id.clone());
        true
    }

    /// Remove a device. Returns whether it was present.
    pub fn release(&mut self, device_id: &DeviceId) -> bool {
        self.activated_devices.remove(device_id)
    }
}

/// A slot as held by a [`crate::ports::LicenseStore`], with its CAS version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    pub code: LicenseCode,
    pub slot: LicenseSlot,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

/// The activation record persisted on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub code: LicenseCode,
    pub device_id: DeviceId,
    pub device_name: String,
    pub activation_date: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl LicenseInfo {
    pub fn activated_now(code: LicenseCode, device_id: DeviceId, device_name: impl Into<String>) -> Self {
        Self {
            code,
            device_id,
            device_name: device_name.into(),
            activation_date: Utc::now(),
            is_active: true,
            expiry_date: None,
        }
    }
}

/// Per-code usage, for support and admin tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseStats {
    pub max_devices: u32,
    pub active_devices: u32,
}

/// Why an activation request was turned down.
///
/// These are expected outcomes, returned as values. Every variant renders
/// an actionable message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error("Invalid license code \"{code}\". Check the spelling and try again.")]
    InvalidCode { code: LicenseCode },

    #[error(
        "Code {code} is already in use on {max_devices} device(s), the maximum it allows. \
         Contact support to get a new code."
    )]
    DeviceLimitReached { code: LicenseCode, max_devices: u32 },
}

/// Result of an activation request that reached the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated(LicenseInfo),
    Rejected(Rejection),
}

impl ActivationOutcome {
    pub fn is_activated(&self) -> bool {
        matches!(self, ActivationOutcome::Activated(_))
    }

    pub fn license(&self) -> Option<&LicenseInfo> {
        match self {
            ActivationOutcome::Activated(info) => Some(info),
            ActivationOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ActivationOutcome::Activated(_) => None,
            ActivationOutcome::Rejected(rejection) => Some(rejection),
        }
    }

    pub fn into_result(self) -> std::result::Result<LicenseInfo, Rejection> {
        match self {
            ActivationOutcome::Activated(info) => Ok(info),
            ActivationOutcome::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Result of re-validating the license cached on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseCheck {
    Valid(LicenseInfo),
    NotFound,
    WrongDevice,
    Revoked,
}

impl LicenseCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, LicenseCheck::Valid(_))
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            LicenseCheck::Valid(_) => None,
            LicenseCheck::NotFound => Some("No license found on this device."),
            LicenseCheck::WrongDevice => Some("The stored license belongs to another device."),
            LicenseCheck::Revoked => Some("License revoked or expired."),
        }
    }
}
