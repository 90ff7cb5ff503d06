//! Keys of the per-device key-value state.

pub const DEVICE_ID: &str = "device_id";
pub const TRIAL_START_DATE: &str = "trial_start_date";
pub const PREMIUM_STATUS: &str = "premium_status";
pub const UNLOCK_CODE: &str = "unlock_code";
pub const LICENSE_INFO: &str = "license_info";
pub const ACTIVATION_COUNT: &str = "activation_count";
