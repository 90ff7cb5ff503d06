//! Wire and persisted format tests for classkit-core types.

use chrono::{TimeZone, Utc};
use classkit_core::feature::GateDecision;
use classkit_core::ids::*;
use classkit_core::license::*;
use classkit_core::trial::{TrialLimits, TrialStatus};
use pretty_assertions::assert_eq;

fn sample_info() -> LicenseInfo {
    LicenseInfo {
        code: LicenseCode::new("TEACH_PREMIUM"),
        device_id: DeviceId::new("AAA111"),
        device_name: "Classroom tablet".to_string(),
        activation_date: Utc.with_ymd_and_hms(2024, 9, 2, 8, 30, 0).unwrap(),
        is_active: true,
        expiry_date: None,
    }
}

#[test]
fn test_license_info_uses_camel_case_fields() {
    let value = serde_json::to_value(sample_info()).expect("serialize");

    assert_eq!(value["code"], "TEACH_PREMIUM");
    assert_eq!(value["deviceId"], "AAA111");
    assert_eq!(value["deviceName"], "Classroom tablet");
    assert_eq!(value["isActive"], true);
    assert!(value.get("activationDate").is_some());
    assert!(value.get("expiryDate").is_none());
}

#[test]
fn test_license_info_parses_stored_record() {
    let stored = r#"{
        "code": "teach_premium",
        "deviceId": "AAA111",
        "deviceName": "Classroom tablet",
        "activationDate": "2024-09-02T08:30:00Z",
        "isActive": true
    }"#;

    let parsed: LicenseInfo = serde_json::from_str(stored).expect("deserialize");
    assert_eq!(parsed, sample_info());
}

#[test]
fn test_slot_record_keeps_device_set() {
    let mut slot = LicenseSlot::new(2);
    slot.claim(&DeviceId::new("BBB222"));
    slot.claim(&DeviceId::new("AAA111"));
    let record = SlotRecord {
        code: LicenseCode::new("COFFEE2024"),
        slot,
        version: 3,
        created_at: Utc::now(),
    };

    let json = serde_json::to_string(&record).expect("serialize");
    let parsed: SlotRecord = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(parsed.slot.max_devices, 2);
    assert_eq!(parsed.slot.active_count(), 2);
    assert_eq!(parsed.version, 3);
}

#[test]
fn test_rejection_is_tagged() {
    let rejection = Rejection::DeviceLimitReached {
        code: LicenseCode::new("COFFEE2024"),
        max_devices: 1,
    };
    let value = serde_json::to_value(&rejection).expect("serialize");

    assert_eq!(value["kind"], "device_limit_reached");
    assert_eq!(value["max_devices"], 1);
}

#[test]
fn test_gate_decision_omits_reason_when_allowed() {
    let json = serde_json::to_string(&GateDecision::allow()).expect("serialize");
    assert_eq!(json, r#"{"allowed":true}"#);

    let denied = serde_json::to_value(GateDecision::deny("trial expired")).expect("serialize");
    assert_eq!(denied["reason"], "trial expired");
}

#[test]
fn test_trial_status_serializes_for_banners() {
    let start = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 9, 11, 0, 0, 0).unwrap();
    let status = TrialStatus::compute(start, false, None, now);

    let value = serde_json::to_value(&status).expect("serialize");
    assert_eq!(value["daysRemaining"], 20);
    assert_eq!(value["isTrialActive"], true);
    assert_eq!(value["trialEndDate"], "2024-10-01T00:00:00Z");
}

#[test]
fn test_premium_limits_are_unbounded() {
    let value = serde_json::to_value(TrialLimits::PREMIUM).expect("serialize");
    assert!(value["maxStudents"].is_null());
    assert_eq!(value["canExportData"], true);
}
