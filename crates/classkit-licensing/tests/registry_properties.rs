//! Behavioural properties of the license registry, trial clock and gate.

use chrono::{Duration, Utc};
use classkit_core::feature::ActionKind;
use classkit_core::ids::{DeviceId, LicenseCode};
use classkit_core::keys;
use classkit_core::license::{LicenseInfo, Rejection};
use classkit_core::ports::{KeyValueStore, LicenseStore};
use classkit_db::{MemoryKeyValueStore, MemoryLicenseStore};
use classkit_licensing::{FeatureGate, GatePolicy, LicenseRegistry, TrialClock, is_valid_code_format};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;

async fn setup() -> (Arc<MemoryLicenseStore>, LicenseRegistry) {
    let store = Arc::new(MemoryLicenseStore::new());
    let registry = LicenseRegistry::new(store.clone());
    registry.ensure_seeded().await.unwrap();
    (store, registry)
}

async fn devices_of(store: &MemoryLicenseStore, code: &str) -> BTreeSet<DeviceId> {
    store
        .get(&LicenseCode::new(code))
        .await
        .unwrap()
        .unwrap()
        .slot
        .activated_devices
}

#[tokio::test]
async fn test_idempotent_reactivation() {
    let (store, registry) = setup().await;
    let code = registry.generate_code("TEACH", 2).await.unwrap();
    let device = DeviceId::new("AAA111");

    for _ in 0..5 {
        let outcome = registry
            .validate_and_activate(&code, &device, "Tablet")
            .await
            .unwrap();
        assert!(outcome.is_activated());
    }

    let record = store.get(&code).await.unwrap().unwrap();
    assert_eq!(record.slot.active_count(), 1);
    // Only the first activation wrote
    assert_eq!(record.version, 1);
}

#[tokio::test]
async fn test_exclusivity_of_single_device_code() {
    let (store, registry) = setup().await;
    let code = LicenseCode::new("COFFEE2024");

    let first = registry
        .validate_and_activate(&code, &DeviceId::new("deviceA"), "A")
        .await
        .unwrap();
    let second = registry
        .validate_and_activate(&code, &DeviceId::new("deviceB"), "B")
        .await
        .unwrap();

    assert!(first.is_activated());
    assert!(matches!(
        second.rejection(),
        Some(Rejection::DeviceLimitReached { max_devices: 1, .. })
    ));
    assert_eq!(
        devices_of(&store, "COFFEE2024").await,
        BTreeSet::from([DeviceId::new("deviceA")])
    );
}

#[tokio::test]
async fn test_deactivate_then_reactivate() {
    let (store, registry) = setup().await;
    let code = LicenseCode::new("COFFEE2024");
    let a = DeviceId::new("deviceA");
    let b = DeviceId::new("deviceB");

    registry.validate_and_activate(&code, &a, "A").await.unwrap();
    registry.deactivate(&code, &a).await.unwrap();
    // Releasing twice is harmless
    registry.deactivate(&code, &a).await.unwrap();

    let outcome = registry.validate_and_activate(&code, &b, "B").await.unwrap();
    assert!(outcome.is_activated());
    assert_eq!(devices_of(&store, "COFFEE2024").await, BTreeSet::from([b]));
}

#[tokio::test]
async fn test_code_normalization() {
    let (store, registry) = setup().await;
    let device = DeviceId::new("AAA111");

    for raw in [" coffee2024 ", "COFFEE2024", "Coffee2024"] {
        let outcome = registry
            .validate_and_activate(&LicenseCode::new(raw), &device, "Tablet")
            .await
            .unwrap();
        assert!(outcome.is_activated(), "{raw:?} should match COFFEE2024");
    }
    assert_eq!(devices_of(&store, "coffee2024").await.len(), 1);
}

#[tokio::test]
async fn test_teach_premium_scenario() {
    let (_, registry) = setup().await;
    let code = LicenseCode::new("TEACH_PREMIUM");

    let info: LicenseInfo = registry
        .validate_and_activate(&code, &DeviceId::new("AAA111"), "Tablet")
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(info.code.as_str(), "TEACH_PREMIUM");
    assert_eq!(info.device_id.as_str(), "AAA111");
    assert!(info.is_active);

    let rejection = registry
        .validate_and_activate(&code, &DeviceId::new("BBB222"), "Phone")
        .await
        .unwrap()
        .into_result()
        .unwrap_err();
    assert!(matches!(rejection, Rejection::DeviceLimitReached { .. }));
    assert!(rejection.to_string().contains('1'));
}

#[tokio::test]
async fn test_racers_for_last_slot() {
    let (store, registry) = setup().await;
    let code = registry.generate_code("RACE", 3).await.unwrap();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let registry = registry.clone();
            let code = code.clone();
            tokio::spawn(async move {
                registry
                    .validate_and_activate(&code, &DeviceId::new(format!("DEV{i}")), "racer")
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_activated() {
            winners += 1;
        }
    }

    assert_eq!(winners, 3);
    let record = store.get(&code).await.unwrap().unwrap();
    assert_eq!(record.slot.active_count(), 3);
    assert!(record.slot.active_count() <= record.slot.max_devices);
}

#[tokio::test]
async fn test_slot_invariant_under_mixed_traffic() {
    let (store, registry) = setup().await;
    let code = registry.generate_code("MIX", 2).await.unwrap();

    for round in 0..10 {
        for i in 0..4 {
            let device = DeviceId::new(format!("DEV{}", (round + i) % 5));
            if i % 2 == 0 {
                registry.validate_and_activate(&code, &device, "d").await.unwrap();
            } else {
                registry.deactivate(&code, &device).await.unwrap();
            }
            let record = store.get(&code).await.unwrap().unwrap();
            assert!(record.slot.active_count() <= 2);
        }
    }
}

#[tokio::test]
async fn test_trial_day_math() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let clock = TrialClock::new(kv.clone());
    let now = Utc::now();

    let start = now - Duration::days(29) - Duration::hours(1);
    kv.set(keys::TRIAL_START_DATE, &start.to_rfc3339()).await.unwrap();
    let status = clock.status_at(now).await.unwrap();
    assert_eq!(status.days_remaining, 1);
    assert!(status.is_trial_active);

    kv.set(keys::TRIAL_START_DATE, &(now - Duration::days(31)).to_rfc3339())
        .await
        .unwrap();
    let status = clock.status_at(now).await.unwrap();
    assert_eq!(status.days_remaining, 0);
    assert!(!status.is_trial_active);
}

#[tokio::test]
async fn test_premium_bypass_and_quota() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let clock = TrialClock::new(kv.clone());
    let gate = FeatureGate::new(clock.clone(), GatePolicy::default());

    let allowed = gate.can_perform_action(&ActionKind::AddStudent, 9).await.unwrap();
    assert!(allowed.allowed);
    let denied = gate.can_perform_action(&ActionKind::AddStudent, 10).await.unwrap();
    assert!(!denied.allowed);
    assert!(denied.reason.unwrap().contains("10"));

    // Expired trial, then premium
    kv.set(keys::TRIAL_START_DATE, &(Utc::now() - Duration::days(60)).to_rfc3339())
        .await
        .unwrap();
    clock.mark_premium(Some(&LicenseCode::new("COFFEE2024"))).await.unwrap();

    for action in ["add_student", "add_class", "export_data", "advanced_features", "add_attendance"] {
        let action: ActionKind = action.parse().unwrap();
        let decision = gate.can_perform_action(&action, 1_000).await.unwrap();
        assert!(decision.allowed, "{action} should be allowed for premium");
    }
}

#[test]
fn test_format_validation() {
    assert!(is_valid_code_format("TEACH_ABC123_XYZ_789"));
    assert!(!is_valid_code_format("INVALID_CODE"));
}
