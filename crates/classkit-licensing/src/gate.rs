//! Feature gate: premium bypass, trial expiry and per-action quotas.

use crate::trial::TrialClock;
use classkit_core::Result;
use classkit_core::feature::{ActionKind, GateDecision};
use classkit_core::trial::{TrialLimits, TrialStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the gate treats actions missing from the policy table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Deny unknown actions instead of allowing them.
    #[serde(default)]
    pub fail_closed: bool,
}

/// Answers "may the user do this now?" for trial and premium devices.
#[derive(Clone)]
pub struct FeatureGate {
    trial: TrialClock,
    policy: GatePolicy,
}

impl FeatureGate {
    pub fn new(trial: TrialClock, policy: GatePolicy) -> Self {
        Self { trial, policy }
    }

    /// Check `action` given how many items of its kind already exist.
    pub async fn can_perform_action(
        &self,
        action: &ActionKind,
        current_count: u32,
    ) -> Result<GateDecision> {
        let status = self.trial.status().await?;
        let decision = decide(&status, self.policy, action, current_count);
        debug!(
            action = %action,
            current_count,
            allowed = decision.allowed,
            "Feature gate decision"
        );
        Ok(decision)
    }
}

/// Pure gate decision over a trial snapshot.
pub fn decide(
    status: &TrialStatus,
    policy: GatePolicy,
    action: &ActionKind,
    current_count: u32,
) -> GateDecision {
    if status.is_premium {
        return GateDecision::allow();
    }
    if !status.is_trial_active {
        return GateDecision::deny(
            "Your trial expired. Enter an unlock code to keep using the app.",
        );
    }

    let limits = TrialLimits::TRIAL;
    let quota = |limit: Option<u32>, noun: &str| match limit {
        Some(max) if current_count >= max => GateDecision::deny(format!(
            "Trial limit: {} {} maximum. Upgrade to premium to add more.",
            max, noun
        )),
        _ => GateDecision::allow(),
    };

    match action {
        ActionKind::AddStudent => quota(limits.max_students, "students"),
        ActionKind::AddClass => quota(limits.max_classes, "classes"),
        ActionKind::AddGrade => quota(limits.max_grades, "grades"),
        ActionKind::AddCourse => quota(limits.max_courses, "courses"),
        ActionKind::ExportData if !limits.can_export_data => {
            GateDecision::deny("Data export is a premium feature.")
        }
        ActionKind::AdvancedFeatures if !limits.can_use_advanced_features => {
            GateDecision::deny("Advanced features are available with premium.")
        }
        ActionKind::ExportData | ActionKind::AdvancedFeatures => GateDecision::allow(),
        ActionKind::Other(name) if policy.fail_closed => {
            GateDecision::deny(format!("Action {} is not available during the trial.", name))
        }
        ActionKind::Other(_) => GateDecision::allow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use classkit_core::keys;
    use classkit_core::ports::KeyValueStore;
    use classkit_db::MemoryKeyValueStore;
    use std::sync::Arc;

    fn status(is_trial_active: bool, is_premium: bool) -> TrialStatus {
        let now = Utc::now();
        let start = if is_trial_active {
            now
        } else {
            now - Duration::days(45)
        };
        TrialStatus::compute(start, is_premium, None, now)
    }

    #[test]
    fn test_quota_boundaries() {
        let active = status(true, false);
        let open = GatePolicy::default();

        assert!(decide(&active, open, &ActionKind::AddStudent, 9).allowed);
        let denied = decide(&active, open, &ActionKind::AddStudent, 10);
        assert!(!denied.allowed);
        assert!(denied.reason.unwrap().contains("10 students"));

        assert!(decide(&active, open, &ActionKind::AddClass, 1).allowed);
        assert!(!decide(&active, open, &ActionKind::AddClass, 2).allowed);
        assert!(!decide(&active, open, &ActionKind::AddGrade, 50).allowed);
        assert!(!decide(&active, open, &ActionKind::AddCourse, 20).allowed);
    }

    #[test]
    fn test_capabilities_during_trial() {
        let active = status(true, false);
        let open = GatePolicy::default();
        assert!(!decide(&active, open, &ActionKind::ExportData, 0).allowed);
        assert!(!decide(&active, open, &ActionKind::AdvancedFeatures, 0).allowed);
    }

    #[test]
    fn test_expired_trial_denies_everything() {
        let expired = status(false, false);
        for action in [
            ActionKind::AddStudent,
            ActionKind::ExportData,
            ActionKind::Other("add_attendance".to_string()),
        ] {
            let decision = decide(&expired, GatePolicy::default(), &action, 0);
            assert!(!decision.allowed);
            assert!(decision.reason.unwrap().to_lowercase().contains("trial expired"));
        }
    }

    #[test]
    fn test_premium_bypasses_everything() {
        for trial_active in [true, false] {
            let premium = status(trial_active, true);
            assert!(decide(&premium, GatePolicy::default(), &ActionKind::AddStudent, 10_000).allowed);
            assert!(decide(&premium, GatePolicy::default(), &ActionKind::ExportData, 0).allowed);
        }
    }

    #[test]
    fn test_unknown_action_policy() {
        let active = status(true, false);
        let action = ActionKind::Other("add_attendance".to_string());

        assert!(decide(&active, GatePolicy::default(), &action, 500).allowed);
        let closed = GatePolicy { fail_closed: true };
        assert!(!decide(&active, closed, &action, 0).allowed);
    }

    #[tokio::test]
    async fn test_gate_reads_trial_clock() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let gate = FeatureGate::new(TrialClock::new(store.clone()), GatePolicy::default());

        assert!(gate.can_perform_action(&ActionKind::AddStudent, 3).await.unwrap().allowed);

        let old = Utc::now() - Duration::days(31);
        store.set(keys::TRIAL_START_DATE, &old.to_rfc3339()).await.unwrap();
        assert!(!gate.can_perform_action(&ActionKind::AddStudent, 3).await.unwrap().allowed);
    }
}
