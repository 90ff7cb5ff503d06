//! Trial window types and day arithmetic.

use crate::ids::LicenseCode;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const TRIAL_DURATION_DAYS: i64 = 30;

const MS_PER_DAY: i64 = 86_400_000;

/// Snapshot of the trial window and premium flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStatus {
    pub is_trial_active: bool,
    pub days_remaining: u32,
    pub is_premium: bool,
    pub trial_start_date: DateTime<Utc>,
    pub trial_end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_code: Option<LicenseCode>,
}

impl TrialStatus {
    /// Derive the status as seen at `now`.
    pub fn compute(
        trial_start_date: DateTime<Utc>,
        is_premium: bool,
        unlock_code: Option<LicenseCode>,
        now: DateTime<Utc>,
    ) -> Self {
        let trial_end_date = trial_start_date + Duration::days(TRIAL_DURATION_DAYS);
        let days_remaining = days_remaining(trial_end_date, now);
        Self {
            is_trial_active: days_remaining > 0,
            days_remaining,
            is_premium,
            trial_start_date,
            trial_end_date,
            unlock_code,
        }
    }
}

/// `max(0, ceil((end - now) / 1 day))`. A partial last day counts as one.
pub fn days_remaining(trial_end_date: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let remaining_ms = (trial_end_date - now).num_milliseconds();
    if remaining_ms <= 0 {
        return 0;
    }
    let days = (remaining_ms + MS_PER_DAY - 1) / MS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Banner text for the remaining trial days.
pub fn format_days_remaining(days: u32) -> String {
    match days {
        0 => "Last day".to_string(),
        1 => "1 day remaining".to_string(),
        n => format!("{} days remaining", n),
    }
}

/// Quotas and capabilities of a tier. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialLimits {
    pub max_students: Option<u32>,
    pub max_classes: Option<u32>,
    pub max_grades: Option<u32>,
    pub max_courses: Option<u32>,
    pub can_export_data: bool,
    pub can_use_advanced_features: bool,
}

impl TrialLimits {
    pub const TRIAL: TrialLimits = TrialLimits {
        max_students: Some(10),
        max_classes: Some(2),
        max_grades: Some(50),
        max_courses: Some(20),
        can_export_data: false,
        can_use_advanced_features: false,
    };

    pub const PREMIUM: TrialLimits = TrialLimits {
        max_students: None,
        max_classes: None,
        max_grades: None,
        max_courses: None,
        can_export_data: true,
        can_use_advanced_features: true,
    };

    pub fn for_tier(is_premium: bool) -> Self {
        if is_premium {
            Self::PREMIUM
        } else {
            Self::TRIAL
        }
    }
}
