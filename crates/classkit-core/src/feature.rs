//! Feature-gate vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A mutating user action that must pass the feature gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    AddStudent,
    AddClass,
    AddGrade,
    AddCourse,
    ExportData,
    AdvancedFeatures,
    /// Any action the policy table does not know about.
    Other(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::AddStudent => "add_student",
            ActionKind::AddClass => "add_class",
            ActionKind::AddGrade => "add_grade",
            ActionKind::AddCourse => "add_course",
            ActionKind::ExportData => "export_data",
            ActionKind::AdvancedFeatures => "advanced_features",
            ActionKind::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ActionKind::Other(_))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim() {
            "add_student" => ActionKind::AddStudent,
            "add_class" => ActionKind::AddClass,
            "add_grade" => ActionKind::AddGrade,
            "add_course" => ActionKind::AddCourse,
            "export_data" => ActionKind::ExportData,
            "advanced_features" => ActionKind::AdvancedFeatures,
            other => ActionKind::Other(other.to_string()),
        })
    }
}

/// Allow/deny answer of the feature gate. Denials always carry a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_actions() {
        let action: ActionKind = "add_student".parse().unwrap();
        assert_eq!(action, ActionKind::AddStudent);
        let action: ActionKind = "export_data".parse().unwrap();
        assert_eq!(action, ActionKind::ExportData);
    }

    #[test]
    fn test_parse_unknown_action() {
        let action: ActionKind = "add_attendance".parse().unwrap();
        assert_eq!(action, ActionKind::Other("add_attendance".to_string()));
        assert!(!action.is_known());
        assert_eq!(action.to_string(), "add_attendance");
    }
}
