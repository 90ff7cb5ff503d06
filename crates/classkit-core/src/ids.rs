//! Strongly-typed keys for licensing entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one app installation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A redeemable unlock code.
///
/// Codes are case-insensitive: every constructor trims surrounding
/// whitespace and uppercases, so `" coffee2024 "` and `"COFFEE2024"` are the
/// same key. Deserialization goes through the same normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LicenseCode(String);

impl LicenseCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LicenseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LicenseCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for LicenseCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<LicenseCode> for String {
    fn from(code: LicenseCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for LicenseCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_normalization() {
        let a = LicenseCode::new(" coffee2024 ");
        let b = LicenseCode::new("COFFEE2024");
        let c = LicenseCode::new("Coffee2024");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "COFFEE2024");
    }

    #[test]
    fn test_code_deserialize_normalizes() {
        let code: LicenseCode = serde_json::from_str("\"  teach_premium\"").unwrap();
        assert_eq!(code.as_str(), "TEACH_PREMIUM");
    }

    #[test]
    fn test_blank_code_is_empty() {
        assert!(LicenseCode::new("   ").is_empty());
    }
}
