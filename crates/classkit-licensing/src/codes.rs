//! Unlock code formats and generation.
//!
//! Three shapes exist:
//! - predefined codes shipped with the app (`COFFEE2024`, ...)
//! - registry codes: `PREFIX_<timestamp36>_<random36>`
//! - offline generator codes: `TEACH_<timestamp36>_<customer>_<random36>`
//!   and pattern codes `PATTERN_<customer>_<timestamp36>_<random36>`
//!
//! None of this is unforgeable: timestamps and a thread RNG only make
//! collisions unlikely. Uniqueness is enforced by the store.

use chrono::{DateTime, Utc};
use classkit_core::ids::LicenseCode;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Codes every registry is seeded with, one device each.
pub const PREDEFINED_CODES: &[&str] = &[
    "COFFEE2024",
    "TEACHER_PREMIUM",
    "TEACH_PREMIUM",
    "CAMEROON_EDU",
    "LITOI_UNLOCK",
];

pub const DEFAULT_PREFIX: &str = "TEACH";

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

static CODE_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z]+_[A-Z0-9]+_[A-Z0-9]+_[A-Z0-9]+$").expect("static pattern")
});

/// Whether `code` has the four-segment shape of generator codes.
pub fn is_valid_code_format(code: &str) -> bool {
    CODE_FORMAT.is_match(code) && (15..=30).contains(&code.len())
}

/// Whether `prefix` can start a code.
pub fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphabetic())
}

/// Uppercase base-36 rendering of `n`.
pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

fn timestamp_base36(now: DateTime<Utc>) -> String {
    to_base36(now.timestamp_millis().max(0) as u64)
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// `PREFIX_<timestamp36>_<random36>`, used by the registry.
pub fn generate_code(prefix: &str) -> LicenseCode {
    LicenseCode::new(format!(
        "{}_{}_{}",
        prefix,
        timestamp_base36(Utc::now()),
        random_base36(6)
    ))
}

/// Short tag derived from customer details (phone, name, school).
///
/// A 31-multiplier rolling hash over UTF-16 units, folded to 32 bits,
/// rendered in base 36 and cut to three characters. Empty input gives `GEN`.
pub fn customer_hash(info: &str) -> String {
    if info.is_empty() {
        return "GEN".to_string();
    }
    let mut hash: i32 = 0;
    for unit in info.encode_utf16() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(i32::from(unit));
    }
    let magnitude = i64::from(hash).unsigned_abs();
    to_base36(magnitude).chars().take(3).collect()
}

/// `TEACH_<timestamp36>_<customer>_<random36>`.
pub fn generate_customer_code(customer_info: &str) -> LicenseCode {
    LicenseCode::new(format!(
        "{}_{}_{}_{}",
        DEFAULT_PREFIX,
        timestamp_base36(Utc::now()),
        customer_hash(customer_info),
        random_base36(6)
    ))
}

/// `PATTERN_<customer>_<timestamp36>_<random36>`, e.g. `SCHOOL_...`.
pub fn generate_pattern_code(pattern: &str, customer_info: &str) -> LicenseCode {
    LicenseCode::new(format!(
        "{}_{}_{}_{}",
        pattern,
        customer_hash(customer_info),
        timestamp_base36(Utc::now()),
        random_base36(4)
    ))
}

/// One line of a bulk generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_max_devices")]
    pub max_devices: u32,
}

fn default_max_devices() -> u32 {
    1
}

/// A code issued to a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCode {
    pub customer: String,
    pub phone: String,
    pub code: LicenseCode,
    pub max_devices: u32,
    pub generated_at: DateTime<Utc>,
}

/// Issue one customer code per request. Unnamed customers are labelled
/// `Customer_<n>` by position.
pub fn generate_bulk(customers: &[CustomerRequest]) -> Vec<GeneratedCode> {
    customers
        .iter()
        .enumerate()
        .map(|(index, request)| {
            let customer = if request.info.is_empty() {
                format!("Customer_{}", index + 1)
            } else {
                request.info.clone()
            };
            GeneratedCode {
                code: generate_customer_code(&customer),
                customer,
                phone: request.phone.clone().unwrap_or_default(),
                max_devices: request.max_devices.max(1),
                generated_at: Utc::now(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_format() {
        assert!(is_valid_code_format("TEACH_ABC123_XYZ_789"));
        assert!(!is_valid_code_format("INVALID_CODE"));
        assert!(!is_valid_code_format("teach_abc123_xyz_789"));
        assert!(!is_valid_code_format("TEACH_A_B_C"));
        assert!(!is_valid_code_format("TEACHERSCHOOLS_ABCDEFGHIJ_XYZ_7890"));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_295), "ZZ");
    }

    #[test]
    fn test_customer_hash() {
        assert_eq!(customer_hash(""), "GEN");
        // h("a") = 97 = "2P" in base 36
        assert_eq!(customer_hash("a"), "2P");
        assert_eq!(customer_hash("+237674667234"), customer_hash("+237674667234"));
        assert!(customer_hash("Lycee_Douala").len() <= 3);
    }

    #[test]
    fn test_generated_codes_are_well_formed() {
        let code = generate_customer_code("+237674667234");
        assert!(is_valid_code_format(code.as_str()), "{}", code);
        assert!(code.as_str().starts_with("TEACH_"));

        let code = generate_pattern_code("SCHOOL", "Lycee_Yaounde");
        assert!(is_valid_code_format(code.as_str()), "{}", code);

        let code = generate_code("TEACH");
        assert_eq!(code.as_str().split('_').count(), 3);
    }

    #[test]
    fn test_bulk_generation() {
        let codes = generate_bulk(&[
            CustomerRequest {
                info: "+237698765432".to_string(),
                phone: Some("+237698765432".to_string()),
                max_devices: 1,
            },
            CustomerRequest {
                info: String::new(),
                phone: None,
                max_devices: 5,
            },
        ]);

        assert_eq!(codes.len(), 2);
        assert_eq!(codes[1].customer, "Customer_2");
        assert_eq!(codes[1].max_devices, 5);
        assert_ne!(codes[0].code, codes[1].code);
    }

    #[test]
    fn test_prefix_validation() {
        assert!(is_valid_prefix("TEACH"));
        assert!(!is_valid_prefix(""));
        assert!(!is_valid_prefix("TE_ACH"));
    }
}
