//! Device-bound license activation and trial gating for Classkit.

pub mod codes;
pub mod device;
pub mod gate;
pub mod manager;
pub mod registry;
pub mod remote;
pub mod trial;

pub use codes::{
    CustomerRequest, GeneratedCode, PREDEFINED_CODES, generate_bulk, is_valid_code_format,
};
pub use device::{DeviceIdentity, DeviceInfo};
pub use gate::{FeatureGate, GatePolicy};
pub use manager::{DeviceReport, LicenseManager};
pub use registry::LicenseRegistry;
pub use remote::{HttpLicenseAuthority, RemoteConfig};
pub use trial::TrialClock;
