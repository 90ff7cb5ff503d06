//! Classkit Core
//!
//! Licensing domain types, port traits, and error handling for Classkit.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used by the registry, the local device state, the service and the CLI.

pub mod error;
pub mod feature;
pub mod ids;
pub mod keys;
pub mod license;
pub mod ports;
pub mod trial;

pub use error::{Error, Result};
pub use ids::*;
