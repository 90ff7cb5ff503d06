//! License registry store implementations.

mod file;
mod license;
mod memory;

pub use file::FileLicenseStore;
pub use license::PgLicenseStore;
pub use memory::MemoryLicenseStore;
