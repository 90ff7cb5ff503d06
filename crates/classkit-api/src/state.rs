//! Application state shared across handlers.

use classkit_licensing::LicenseRegistry;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: LicenseRegistry,
    /// Bearer token guarding `/admin`. Admin routes are open when unset.
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(registry: LicenseRegistry, admin_token: Option<String>) -> Self {
        Self {
            registry,
            admin_token: admin_token.filter(|t| !t.is_empty()),
        }
    }
}
