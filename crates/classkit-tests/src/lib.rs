//! Integration test infrastructure for Classkit.
//!
//! Provides an in-process license service over an in-memory registry, and
//! testcontainers-based PostgreSQL for the database-backed registry.
//!
//! # Usage
//!
//! ```ignore
//! use classkit_tests::TestServer;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let server = TestServer::start(None).await.unwrap();
//!     // Use server.client, server.registry, etc.
//! }
//! ```

pub mod containers;
pub mod context;
pub mod fixtures;
pub mod helpers;

pub use context::TestContext;
pub use fixtures::*;
pub use helpers::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,classkit_tests=debug")),
        )
        .with_test_writer()
        .try_init();
}
