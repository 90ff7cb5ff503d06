//! Test context over a PostgreSQL-backed registry.

use crate::containers::PostgresContainer;
use classkit_db::{Database, PgLicenseStore};
use classkit_licensing::LicenseRegistry;
use std::sync::Arc;

/// PostgreSQL running with migrations applied.
///
/// Drop this to stop the container.
pub struct TestContext {
    pub postgres: PostgresContainer,
    pub db: Database,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        crate::init_test_logging();

        let postgres = PostgresContainer::start().await?;
        let db = Database::connect(postgres.connection_string()).await?;
        db.migrate().await?;

        Ok(Self { postgres, db })
    }

    /// A fresh store over this database.
    pub fn store(&self) -> Arc<PgLicenseStore> {
        Arc::new(PgLicenseStore::new(self.db.pool().clone()))
    }

    /// A seeded registry over this database.
    pub async fn registry(&self) -> anyhow::Result<LicenseRegistry> {
        let registry = LicenseRegistry::new(self.store());
        registry.ensure_seeded().await?;
        Ok(registry)
    }

    /// Get database connection string.
    pub fn db_url(&self) -> &str {
        self.postgres.connection_string()
    }
}
