//! Storage adapters for Classkit.
//!
//! Registry stores (in memory, JSON file, PostgreSQL) implement
//! [`classkit_core::ports::LicenseStore`]; device state stores (in memory,
//! JSON file) implement [`classkit_core::ports::KeyValueStore`].

pub mod kv;
pub mod repositories;

pub use kv::*;
pub use repositories::*;

use classkit_core::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Database connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| classkit_core::Error::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| classkit_core::Error::Database(e.to_string()))?;
        Ok(())
    }
}
