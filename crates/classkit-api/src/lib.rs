//! HTTP license service for Classkit.
//!
//! Hosts a [`LicenseRegistry`] so activation decisions are made server-side
//! instead of on the device.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod settings;
pub mod state;

use axum::Router;
use classkit_core::ports::LicenseStore;
use classkit_core::{Error, Result};
use classkit_db::{Database, MemoryLicenseStore, PgLicenseStore};
use classkit_licensing::LicenseRegistry;
use settings::Settings;
use state::AppState;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the service router over a registry.
pub fn build_app(registry: LicenseRegistry, admin_token: Option<String>) -> Router {
    routes::create_router(Arc::new(AppState::new(registry, admin_token)))
}

/// Open the configured registry store and seed the predefined codes.
pub async fn open_registry(settings: &Settings) -> Result<LicenseRegistry> {
    let store: Arc<dyn LicenseStore> = match &settings.database.url {
        Some(url) => {
            let db = Database::connect(url).await?;
            db.migrate().await?;
            info!("Using PostgreSQL license registry");
            Arc::new(PgLicenseStore::new(db.pool().clone()))
        }
        None => {
            warn!("No database configured, registry is kept in memory");
            Arc::new(MemoryLicenseStore::new())
        }
    };

    let registry = LicenseRegistry::new(store);
    registry.ensure_seeded().await?;
    Ok(registry)
}

/// Run the service until Ctrl+C.
pub async fn serve(settings: Settings) -> Result<()> {
    if settings.admin.token.is_none() {
        warn!("No admin token configured, admin routes are open");
    }

    let registry = open_registry(&settings).await?;
    let app = build_app(registry, settings.admin.token.clone());

    let addr = settings.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Network(format!("bind {}: {}", addr, e)))?;
    info!(addr = %addr, "License service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server");
}
