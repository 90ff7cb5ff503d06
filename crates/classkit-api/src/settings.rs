//! Service settings: defaults, an optional file, then environment.

use classkit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub admin: Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    /// PostgreSQL URL. The registry lives in memory when unset.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Admin {
    /// Bearer token for `/api/v1/admin`.
    #[serde(default)]
    pub token: Option<String>,
}

impl Settings {
    /// Load settings. Environment overrides use `CLASSKIT__SECTION__KEY`,
    /// e.g. `CLASSKIT__SERVER__PORT=9090`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)
            .map_err(config_error)?
            .set_default("server.port", Server::default().port)
            .map_err(config_error)?;

        if let Some(path) = path
            && path.exists()
        {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("CLASSKIT").separator("__"));

        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(config_error)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn config_error(err: config::ConfigError) -> Error {
    Error::InvalidArgument(format!("configuration: {}", err))
}
