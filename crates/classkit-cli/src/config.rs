//! CLI configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// License service URL. Activations are decided locally when unset.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Bearer token for the service's admin routes.
    #[serde(default)]
    pub admin_token: Option<String>,
    /// Where device state and the local registry are kept.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Deny actions the feature gate does not know.
    #[serde(default)]
    pub fail_closed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl CliConfig {
    /// Load configuration from file.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn project_dirs() -> Result<directories::ProjectDirs, Box<dyn std::error::Error>> {
        Ok(directories::ProjectDirs::from("app", "classkit", "classkit")
            .ok_or("Could not determine config directory")?)
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    /// Directory holding `state.json` and `registry.json`.
    pub fn data_dir(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }

    /// Set a configuration value. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
        match key {
            "api_url" => self.api_url = optional(value),
            "admin_token" => self.admin_token = optional(value),
            "data_dir" => self.data_dir = optional(value).map(PathBuf::from),
            "output_format" => {
                self.output_format = match value {
                    "table" => OutputFormat::Table,
                    "json" => OutputFormat::Json,
                    "yaml" => OutputFormat::Yaml,
                    _ => return Err(format!("Invalid output format: {}", value)),
                };
            }
            "fail_closed" => {
                self.fail_closed = value
                    .parse()
                    .map_err(|_| format!("Invalid boolean for fail_closed: {}", value))?;
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_known_keys() {
        let mut config = CliConfig::default();
        config.set("api_url", "https://licenses.example.com/api/v1").unwrap();
        config.set("output_format", "json").unwrap();
        config.set("fail_closed", "true").unwrap();

        assert_eq!(config.api_url.as_deref(), Some("https://licenses.example.com/api/v1"));
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(config.fail_closed);

        config.set("api_url", "").unwrap();
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = CliConfig::default();
        assert!(config.set("output_format", "xml").is_err());
        assert!(config.set("fail_closed", "maybe").is_err());
        assert!(config.set("token", "x").is_err());
    }

    #[test]
    fn test_yaml_defaults() {
        let config: CliConfig = serde_yaml::from_str("api_url: http://localhost:8080/api/v1\n").unwrap();
        assert_eq!(config.output_format, OutputFormat::Table);
        assert!(!config.fail_closed);
        assert!(config.admin_token.is_none());
    }
}
