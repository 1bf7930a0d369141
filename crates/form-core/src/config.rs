//! Configuration management for the form pipeline

use crate::constants::DEFAULT_API_TIMEOUT_MS;
use crate::error::{FormsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `FORMS__DELIVERY__DEFAULT_TIMEOUT_MS`
const ENV_PREFIX: &str = "FORMS";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(alias = "path")] // Accept both 'data_dir' and 'path'
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Used when a template's API configuration has no timeout of its own
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

// Default functions
fn default_timeout_ms() -> u64 {
    DEFAULT_API_TIMEOUT_MS
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("form-pipeline/{}", env!("CARGO_PKG_VERSION"))
}

impl AppConfig {
    /// Load configuration from a JSON file, applying `FORMS__*` environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FormsError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Json))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| FormsError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| FormsError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FormsError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(FormsError::Config("Storage data_dir is required".to_string()));
        }

        if self.delivery.default_timeout_ms == 0 {
            return Err(FormsError::Config(
                "Delivery default_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.delivery.connect_timeout_ms == 0 {
            return Err(FormsError::Config(
                "Delivery connect_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
