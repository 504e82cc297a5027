use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RegistryError;
use crate::networks::{NetworkTable, DEFAULT_NETWORKS};

const TAG: &str = " | config | ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Network support table used instead of the bundled one
    pub networks_file: Option<PathBuf>,
    /// Tracing filter used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            networks_file: None,
            log_filter: "info".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        let config: RegistryConfig = serde_json::from_str(&content)?;
        info!("{TAG} loaded config from {:?}", path);
        Ok(config)
    }

    /// The configured network table, or the bundled one when none is set.
    pub fn network_table(&self) -> Result<NetworkTable, RegistryError> {
        match &self.networks_file {
            Some(path) => NetworkTable::load(path),
            None => Ok(DEFAULT_NETWORKS.clone()),
        }
    }
}
