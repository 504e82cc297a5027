use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::RegistryError;
use crate::utils::validate_version;

const TAG: &str = " | networks | ";
const BUNDLED_NETWORKS: &str = include_str!("../networks.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub testnet: bool,
    /// Minimum firmware version per internal device model. Models not listed
    /// are not restricted by the app.
    #[serde(default)]
    pub support: BTreeMap<String, String>,
}

/// Ordered table of networks the app knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTable {
    pub networks: Vec<Network>,
}

/// Table bundled with the crate, see `networks.json`.
pub static DEFAULT_NETWORKS: Lazy<NetworkTable> = Lazy::new(|| {
    NetworkTable::from_json(BUNDLED_NETWORKS).unwrap_or_else(|e| {
        error!("{TAG} bundled network table is invalid: {}", e);
        NetworkTable::default()
    })
});

impl NetworkTable {
    /// Parses a table, rejecting minimum versions that aren't valid semver.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let table: NetworkTable = serde_json::from_str(json)?;
        for network in &table.networks {
            for version in network.support.values() {
                validate_version(version)?;
            }
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::io(path, e))?;
        let table = Self::from_json(&content)?;
        info!("{TAG} loaded {} networks from {:?}", table.networks.len(), path);
        Ok(table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Network> {
        self.networks.iter()
    }

    pub fn get(&self, symbol: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_table() {
        assert!(DEFAULT_NETWORKS.get("btc").is_some());
        let ada = DEFAULT_NETWORKS.get("ada").unwrap();
        assert_eq!(ada.support.get("T2T1").map(String::as_str), Some("2.3.2"));
    }

    #[test]
    fn test_rejects_invalid_min_version() {
        let json = r#"{"networks": [
            {"symbol": "sol", "name": "Solana", "support": {"T2T1": "two"}}
        ]}"#;
        assert!(matches!(
            NetworkTable::from_json(json),
            Err(RegistryError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"networks": [{{"symbol": "btc", "name": "Bitcoin"}}]}}"#).unwrap();

        let table = NetworkTable::load(file.path()).unwrap();
        assert_eq!(table.networks.len(), 1);
        assert!(matches!(
            NetworkTable::load(Path::new("/nonexistent/networks.json")),
            Err(RegistryError::Io { .. })
        ));
    }
}
