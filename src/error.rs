use std::path::PathBuf;

use thiserror::Error;

/// Errors from the fallible edges of the registry: config files, network
/// tables and replayed event logs. Reducer operations themselves never fail.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RegistryError::Io { path: path.into(), source }
    }
}
