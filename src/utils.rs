use semver::Version;

use crate::error::RegistryError;

fn parse_version(version: &str) -> Result<Version, RegistryError> {
    Version::parse(version.trim_start_matches('v')).map_err(|source| RegistryError::InvalidVersion {
        version: version.to_string(),
        source,
    })
}

// Compares two version strings. Returns Ok(true) if current_version < required_version.
// Returns Err if parsing fails.
pub fn is_version_older(
    current_version: &str,
    required_version: &str,
) -> Result<bool, RegistryError> {
    let current = parse_version(current_version)?;
    let required = parse_version(required_version)?;
    Ok(current < required)
}

/// Returns Ok(true) if `current_version` is `required_version` or later.
pub fn is_newer_or_equal(
    current_version: &str,
    required_version: &str,
) -> Result<bool, RegistryError> {
    is_version_older(current_version, required_version).map(|older| !older)
}

/// Checks that a version string is valid semver, accepting an optional `v` prefix.
pub fn validate_version(version: &str) -> Result<(), RegistryError> {
    parse_version(version).map(|_| ())
}
