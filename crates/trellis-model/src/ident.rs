//! Module identities
//!
//! A module is identified by its name plus its semver version. Identities are
//! immutable and hashable; the engine keys every per-module cache on them.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when parsing a module identity
#[derive(Debug, Error)]
pub enum IdError {
    /// Missing the `@version` suffix
    #[error("Missing version in module spec: {0}")]
    MissingVersion(String),

    /// Empty module name
    #[error("Empty module name in spec: {0}")]
    EmptyName(String),

    /// Invalid semver version
    #[error("Invalid version in module spec: {0}")]
    InvalidVersion(#[from] semver::Error),
}

/// Stable identity of a module revision: name plus version
///
/// Two revisions of the same module carry the same name but different
/// versions and are distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId {
    /// Module name (unique within a registry)
    pub name: String,

    /// Semver version of this revision
    pub version: Version,
}

impl ModuleId {
    /// Create a module identity from a name and a parsed version
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse a `name@version` spec, e.g. `logging@1.2.3`
    pub fn parse(spec: &str) -> Result<Self, IdError> {
        let (name, version) = spec
            .rsplit_once('@')
            .ok_or_else(|| IdError::MissingVersion(spec.to_string()))?;

        if name.is_empty() {
            return Err(IdError::EmptyName(spec.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            version: Version::parse(version)?,
        })
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let id = ModuleId::parse("logging@1.2.3").unwrap();
        assert_eq!(id.name, "logging");
        assert_eq!(id.version, Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_missing_version() {
        let result = ModuleId::parse("logging");
        assert!(matches!(result, Err(IdError::MissingVersion(_))));
    }

    #[test]
    fn test_parse_empty_name() {
        let result = ModuleId::parse("@1.0.0");
        assert!(matches!(result, Err(IdError::EmptyName(_))));
    }

    #[test]
    fn test_parse_invalid_version() {
        let result = ModuleId::parse("logging@not-a-version");
        assert!(matches!(result, Err(IdError::InvalidVersion(_))));
    }

    #[test]
    fn test_display_roundtrip() {
        let id = ModuleId::new("http", Version::new(2, 0, 1));
        assert_eq!(id.to_string(), "http@2.0.1");
        assert_eq!(ModuleId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_distinct_revisions() {
        let a = ModuleId::new("core", Version::new(1, 0, 0));
        let b = ModuleId::new("core", Version::new(1, 0, 1));
        assert_ne!(a, b);
    }
}
