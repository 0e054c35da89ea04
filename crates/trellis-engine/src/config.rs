//! Engine configuration
//!
//! Boot-delegation entries name package namespaces that always delegate to
//! the parent provider before any other tier. The legacy parent fallback is
//! a compatibility behavior and defaults off.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("Failed to parse engine config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Tunable engine behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Packages that always delegate to the parent provider first.
    /// Entries are exact package names, `stem.*` prefixes, or `*` for all.
    #[serde(default)]
    pub boot_delegation: Vec<String>,

    /// Retry the parent provider as a last resort for lookups that did not
    /// originate in the module's own loading machinery
    #[serde(default)]
    pub legacy_parent_fallback: bool,

    /// Whether an installed peer policy is consulted at all
    #[serde(default = "default_peer_policy_enabled")]
    pub peer_policy_enabled: bool,
}

fn default_peer_policy_enabled() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            boot_delegation: Vec::new(),
            legacy_parent_fallback: false,
            peer_policy_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Whether a package falls under boot delegation
    pub fn boot_delegates(&self, package: &str) -> bool {
        self.boot_delegation.iter().any(|entry| {
            if entry == "*" {
                return true;
            }
            if let Some(stem) = entry.strip_suffix(".*") {
                return package == stem
                    || package
                        .strip_prefix(stem)
                        .is_some_and(|rest| rest.starts_with('.'));
            }
            entry == package
        })
    }
}
