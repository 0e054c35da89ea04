//! Exported capabilities
//!
//! A capability is a named package a module offers to the rest of the graph,
//! together with the attributes requirement filters match against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A package a module exports, with matching attributes
///
/// Declared by exactly one module revision and immutable once constructed.
/// Attribute values arrive normalized to strings from the manifest parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Exported package name
    pub package: String,

    /// Attribute map consulted by requirement filters
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Capability {
    /// Create a capability for a package with no attributes
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute, consuming and returning the capability
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
