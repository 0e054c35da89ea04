//! Requirements and filters
//!
//! A requirement names something a module needs satisfied: a single imported
//! package or a wholesale dependency on another module. The filter expression
//! selects the capability (or module) that can satisfy it.

use crate::capability::Capability;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when parsing or validating a filter
#[derive(Debug, Error)]
pub enum FilterError {
    /// Empty filter expression
    #[error("Empty filter expression")]
    Empty,

    /// The package clause is empty
    #[error("Empty package name in filter: {0}")]
    EmptyPackage(String),

    /// An attribute clause is not of the `key=value` form
    #[error("Malformed clause `{clause}` in filter: {filter}")]
    MalformedClause {
        /// The full filter text
        filter: String,
        /// The offending clause
        clause: String,
    },

    /// Wildcard packages are only valid in dynamic requirements
    #[error("Wildcard package `{0}` is only valid in a dynamic requirement")]
    WildcardNotDynamic(String),
}

/// What kind of dependency a requirement expresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementKind {
    /// Import of a single named package
    ImportPackage,
    /// Wholesale dependence on another module
    RequireModule,
}

/// When a requirement is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Must be wired at module-resolution time
    Mandatory,
    /// May remain unwired without failing resolution
    Optional,
    /// Wired on demand, the first time a matching symbol is looked up
    Dynamic,
}

/// Filter expression over a package name and capability attributes
///
/// Compact text form: `package` or `package;key=value;key2=value2`.
/// Dynamic requirements may use a wildcard package position: `*` matches
/// every package, `com.example.*` matches the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Package (or module name, for RequireModule) this filter selects
    pub package: String,

    /// Attribute equality clauses, all of which must match
    pub attributes: Vec<(String, String)>,
}

impl Filter {
    /// Filter matching a package name exactly, with no attribute clauses
    pub fn exact(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            attributes: Vec::new(),
        }
    }

    /// Parse the compact text form
    pub fn parse(text: &str) -> Result<Self, FilterError> {
        if text.trim().is_empty() {
            return Err(FilterError::Empty);
        }

        let mut clauses = text.split(';');
        let package = clauses
            .next()
            .map(str::trim)
            .filter(|p| !p.is_empty() && !p.contains('='))
            .ok_or_else(|| FilterError::EmptyPackage(text.to_string()))?
            .to_string();

        let mut attributes = Vec::new();
        for clause in clauses {
            let clause = clause.trim();
            let (key, value) = clause
                .split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .ok_or_else(|| FilterError::MalformedClause {
                    filter: text.to_string(),
                    clause: clause.to_string(),
                })?;
            attributes.push((key.trim().to_string(), value.trim().to_string()));
        }

        Ok(Self {
            package,
            attributes,
        })
    }

    /// Whether the package position is a wildcard (`*` or `prefix.*`)
    pub fn is_wildcard(&self) -> bool {
        self.package == "*" || self.package.ends_with(".*")
    }

    /// Evaluate the filter against a capability
    ///
    /// Exact package equality plus every attribute clause; wildcard filters
    /// match on package position only through [`Filter::matches_package`].
    pub fn matches(&self, capability: &Capability) -> bool {
        self.matches_package(&capability.package)
            && self.attributes.iter().all(|(key, value)| {
                capability.attributes.get(key).map(String::as_str) == Some(value.as_str())
            })
    }

    /// Wildcard-aware package match
    pub fn matches_package(&self, package: &str) -> bool {
        if self.package == "*" {
            return true;
        }
        if let Some(stem) = self.package.strip_suffix(".*") {
            return package == stem || package.strip_prefix(stem).is_some_and(|r| r.starts_with('.'));
        }
        self.package == package
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.package)?;
        for (key, value) in &self.attributes {
            write!(f, ";{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Something a module needs satisfied by the rest of the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Kind of dependency
    pub kind: RequirementKind,

    /// Capability selector
    pub filter: Filter,

    /// When the requirement is resolved
    pub resolution: Resolution,

    /// Whether a RequireModule dependency is re-exported to this module's
    /// own dependents
    #[serde(default)]
    pub reexport: bool,
}

impl Requirement {
    /// Mandatory package import
    pub fn import(filter: Filter) -> Self {
        Self {
            kind: RequirementKind::ImportPackage,
            filter,
            resolution: Resolution::Mandatory,
            reexport: false,
        }
    }

    /// Dynamic package import, wired on first matching lookup
    pub fn dynamic(filter: Filter) -> Self {
        Self {
            kind: RequirementKind::ImportPackage,
            filter,
            resolution: Resolution::Dynamic,
            reexport: false,
        }
    }

    /// Mandatory module dependency
    pub fn require(filter: Filter) -> Self {
        Self {
            kind: RequirementKind::RequireModule,
            filter,
            resolution: Resolution::Mandatory,
            reexport: false,
        }
    }

    /// Mark a RequireModule dependency as re-exported
    pub fn with_reexport(mut self) -> Self {
        self.reexport = true;
        self
    }

    /// Validate the requirement for use by the engine
    ///
    /// Wildcard package filters are only meaningful for dynamic imports;
    /// everything else must name its package exactly.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.filter.is_wildcard() && self.resolution != Resolution::Dynamic {
            return Err(FilterError::WildcardNotDynamic(self.filter.package.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_only() {
        let filter = Filter::parse("com.example.util").unwrap();
        assert_eq!(filter.package, "com.example.util");
        assert!(filter.attributes.is_empty());
    }

    #[test]
    fn test_parse_with_attributes() {
        let filter = Filter::parse("com.example.util;vendor=acme;release=stable").unwrap();
        assert_eq!(filter.package, "com.example.util");
        assert_eq!(filter.attributes.len(), 2);
        assert_eq!(filter.attributes[0], ("vendor".to_string(), "acme".to_string()));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(Filter::parse("  "), Err(FilterError::Empty)));
    }

    #[test]
    fn test_parse_missing_package() {
        let result = Filter::parse("vendor=acme");
        assert!(matches!(result, Err(FilterError::EmptyPackage(_))));
    }

    #[test]
    fn test_parse_malformed_clause() {
        let result = Filter::parse("com.example.util;vendor");
        assert!(matches!(result, Err(FilterError::MalformedClause { .. })));
    }

    #[test]
    fn test_matches_attributes() {
        let filter = Filter::parse("com.example.util;vendor=acme").unwrap();
        let matching = Capability::new("com.example.util").with_attribute("vendor", "acme");
        let wrong_vendor = Capability::new("com.example.util").with_attribute("vendor", "other");
        let no_attrs = Capability::new("com.example.util");

        assert!(filter.matches(&matching));
        assert!(!filter.matches(&wrong_vendor));
        assert!(!filter.matches(&no_attrs));
    }

    #[test]
    fn test_wildcard_matching() {
        let all = Filter::exact("*");
        assert!(all.matches_package("anything.at.all"));

        let prefix = Filter::exact("com.example.*");
        assert!(prefix.matches_package("com.example"));
        assert!(prefix.matches_package("com.example.util"));
        assert!(prefix.matches_package("com.example.util.inner"));
        assert!(!prefix.matches_package("com.exampleother"));
        assert!(!prefix.matches_package("org.example.util"));
    }

    #[test]
    fn test_validate_wildcard_requires_dynamic() {
        let wildcard = Filter::exact("com.example.*");
        assert!(Requirement::dynamic(wildcard.clone()).validate().is_ok());
        assert!(matches!(
            Requirement::import(wildcard).validate(),
            Err(FilterError::WildcardNotDynamic(_))
        ));
    }

    #[test]
    fn test_display_roundtrip() {
        let filter = Filter::parse("com.example.util;vendor=acme").unwrap();
        assert_eq!(Filter::parse(&filter.to_string()).unwrap(), filter);
    }
}
