//! Symbol naming and lookup results
//!
//! Class names are fully qualified (`com.example.util.Helper`); resource
//! paths are slash-separated (`com/example/util/strings.props`). Both map to
//! a package for delegation purposes.

use crate::ident::ModuleId;
use serde::{Deserialize, Serialize};
use url::Url;

/// Package portion of a fully qualified class name
///
/// Unqualified names live in the default package, `""`.
pub fn package_of(class_name: &str) -> &str {
    match class_name.rsplit_once('.') {
        Some((package, _)) => package,
        None => "",
    }
}

/// Package a slash-separated resource path belongs to
pub fn package_of_path(path: &str) -> String {
    let path = path.trim_start_matches('/');
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.replace('/', "."),
        None => String::new(),
    }
}

/// Engine-visible result of a class lookup
///
/// Decoding the class's binary representation is the content store's
/// concern; the engine only decides which module defines it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedClass {
    /// Fully qualified class name
    pub name: String,

    /// Module whose content defined the class
    pub defined_by: ModuleId,
}

impl LoadedClass {
    /// Create a lookup result
    pub fn new(name: impl Into<String>, defined_by: ModuleId) -> Self {
        Self {
            name: name.into(),
            defined_by,
        }
    }
}

/// Canonical location of a resource inside a module
///
/// Scheme: `module://<name>@<version>/<path>`.
pub fn resource_url(module: &ModuleId, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "module://{}@{}/{}",
        module.name,
        module.version,
        path.trim_start_matches('/')
    ))
}
