//! Content store boundary
//!
//! The content store supplies a module's own classes and resources. A miss is
//! `Ok(None)` or an empty list, never an error; errors are reserved for
//! activation-class faults, which the engine propagates without retrying.

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use thiserror::Error;
use trellis_model::{resource_url, LoadedClass, ModuleId};
use url::Url;

/// Faults a content store may signal
///
/// Both variants abort a lookup; `Io` covers transport-level failures the
/// engine treats the same as activation faults.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Fatal initialization error (e.g. unresolvable dependency at
    /// module-activation time)
    #[error("Activation failure: {0}")]
    Activation(String),

    /// I/O-class failure while reading content
    #[error("Content I/O failure: {0}")]
    Io(String),
}

/// Where a module's own classes and resources come from
pub trait ContentStore: Send + Sync {
    /// Look up a class by fully qualified name
    fn find_class(&self, class_name: &str) -> Result<Option<LoadedClass>, ContentError>;

    /// Locate a single resource by path
    fn find_resource(&self, path: &str) -> Result<Option<Url>, ContentError>;

    /// Locate every copy of a resource path this store holds
    fn find_resources(&self, path: &str) -> Result<Vec<Url>, ContentError>;

    /// List entry paths under a directory path
    fn list(&self, path: &str, recurse: bool) -> Result<Vec<String>, ContentError>;
}

/// In-memory content store
///
/// Holds a class-name set and a resource-path list; used by embedders that
/// assemble module content programmatically and by the test suites.
#[derive(Debug)]
pub struct MemoryContent {
    module: ModuleId,
    classes: RwLock<FxHashSet<String>>,
    resources: RwLock<Vec<String>>,
    activation_fault: RwLock<Option<String>>,
}

impl MemoryContent {
    /// Empty content for a module
    pub fn new(module: ModuleId) -> Self {
        Self {
            module,
            classes: RwLock::new(FxHashSet::default()),
            resources: RwLock::new(Vec::new()),
            activation_fault: RwLock::new(None),
        }
    }

    /// Register a class this module defines
    pub fn add_class(&self, class_name: impl Into<String>) {
        self.classes.write().insert(class_name.into());
    }

    /// Register a resource path this module holds
    pub fn add_resource(&self, path: impl Into<String>) {
        self.resources.write().push(path.into());
    }

    /// Make every subsequent access fail with an activation fault
    pub fn poison(&self, detail: impl Into<String>) {
        *self.activation_fault.write() = Some(detail.into());
    }

    fn check_fault(&self) -> Result<(), ContentError> {
        match self.activation_fault.read().as_ref() {
            Some(detail) => Err(ContentError::Activation(detail.clone())),
            None => Ok(()),
        }
    }

    fn url_for(&self, path: &str) -> Result<Url, ContentError> {
        resource_url(&self.module, path).map_err(|e| ContentError::Io(e.to_string()))
    }
}

impl ContentStore for MemoryContent {
    fn find_class(&self, class_name: &str) -> Result<Option<LoadedClass>, ContentError> {
        self.check_fault()?;
        if self.classes.read().contains(class_name) {
            Ok(Some(LoadedClass::new(class_name, self.module.clone())))
        } else {
            Ok(None)
        }
    }

    fn find_resource(&self, path: &str) -> Result<Option<Url>, ContentError> {
        self.check_fault()?;
        let path = path.trim_start_matches('/');
        if self.resources.read().iter().any(|r| r == path) {
            Ok(Some(self.url_for(path)?))
        } else {
            Ok(None)
        }
    }

    fn find_resources(&self, path: &str) -> Result<Vec<Url>, ContentError> {
        // A single store holds at most one copy of a path
        Ok(self.find_resource(path)?.into_iter().collect())
    }

    fn list(&self, path: &str, recurse: bool) -> Result<Vec<String>, ContentError> {
        self.check_fault()?;
        let prefix = path.trim_matches('/');
        let entries = self
            .resources
            .read()
            .iter()
            .filter(|r| {
                let rest = if prefix.is_empty() {
                    Some(r.as_str())
                } else {
                    r.strip_prefix(prefix)
                        .and_then(|rest| rest.strip_prefix('/'))
                };
                match rest {
                    Some(rest) => recurse || !rest.contains('/'),
                    None => false,
                }
            })
            .cloned()
            .collect();
        Ok(entries)
    }
}
