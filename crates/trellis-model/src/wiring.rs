//! Resolved wirings
//!
//! A wiring is the per-resolved-instance record of a module: the capabilities
//! it exports and the wires connecting its requirements to the providing
//! wirings chosen by the external constraint solver. Wire lists are frozen at
//! construction; the exported capability list may only grow, via fragment
//! attachment. A refresh supersedes the whole wiring and marks it stale.
//!
//! Wires reference their provider by identity and revision rather than by
//! pointer: the module graph may be cyclic, and a refreshed provider must
//! become unreachable through old wires without touching every dependent.

use crate::capability::Capability;
use crate::ident::ModuleId;
use crate::requirement::{Requirement, RequirementKind, Resolution};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while assembling a wiring
#[derive(Debug, Error)]
pub enum WiringError {
    /// An import wire carries a non-ImportPackage requirement
    #[error("Import wire for {module} must carry an ImportPackage requirement (got {package})")]
    ImportKindMismatch {
        /// Module being wired
        module: ModuleId,
        /// Offending requirement's package
        package: String,
    },

    /// A require wire carries a non-RequireModule requirement
    #[error("Require wire for {module} must carry a RequireModule requirement (got {package})")]
    RequireKindMismatch {
        /// Module being wired
        module: ModuleId,
        /// Offending requirement's package
        package: String,
    },

    /// A dynamic declaration is not a Dynamic-resolution import
    #[error("Dynamic declaration for {module} must be a Dynamic ImportPackage requirement (got {package})")]
    NotDynamic {
        /// Module being wired
        module: ModuleId,
        /// Offending requirement's package
        package: String,
    },
}

/// Reference to a specific wiring instance: module identity plus revision
///
/// A refresh bumps the provider's revision, so references held by old wires
/// stop resolving and the wire is observed as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WiringRef {
    /// Module the referenced wiring resolves
    pub module: ModuleId,

    /// Revision of the referenced wiring
    pub revision: u64,
}

impl WiringRef {
    /// Reference a wiring instance by identity and revision
    pub fn new(module: ModuleId, revision: u64) -> Self {
        Self { module, revision }
    }
}

impl From<&Arc<Wiring>> for WiringRef {
    fn from(wiring: &Arc<Wiring>) -> Self {
        Self {
            module: wiring.module().clone(),
            revision: wiring.revision(),
        }
    }
}

impl fmt::Display for WiringRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module, self.revision)
    }
}

/// One edge in the wiring graph: a requirement matched to a provider
///
/// Created once by the external solver when the module is resolved and fixed
/// for the wiring's lifetime.
#[derive(Debug, Clone)]
pub struct Wire {
    requirement: Requirement,
    provider: WiringRef,
}

impl Wire {
    /// The requirement this wire satisfies
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// The providing wiring instance this wire was resolved against
    pub fn provider(&self) -> &WiringRef {
        &self.provider
    }
}

/// Per-resolved-instance state of a module
#[derive(Debug)]
pub struct Wiring {
    module: ModuleId,
    revision: u64,
    exported: RwLock<Vec<Capability>>,
    import_wires: Vec<Wire>,
    require_wires: Vec<Wire>,
    dynamic_requirements: Vec<Requirement>,
    stale: AtomicBool,
}

impl Wiring {
    /// Identity of the module this wiring resolves
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Revision counter, bumped by the solver on each refresh
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Reference to this wiring instance
    pub fn wiring_ref(&self) -> WiringRef {
        WiringRef {
            module: self.module.clone(),
            revision: self.revision,
        }
    }

    /// Snapshot of the exported capabilities (base plus attached fragments)
    pub fn exported_capabilities(&self) -> Vec<Capability> {
        self.exported.read().clone()
    }

    /// First exported capability for a package, if any
    pub fn export_capability_for(&self, package: &str) -> Option<Capability> {
        self.exported
            .read()
            .iter()
            .find(|cap| cap.package == package)
            .cloned()
    }

    /// Wires satisfying ImportPackage requirements
    pub fn import_wires(&self) -> &[Wire] {
        &self.import_wires
    }

    /// Wires satisfying RequireModule requirements
    pub fn require_wires(&self) -> &[Wire] {
        &self.require_wires
    }

    /// Dynamic import declarations, unwired until first matching lookup
    pub fn dynamic_requirements(&self) -> &[Requirement] {
        &self.dynamic_requirements
    }

    /// Union a fragment's exported capabilities into this wiring
    ///
    /// Grow-only: existing entries are never mutated or removed.
    pub fn attach_fragment_capabilities(&self, capabilities: Vec<Capability>) {
        self.exported.write().extend(capabilities);
    }

    /// Mark this wiring as superseded by a refresh
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Whether this wiring has been superseded
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }
}

/// Assembles a [`Wiring`], the construction seam used by the solver
#[derive(Debug)]
pub struct WiringBuilder {
    module: ModuleId,
    revision: u64,
    exported: Vec<Capability>,
    imports: Vec<(Requirement, WiringRef)>,
    requires: Vec<(Requirement, WiringRef)>,
    dynamics: Vec<Requirement>,
}

impl WiringBuilder {
    /// Start a wiring for a module
    pub fn new(module: ModuleId) -> Self {
        Self {
            module,
            revision: 0,
            exported: Vec::new(),
            imports: Vec::new(),
            requires: Vec::new(),
            dynamics: Vec::new(),
        }
    }

    /// Set the revision counter
    pub fn revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Declare an exported capability
    pub fn export(mut self, capability: Capability) -> Self {
        self.exported.push(capability);
        self
    }

    /// Wire an import requirement to its provider
    pub fn import(mut self, requirement: Requirement, provider: impl Into<WiringRef>) -> Self {
        self.imports.push((requirement, provider.into()));
        self
    }

    /// Wire a module requirement to its provider
    pub fn require(mut self, requirement: Requirement, provider: impl Into<WiringRef>) -> Self {
        self.requires.push((requirement, provider.into()));
        self
    }

    /// Declare a dynamic import, left unwired until first lookup
    pub fn dynamic(mut self, requirement: Requirement) -> Self {
        self.dynamics.push(requirement);
        self
    }

    /// Freeze the wire lists and produce the wiring
    pub fn build(self) -> Result<Arc<Wiring>, WiringError> {
        for (requirement, _) in &self.imports {
            if requirement.kind != RequirementKind::ImportPackage {
                return Err(WiringError::ImportKindMismatch {
                    module: self.module.clone(),
                    package: requirement.filter.package.clone(),
                });
            }
        }
        for (requirement, _) in &self.requires {
            if requirement.kind != RequirementKind::RequireModule {
                return Err(WiringError::RequireKindMismatch {
                    module: self.module.clone(),
                    package: requirement.filter.package.clone(),
                });
            }
        }
        for requirement in &self.dynamics {
            if requirement.kind != RequirementKind::ImportPackage
                || requirement.resolution != Resolution::Dynamic
            {
                return Err(WiringError::NotDynamic {
                    module: self.module.clone(),
                    package: requirement.filter.package.clone(),
                });
            }
        }

        let into_wire = |(requirement, provider)| Wire {
            requirement,
            provider,
        };

        Ok(Arc::new(Wiring {
            module: self.module,
            revision: self.revision,
            exported: RwLock::new(self.exported),
            import_wires: self.imports.into_iter().map(into_wire).collect(),
            require_wires: self.requires.into_iter().map(into_wire).collect(),
            dynamic_requirements: self.dynamics,
            stale: AtomicBool::new(false),
        }))
    }
}
