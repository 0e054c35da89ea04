//! Engine error taxonomy
//!
//! `NotFound` and `StaleProvider` are routine and recovered by falling
//! through delegation tiers; `ActivationFailure` aborts the whole lookup;
//! `MalformedRequirement` is a construction-time fault surfaced at install
//! time, never at lookup time.

use thiserror::Error;
use trellis_model::{FilterError, ModuleId, WiringError};

/// Errors produced by the delegation engine and registry
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Symbol absent after the full precedence chain
    #[error("{name} not found in module {module}")]
    NotFound {
        /// Module the lookup was issued from
        module: ModuleId,
        /// Class name or resource path
        name: String,
    },

    /// A wire's provider wiring has been refreshed away
    #[error("Provider {provider} has been refreshed; wire is stale")]
    StaleProvider {
        /// The superseded provider
        provider: ModuleId,
    },

    /// The content store signalled a fatal initialization error
    #[error("Module {module} failed to activate: {detail}")]
    ActivationFailure {
        /// Module whose content faulted
        module: ModuleId,
        /// Underlying failure description
        detail: String,
    },

    /// A loader-created hook rejected construction
    #[error("Loader construction for {module} vetoed: {reason}")]
    ConstructionVetoed {
        /// Module whose loader was vetoed
        module: ModuleId,
        /// Hook-supplied reason
        reason: String,
    },

    /// A requirement failed validation at resolver construction
    #[error("Malformed requirement: {0}")]
    MalformedRequirement(#[from] FilterError),

    /// A wiring failed validation at install
    #[error("Invalid wiring: {0}")]
    InvalidWiring(#[from] WiringError),

    /// Lookup against a module the registry does not know
    #[error("Module {module} is not installed")]
    NotInstalled {
        /// The unknown module
        module: ModuleId,
    },

    /// A resource-listing pattern failed to parse
    #[error("Invalid listing pattern: {pattern}")]
    InvalidPattern {
        /// The offending glob pattern
        pattern: String,
    },
}

/// Result alias used throughout the engine
pub type ResolveResult<T> = Result<T, ResolveError>;

impl ResolveError {
    /// Whether the error is routine (absent symbol) rather than a fault
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ResolveError::NotFound { .. }
                | ResolveError::StaleProvider { .. }
                | ResolveError::NotInstalled { .. }
        )
    }
}
