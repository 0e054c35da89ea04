//! Trellis Delegation Engine
//!
//! This crate decides, for any symbol lookup issued from within a module,
//! exactly which module supplies the answer:
//! - **Sources**: where a package's content comes from (`source` module)
//! - **Resolver**: lazy per-wiring import/export caches (`resolver` module)
//! - **Delegation**: the tiered lookup state machine (`delegation` module)
//! - **Loaders**: exactly-once lazy loader lifecycle (`loader` module)
//! - **Registry**: the engine root owning every module host (`registry` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_engine::{EngineConfig, LookupRequest, MemoryContent, ModuleRegistry};
//! use trellis_model::{Capability, ModuleId, WiringBuilder};
//!
//! let registry = ModuleRegistry::new(EngineConfig::default());
//!
//! let module = ModuleId::parse("app@1.0.0").unwrap();
//! let wiring = WiringBuilder::new(module.clone())
//!     .export(Capability::new("com.app"))
//!     .build()
//!     .unwrap();
//! let content = std::sync::Arc::new(MemoryContent::new(module.clone()));
//! content.add_class("com.app.Main");
//! registry.install(wiring, content).unwrap();
//!
//! let class = registry
//!     .find_class(&module, LookupRequest::new("com.app.Main"))
//!     .unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Engine configuration: boot delegation and compatibility flags
pub mod config;

/// Content store boundary: where a module's own bytes come from
pub mod content;

/// Delegation engine: the tiered lookup state machine
pub mod delegation;

/// Error taxonomy
pub mod error;

/// Extension hooks consulted during delegation
pub mod hooks;

/// Lazy loader lifecycle
pub mod loader;

/// Peer policy: optional secondary search scope
pub mod policy;

/// Module registry: the engine root
pub mod registry;

/// Import/export resolver: per-wiring lazy caches
pub mod resolver;

/// Package sources: single, merged, or definitively absent
pub mod source;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{ConfigError, EngineConfig};
pub use content::{ContentError, ContentStore, MemoryContent};
pub use delegation::{ListOptions, LookupRequest};
pub use error::{ResolveError, ResolveResult};
pub use hooks::DelegationHook;
pub use loader::LoaderHandle;
pub use policy::PeerPolicy;
pub use registry::{DynamicSolver, ModuleRegistry};
pub use resolver::{DynamicPatterns, WiringResolver};
pub use source::{PackageSource, SingleSource};
