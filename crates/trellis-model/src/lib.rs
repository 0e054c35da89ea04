//! Trellis module model
//!
//! This crate provides the data model consumed by the trellis engine:
//! - **Identity**: versioned module identities (`ident` module)
//! - **Capabilities**: exported packages and their attributes (`capability` module)
//! - **Requirements**: imports, module dependencies, and filters (`requirement` module)
//! - **Wiring**: resolved wires between module instances (`wiring` module)
//! - **Symbols**: class names, resource paths, and lookup results (`symbols` module)
//!
//! Everything here is produced by external collaborators (a manifest parser
//! and a constraint solver) and consumed by the engine; the model itself
//! performs no resolution.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Identity module: versioned module identities
pub mod ident;

/// Capability module: exported packages and attributes
pub mod capability;

/// Requirement module: imports, dependencies, and filters
pub mod requirement;

/// Wiring module: resolved wires between module instances
pub mod wiring;

/// Symbols module: class names, resource paths, and lookup results
pub mod symbols;

pub use capability::Capability;
pub use ident::{IdError, ModuleId};
pub use requirement::{Filter, FilterError, Requirement, RequirementKind, Resolution};
pub use symbols::{package_of, package_of_path, resource_url, LoadedClass};
pub use wiring::{Wire, Wiring, WiringBuilder, WiringError, WiringRef};
