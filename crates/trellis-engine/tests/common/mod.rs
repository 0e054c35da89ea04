//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use semver::Version;
use std::sync::Arc;
use trellis_engine::{EngineConfig, MemoryContent, ModuleRegistry};
use trellis_model::{Capability, Filter, ModuleId, Requirement, Wiring};

pub fn mid(name: &str) -> ModuleId {
    ModuleId::new(name, Version::new(1, 0, 0))
}

pub fn registry() -> ModuleRegistry {
    ModuleRegistry::new(EngineConfig::default())
}

pub fn cap(package: &str) -> Capability {
    Capability::new(package)
}

pub fn import(package: &str) -> Requirement {
    Requirement::import(Filter::exact(package))
}

pub fn require(module: &str) -> Requirement {
    Requirement::require(Filter::exact(module))
}

pub fn reexport(module: &str) -> Requirement {
    Requirement::require(Filter::exact(module)).with_reexport()
}

pub fn dynamic(pattern: &str) -> Requirement {
    Requirement::dynamic(Filter::exact(pattern))
}

pub fn content_for(module: &ModuleId, classes: &[&str], resources: &[&str]) -> Arc<MemoryContent> {
    let content = Arc::new(MemoryContent::new(module.clone()));
    for class in classes {
        content.add_class(*class);
    }
    for resource in resources {
        content.add_resource(*resource);
    }
    content
}

pub fn install_with(
    registry: &ModuleRegistry,
    wiring: Arc<Wiring>,
    classes: &[&str],
    resources: &[&str],
) -> Arc<MemoryContent> {
    let content = content_for(wiring.module(), classes, resources);
    registry.install(wiring, content.clone()).unwrap();
    content
}
