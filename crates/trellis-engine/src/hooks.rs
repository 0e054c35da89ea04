//! Extension hooks
//!
//! Hooks are ordered trait objects consulted at fixed points of the
//! delegation chain. Single-value hooks are first-non-None-wins; the
//! loader-created hook is invoked for each registered hook, exactly once per
//! published loader.

use crate::loader::LoaderHandle;
use parking_lot::RwLock;
use std::sync::Arc;
use trellis_model::{LoadedClass, ModuleId};
use url::Url;

/// Extension point consulted during delegation
///
/// Every method defaults to "no answer"; implementors override the ones they
/// care about.
pub trait DelegationHook: Send + Sync {
    /// May short-circuit a class lookup before delegation starts
    fn pre_find_class(&self, _module: &ModuleId, _name: &str) -> Option<LoadedClass> {
        None
    }

    /// May supply a class after every primary tier failed
    fn post_find_class(&self, _module: &ModuleId, _name: &str) -> Option<LoadedClass> {
        None
    }

    /// May short-circuit a resource lookup before delegation starts
    fn pre_find_resource(&self, _module: &ModuleId, _path: &str) -> Option<Url> {
        None
    }

    /// May supply a resource after every primary tier failed
    fn post_find_resource(&self, _module: &ModuleId, _path: &str) -> Option<Url> {
        None
    }

    /// May short-circuit a resource enumeration before delegation starts
    fn pre_find_resources(&self, _module: &ModuleId, _path: &str) -> Option<Vec<Url>> {
        None
    }

    /// May append to a resource enumeration after the primary tiers ran
    fn post_find_resources(&self, _module: &ModuleId, _path: &str) -> Option<Vec<Url>> {
        None
    }

    /// Observes a loader at publication; returning `Err` vetoes construction
    fn loader_created(&self, _loader: &LoaderHandle) -> Result<(), String> {
        Ok(())
    }
}

/// Ordered hook list
#[derive(Default)]
pub(crate) struct HookChain {
    hooks: RwLock<Vec<Arc<dyn DelegationHook>>>,
}

impl HookChain {
    pub fn add(&self, hook: Arc<dyn DelegationHook>) {
        self.hooks.write().push(hook);
    }

    pub fn pre_find_class(&self, module: &ModuleId, name: &str) -> Option<LoadedClass> {
        self.hooks
            .read()
            .iter()
            .find_map(|hook| hook.pre_find_class(module, name))
    }

    pub fn post_find_class(&self, module: &ModuleId, name: &str) -> Option<LoadedClass> {
        self.hooks
            .read()
            .iter()
            .find_map(|hook| hook.post_find_class(module, name))
    }

    pub fn pre_find_resource(&self, module: &ModuleId, path: &str) -> Option<Url> {
        self.hooks
            .read()
            .iter()
            .find_map(|hook| hook.pre_find_resource(module, path))
    }

    pub fn post_find_resource(&self, module: &ModuleId, path: &str) -> Option<Url> {
        self.hooks
            .read()
            .iter()
            .find_map(|hook| hook.post_find_resource(module, path))
    }

    pub fn pre_find_resources(&self, module: &ModuleId, path: &str) -> Option<Vec<Url>> {
        self.hooks
            .read()
            .iter()
            .find_map(|hook| hook.pre_find_resources(module, path))
    }

    pub fn post_find_resources(&self, module: &ModuleId, path: &str) -> Option<Vec<Url>> {
        self.hooks
            .read()
            .iter()
            .find_map(|hook| hook.post_find_resources(module, path))
    }

    /// Invoke every loader-created hook; the first veto wins
    pub fn loader_created(&self, loader: &LoaderHandle) -> Result<(), String> {
        for hook in self.hooks.read().iter() {
            hook.loader_created(loader)?;
        }
        Ok(())
    }
}
