//! Module registry
//!
//! The engine root: owns every per-module host (wiring + resolver + loader
//! slot + content chain) and exposes the public lookup API. Constructed at
//! process start and torn down at shutdown; all caches live here or in the
//! hosts it owns, never in globals.

use crate::config::EngineConfig;
use crate::content::{ContentError, ContentStore};
use crate::delegation::{Delegation, ListOptions, LookupRequest};
use crate::error::{ResolveError, ResolveResult};
use crate::hooks::{DelegationHook, HookChain};
use crate::loader::{LoaderHandle, LoaderSlot};
use crate::policy::PeerPolicy;
use crate::resolver::WiringResolver;
use crate::source::PackageSource;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};
use trellis_model::{Capability, LoadedClass, ModuleId, Wiring, WiringRef};
use url::Url;

/// External constraint solver seam for dynamic imports
///
/// Called at most once per (module, package): the engine caches the outcome,
/// success or failure. The call may block on the solver's own work.
pub trait DynamicSolver: Send + Sync {
    /// Resolve a dynamic import, returning the providing wiring if any
    fn resolve_dynamic(&self, requester: &ModuleId, package: &str) -> Option<Arc<Wiring>>;
}

/// Per-installed-module state owned by the registry
pub(crate) struct ModuleHost {
    pub wiring: Arc<Wiring>,
    pub resolver: WiringResolver,
    content: RwLock<Vec<Arc<dyn ContentStore>>>,
    loader: RwLock<LoaderSlot>,
    last_loaded: RwLock<Option<LoadedClass>>,
    local_listing: RwLock<Option<Arc<Vec<String>>>>,
}

impl ModuleHost {
    fn new(wiring: Arc<Wiring>, content: Arc<dyn ContentStore>) -> ResolveResult<Self> {
        let resolver = WiringResolver::new(wiring.clone())?;
        Ok(Self {
            wiring,
            resolver,
            content: RwLock::new(vec![content]),
            loader: RwLock::new(LoaderSlot::new()),
            last_loaded: RwLock::new(None),
            local_listing: RwLock::new(None),
        })
    }

    /// Search the content chain (base plus fragments) for a class
    pub fn content_find_class(&self, name: &str) -> Result<Option<LoadedClass>, ContentError> {
        for store in self.content.read().iter() {
            if let Some(class) = store.find_class(name)? {
                return Ok(Some(class));
            }
        }
        Ok(None)
    }

    /// Search the content chain for a single resource
    pub fn content_find_resource(&self, path: &str) -> Result<Option<Url>, ContentError> {
        for store in self.content.read().iter() {
            if let Some(url) = store.find_resource(path)? {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    /// Collect every copy of a resource across the content chain
    pub fn content_find_resources(&self, path: &str) -> Result<Vec<Url>, ContentError> {
        let mut urls = Vec::new();
        for store in self.content.read().iter() {
            urls.extend(store.find_resources(path)?);
        }
        Ok(urls)
    }

    /// List entries across the content chain
    pub fn content_list(&self, path: &str, recurse: bool) -> Result<Vec<String>, ContentError> {
        let mut entries = Vec::new();
        for store in self.content.read().iter() {
            entries.extend(store.list(path, recurse)?);
        }
        Ok(entries)
    }

    /// Full recursive listing of the content chain, cached until a fragment
    /// attaches
    pub fn cached_listing(&self) -> Result<Arc<Vec<String>>, ContentError> {
        if let Some(listing) = self.local_listing.read().as_ref() {
            return Ok(listing.clone());
        }
        let listing = Arc::new(self.content_list("", true)?);
        let mut slot = self.local_listing.write();
        Ok(slot.get_or_insert(listing).clone())
    }

    /// Record the class this module's own loader most recently defined, for
    /// the late-bound import fallback
    pub fn note_loaded(&self, class: &LoadedClass) {
        *self.last_loaded.write() = Some(class.clone());
    }

    /// The last-loaded check: an import miss may still be satisfied by a
    /// class this module's own loader already defined
    pub fn last_loaded_matches(&self, name: &str) -> Option<LoadedClass> {
        self.last_loaded
            .read()
            .as_ref()
            .filter(|class| class.name == name)
            .cloned()
    }

    fn attach_fragment(
        &self,
        capabilities: Vec<Capability>,
        content: Option<Arc<dyn ContentStore>>,
    ) {
        self.wiring.attach_fragment_capabilities(capabilities);
        self.resolver.refresh_exports();
        if let Some(store) = content {
            self.content.write().push(store);
        }
        // The fragment's entries must become visible to listings
        *self.local_listing.write() = None;
    }
}

/// The engine root: installed modules, shared configuration, and the
/// external collaborator seams
pub struct ModuleRegistry {
    pub(crate) config: EngineConfig,
    pub(crate) hooks: HookChain,
    hosts: DashMap<ModuleId, Arc<ModuleHost>>,
    parent: RwLock<Option<Arc<dyn ContentStore>>>,
    peer: RwLock<Option<Arc<dyn PeerPolicy>>>,
    solver: RwLock<Option<Arc<dyn DynamicSolver>>>,
}

impl ModuleRegistry {
    /// Create a registry with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            hooks: HookChain::default(),
            hosts: DashMap::new(),
            parent: RwLock::new(None),
            peer: RwLock::new(None),
            solver: RwLock::new(None),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Install the parent/system provider used by boot delegation and the
    /// legacy fallback tier
    pub fn set_parent_provider(&self, parent: Arc<dyn ContentStore>) {
        *self.parent.write() = Some(parent);
    }

    /// Install the peer policy consulted after all primary tiers fail
    pub fn set_peer_policy(&self, policy: Arc<dyn PeerPolicy>) {
        *self.peer.write() = Some(policy);
    }

    /// Install the external solver used for dynamic imports
    pub fn set_dynamic_solver(&self, solver: Arc<dyn DynamicSolver>) {
        *self.solver.write() = Some(solver);
    }

    /// Append a delegation hook; hooks run in registration order
    pub fn add_hook(&self, hook: Arc<dyn DelegationHook>) {
        self.hooks.add(hook);
    }

    pub(crate) fn parent_provider(&self) -> Option<Arc<dyn ContentStore>> {
        self.parent.read().clone()
    }

    pub(crate) fn peer_policy(&self) -> Option<Arc<dyn PeerPolicy>> {
        self.peer.read().clone()
    }

    pub(crate) fn dynamic_solver(&self) -> Option<Arc<dyn DynamicSolver>> {
        self.solver.read().clone()
    }

    pub(crate) fn host_of(&self, module: &ModuleId) -> Option<Arc<ModuleHost>> {
        self.hosts
            .get(module)
            .map(|entry| entry.clone())
            .filter(|host| !host.wiring.is_stale())
    }

    /// Resolve a wire's provider reference to its live wiring
    ///
    /// `None` means the wire is stale: the referenced wiring was refreshed
    /// away, uninstalled, or superseded by a different revision.
    pub(crate) fn live_wiring(&self, wire_ref: &WiringRef) -> Option<Arc<Wiring>> {
        self.host_of(&wire_ref.module)
            .map(|host| host.wiring.clone())
            .filter(|wiring| wiring.revision() == wire_ref.revision)
    }

    fn require_host(&self, module: &ModuleId) -> ResolveResult<Arc<ModuleHost>> {
        self.host_of(module).ok_or_else(|| ResolveError::NotInstalled {
            module: module.clone(),
        })
    }

    /// Install a resolved module
    ///
    /// Validates every requirement filter up front; malformed requirements
    /// surface here, never at lookup time. Reinstalling a module id marks
    /// the previous wiring stale first.
    pub fn install(
        &self,
        wiring: Arc<Wiring>,
        content: Arc<dyn ContentStore>,
    ) -> ResolveResult<()> {
        let module = wiring.module().clone();
        let host = Arc::new(ModuleHost::new(wiring, content)?);
        if let Some(previous) = self.hosts.insert(module.clone(), host) {
            previous.wiring.mark_stale();
        }
        info!(module = %module, "module installed");
        Ok(())
    }

    /// Invalidate a module's wiring after a refresh
    ///
    /// Marks the wiring stale (dependents' wires observe this as a stale
    /// provider), marks a published loader stale, and drops the host with
    /// all its caches. The solver re-installs the new wiring afterwards.
    pub fn on_refresh(&self, module: &ModuleId) {
        if let Some((_, host)) = self.hosts.remove(module) {
            host.wiring.mark_stale();
            if let Some(loader) = host.loader.read().published() {
                loader.mark_stale();
            }
            debug!(module = %module, "wiring refreshed; caches invalidated");
        }
    }

    /// Uninstall a module, closing its loader
    pub fn uninstall(&self, module: &ModuleId) {
        if let Some((_, host)) = self.hosts.remove(module) {
            host.wiring.mark_stale();
            if let Some(loader) = host.loader.read().published() {
                loader.close();
            }
            info!(module = %module, "module uninstalled");
        }
    }

    /// Attach a fragment's capabilities (and optionally its content) to a
    /// host module
    pub fn attach_fragment(
        &self,
        module: &ModuleId,
        capabilities: Vec<Capability>,
        content: Option<Arc<dyn ContentStore>>,
    ) -> ResolveResult<()> {
        let host = self.require_host(module)?;
        host.attach_fragment(capabilities, content);
        debug!(module = %module, "fragment attached");
        Ok(())
    }

    // ===== Lookup API =====

    /// Strict class lookup: distinguishes not-found from activation faults
    pub fn find_class(
        &self,
        module: &ModuleId,
        request: LookupRequest<'_>,
    ) -> ResolveResult<LoadedClass> {
        let host = self.require_host(module)?;
        Delegation {
            registry: self,
            host: &host,
        }
        .find_class(&request)
    }

    /// Non-throwing class lookup: absent on any failure
    pub fn try_find_class(&self, module: &ModuleId, name: &str) -> Option<LoadedClass> {
        self.find_class(module, LookupRequest::new(name)).ok()
    }

    /// Locate a single resource; `Ok(None)` on absence
    pub fn find_resource(
        &self,
        module: &ModuleId,
        request: LookupRequest<'_>,
    ) -> ResolveResult<Option<Url>> {
        let host = self.require_host(module)?;
        Delegation {
            registry: self,
            host: &host,
        }
        .find_resource(&request)
    }

    /// Enumerate every reachable copy of a resource, duplicate-suppressed
    pub fn find_resources(
        &self,
        module: &ModuleId,
        request: LookupRequest<'_>,
    ) -> ResolveResult<Vec<Url>> {
        let host = self.require_host(module)?;
        Delegation {
            registry: self,
            host: &host,
        }
        .find_resources(&request)
    }

    /// List entry paths under a directory, filtered by a glob pattern
    pub fn list_resources(
        &self,
        module: &ModuleId,
        path: &str,
        pattern: &str,
        options: ListOptions,
    ) -> ResolveResult<BTreeSet<String>> {
        let host = self.require_host(module)?;
        Delegation {
            registry: self,
            host: &host,
        }
        .list_resources(path, pattern, options)
    }

    /// The cached package source a module sees for a package
    ///
    /// Import sources take precedence over required-module sources, mirroring
    /// delegation order. Repeated calls return the identical cached object.
    pub fn package_source(
        &self,
        module: &ModuleId,
        package: &str,
    ) -> ResolveResult<Arc<PackageSource>> {
        let host = self.require_host(module)?;
        if let Some(source) = host.resolver.imported_source(package, self) {
            return Ok(source);
        }
        Ok(host.resolver.required_source(package, self))
    }

    // ===== Loader lifecycle =====

    /// Retrieve the module's loader, constructing it on first use
    ///
    /// All concurrent first callers observe the same published handle; the
    /// loader-created hooks fire exactly once, against that handle.
    pub fn get_loader(&self, module: &ModuleId) -> ResolveResult<Arc<LoaderHandle>> {
        let host = self.require_host(module)?;
        let slot = host.loader.read();
        slot.get_or_publish(module, host.wiring.revision(), &self.hooks)
    }

    /// Close the module's loader and release its resources
    pub fn close(&self, module: &ModuleId) -> ResolveResult<()> {
        let host = self.require_host(module)?;
        if let Some(loader) = host.loader.read().published() {
            loader.close();
        }
        Ok(())
    }

    /// Installed module count
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether no modules are installed
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContent;
    use semver::Version;
    use trellis_model::WiringBuilder;

    fn mid(name: &str) -> ModuleId {
        ModuleId::new(name, Version::new(1, 0, 0))
    }

    fn install_empty(registry: &ModuleRegistry, name: &str) -> ModuleId {
        let module = mid(name);
        let wiring = WiringBuilder::new(module.clone()).build().unwrap();
        let content = Arc::new(MemoryContent::new(module.clone()));
        registry.install(wiring, content).unwrap();
        module
    }

    #[test]
    fn test_install_and_lookup_unknown() {
        let registry = ModuleRegistry::new(EngineConfig::default());
        assert!(registry.is_empty());

        let module = install_empty(&registry, "a");
        assert_eq!(registry.len(), 1);

        let unknown = mid("ghost");
        assert!(matches!(
            registry.find_class(&unknown, LookupRequest::new("com.ghost.X")),
            Err(ResolveError::NotInstalled { .. })
        ));
        assert!(registry.try_find_class(&module, "com.a.Missing").is_none());
    }

    #[test]
    fn test_uninstall_closes_loader() {
        let registry = ModuleRegistry::new(EngineConfig::default());
        let module = install_empty(&registry, "a");

        let loader = registry.get_loader(&module).unwrap();
        registry.uninstall(&module);

        assert!(loader.is_closed());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reinstall_marks_previous_stale() {
        let registry = ModuleRegistry::new(EngineConfig::default());
        let module = mid("a");
        let first = WiringBuilder::new(module.clone()).build().unwrap();
        let content = Arc::new(MemoryContent::new(module.clone()));
        registry.install(first.clone(), content.clone()).unwrap();

        let second = WiringBuilder::new(module.clone()).revision(1).build().unwrap();
        registry.install(second.clone(), content).unwrap();

        assert!(first.is_stale());
        assert!(!second.is_stale());
    }
}
