//! Import/export resolver
//!
//! Per-wiring component that lazily computes and caches the exported-package
//! index, the static import map, the required-module package sources, and the
//! dynamic-import pattern table. All caches are owned by this resolver and
//! written only by lookups against its own module; other modules' wirings are
//! only ever read during contribution.

use crate::error::ResolveResult;
use crate::registry::ModuleRegistry;
use crate::source::{PackageSource, SingleSource};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};
use trellis_model::{ModuleId, Resolution, Wiring};

/// Parsed dynamic-import pattern table
#[derive(Debug, Default)]
pub struct DynamicPatterns {
    /// A `*` declaration matches every package
    pub wildcard_all: bool,

    /// Exact package names
    pub names: Vec<String>,

    /// Prefix stems from `stem.*` declarations
    pub prefixes: Vec<String>,
}

impl DynamicPatterns {
    fn from_wiring(wiring: &Wiring) -> Self {
        let mut patterns = DynamicPatterns::default();
        for requirement in wiring.dynamic_requirements() {
            debug_assert_eq!(requirement.resolution, Resolution::Dynamic);
            let package = requirement.filter.package.as_str();
            if package == "*" {
                patterns.wildcard_all = true;
            } else if let Some(stem) = package.strip_suffix(".*") {
                patterns.prefixes.push(stem.to_string());
            } else {
                patterns.names.push(package.to_string());
            }
        }
        patterns
    }

    /// Whether a package matches any declared dynamic pattern
    pub fn matches(&self, package: &str) -> bool {
        if self.wildcard_all {
            return true;
        }
        self.names.iter().any(|name| name == package)
            || self.prefixes.iter().any(|stem| {
                package == stem
                    || package
                        .strip_prefix(stem.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    }

    /// Whether any pattern was declared at all
    pub fn is_empty(&self) -> bool {
        !self.wildcard_all && self.names.is_empty() && self.prefixes.is_empty()
    }
}

/// Recursive re-export contribution over the RequireModule graph
///
/// The visited set is per top-level resolution call, which bounds the walk to
/// O(reachable modules) on any cyclic graph: each module contributes at most
/// once per call. The module's own export is appended last so direct
/// providers of re-exported packages precede it in merge order.
pub(crate) fn contribute(
    wiring: &Wiring,
    package: &str,
    registry: &ModuleRegistry,
    visited: &mut FxHashSet<ModuleId>,
    out: &mut Vec<SingleSource>,
) {
    if !visited.insert(wiring.module().clone()) {
        return;
    }

    let local = wiring
        .export_capability_for(package)
        .map(|capability| SingleSource {
            module: wiring.module().clone(),
            capability,
        });

    for wire in wiring.require_wires() {
        if wire.requirement().reexport || local.is_some() {
            match registry.live_wiring(wire.provider()) {
                Some(provider) => contribute(&provider, package, registry, visited, out),
                None => trace!(
                    module = %wiring.module(),
                    provider = %wire.provider(),
                    package,
                    "skipping stale require wire during contribution"
                ),
            }
        }
    }

    if let Some(local) = local {
        out.push(local);
    }
}

/// Merged package source as seen by a dependent of this wiring
pub(crate) fn contributed_source(
    wiring: &Wiring,
    package: &str,
    registry: &ModuleRegistry,
) -> PackageSource {
    let mut visited = FxHashSet::default();
    let mut out = Vec::new();
    contribute(wiring, package, registry, &mut visited, &mut out);
    PackageSource::merge(package, out)
}

/// Per-wiring lazy resolution caches
pub struct WiringResolver {
    wiring: Arc<Wiring>,
    exported_index: RwLock<FxHashSet<String>>,
    imports: OnceCell<FxHashMap<String, Arc<PackageSource>>>,
    dynamic_overlay: RwLock<FxHashMap<String, Arc<PackageSource>>>,
    dynamic_resolve_lock: Mutex<()>,
    required: RwLock<FxHashMap<String, Arc<PackageSource>>>,
    patterns: OnceCell<DynamicPatterns>,
    stale_warned: AtomicBool,
}

impl WiringResolver {
    /// Build a resolver for a wiring, validating every requirement filter
    ///
    /// Malformed filters are a construction-time fault; they are never
    /// discovered lazily at lookup time.
    pub fn new(wiring: Arc<Wiring>) -> ResolveResult<Self> {
        for wire in wiring.import_wires().iter().chain(wiring.require_wires()) {
            wire.requirement().validate()?;
        }
        for requirement in wiring.dynamic_requirements() {
            requirement.validate()?;
        }

        let exported_index = wiring
            .exported_capabilities()
            .into_iter()
            .map(|capability| capability.package)
            .collect();

        Ok(Self {
            wiring,
            exported_index: RwLock::new(exported_index),
            imports: OnceCell::new(),
            dynamic_overlay: RwLock::new(FxHashMap::default()),
            dynamic_resolve_lock: Mutex::new(()),
            required: RwLock::new(FxHashMap::default()),
            patterns: OnceCell::new(),
            stale_warned: AtomicBool::new(false),
        })
    }

    /// The wiring this resolver serves
    pub fn wiring(&self) -> &Arc<Wiring> {
        &self.wiring
    }

    /// Package names this module exports
    pub fn exported_packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = self.exported_index.read().iter().cloned().collect();
        packages.sort_unstable();
        packages
    }

    /// Whether this module locally exports a package
    pub fn exports_package(&self, package: &str) -> bool {
        self.exported_index.read().contains(package)
    }

    /// Re-derive the exported-package index after fragment attachment
    ///
    /// Re-union over the grown capability list; cached package sources for
    /// unrelated packages are left untouched.
    pub fn refresh_exports(&self) {
        let mut index = self.exported_index.write();
        for capability in self.wiring.exported_capabilities() {
            index.insert(capability.package);
        }
    }

    /// Statically imported source for a package, if an import wire (or a
    /// cached dynamic resolution) covers it
    ///
    /// The static map is computed once; concurrent first callers block on the
    /// single winner's computation and all observe the same finished map.
    pub fn imported_source(
        &self,
        package: &str,
        registry: &ModuleRegistry,
    ) -> Option<Arc<PackageSource>> {
        let statics = self.imports.get_or_init(|| self.compute_imports(registry));
        if let Some(source) = statics.get(package) {
            return Some(source.clone());
        }
        self.dynamic_overlay.read().get(package).cloned()
    }

    fn compute_imports(&self, registry: &ModuleRegistry) -> FxHashMap<String, Arc<PackageSource>> {
        let mut map: FxHashMap<String, Arc<PackageSource>> = FxHashMap::default();
        for wire in self.wiring.import_wires() {
            let package = wire.requirement().filter.package.clone();
            let Some(provider) = registry.live_wiring(wire.provider()) else {
                self.warn_stale(&wire.provider().to_string());
                continue;
            };

            // The provider may itself aggregate re-exports, in which case
            // the import sees its merged view rather than a bare Single.
            let source = contributed_source(&provider, &package, registry);
            if source.is_null() {
                // Solver contract violation: the wire points at a provider
                // that supplies nothing for the package.
                warn!(
                    module = %self.wiring.module(),
                    provider = %provider.module(),
                    package,
                    "import wire provider supplies nothing for package"
                );
                continue;
            }
            map.entry(package).or_insert_with(|| Arc::new(source));
        }
        map
    }

    /// Required-module source for a package, memoized per package
    ///
    /// Includes the `Null` sentinel: a definitively failed computation is
    /// cached and not repeated.
    pub fn required_source(&self, package: &str, registry: &ModuleRegistry) -> Arc<PackageSource> {
        if let Some(source) = self.required.read().get(package) {
            return source.clone();
        }

        let mut visited = FxHashSet::default();
        let mut out = Vec::new();
        for wire in self.wiring.require_wires() {
            match registry.live_wiring(wire.provider()) {
                Some(provider) => contribute(&provider, package, registry, &mut visited, &mut out),
                None => self.warn_stale(&wire.provider().to_string()),
            }
        }
        let source = Arc::new(PackageSource::merge(package, out));

        // First writer wins so every caller observes the identical object
        self.required
            .write()
            .entry(package.to_string())
            .or_insert(source)
            .clone()
    }

    /// Dynamic-import pattern table, parsed once
    pub fn dynamic_patterns(&self) -> &DynamicPatterns {
        self.patterns
            .get_or_init(|| DynamicPatterns::from_wiring(&self.wiring))
    }

    /// Cached result of an earlier dynamic resolution for a package
    pub fn dynamic_cached(&self, package: &str) -> Option<Arc<PackageSource>> {
        self.dynamic_overlay.read().get(package).cloned()
    }

    /// Cache a dynamic resolution result (success or `Null`), returning the
    /// stored object
    pub fn cache_dynamic(&self, package: &str, source: Arc<PackageSource>) -> Arc<PackageSource> {
        self.dynamic_overlay
            .write()
            .entry(package.to_string())
            .or_insert(source)
            .clone()
    }

    /// Serializes dynamic re-resolution so the external solver is called at
    /// most once per package
    pub(crate) fn dynamic_resolve_guard(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.dynamic_resolve_lock.lock()
    }

    /// Warn about a stale provider, once per loader lifetime
    pub(crate) fn warn_stale(&self, context: &str) {
        if !self.stale_warned.swap(true, Ordering::AcqRel) {
            warn!(
                module = %self.wiring.module(),
                context,
                "stale provider wiring encountered; treating as not found"
            );
        }
    }
}
