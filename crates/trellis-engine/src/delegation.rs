//! Delegation engine
//!
//! The precedence chain evaluated fresh per lookup. Class and single-resource
//! lookups short-circuit on first success; resource enumeration accumulates
//! across tiers. An explicit import is a hard commitment to its provider: a
//! miss there fails the lookup outright, whereas a required-module miss falls
//! through to the module's own content.

use crate::content::ContentError;
use crate::error::{ResolveError, ResolveResult};
use crate::registry::{ModuleHost, ModuleRegistry};
use crate::resolver::contributed_source;
use crate::source::PackageSource;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};
use trellis_model::{package_of, package_of_path, LoadedClass, ModuleId};
use url::Url;

/// One symbol lookup, as issued by a caller
///
/// `engine_origin` records whether the request came through the module's own
/// loading machinery; callers know their own origin, the engine never
/// inspects a call stack for it. The legacy parent fallback tier only
/// applies to outside-originated requests.
#[derive(Debug, Clone, Copy)]
pub struct LookupRequest<'a> {
    /// Class name or resource path being looked up
    pub name: &'a str,

    /// Whether the request originated in the module's own loading machinery
    pub engine_origin: bool,
}

impl<'a> LookupRequest<'a> {
    /// A lookup issued through the module's own loading machinery
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            engine_origin: true,
        }
    }

    /// A lookup issued by an outside caller
    pub fn from_outside(name: &'a str) -> Self {
        Self {
            name,
            engine_origin: false,
        }
    }
}

/// Options for resource listing
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Only list the module's own content, ignoring wired providers
    pub local_only: bool,

    /// Descend into subdirectories
    pub recurse: bool,
}

/// Stateless per-lookup view over one module's resolver and wiring
pub(crate) struct Delegation<'a> {
    pub registry: &'a ModuleRegistry,
    pub host: &'a ModuleHost,
}

impl Delegation<'_> {
    fn module(&self) -> &ModuleId {
        self.host.wiring.module()
    }

    fn not_found(&self, name: &str) -> ResolveError {
        ResolveError::NotFound {
            module: self.module().clone(),
            name: name.to_string(),
        }
    }

    fn activation(&self, module: &ModuleId, error: ContentError) -> ResolveError {
        ResolveError::ActivationFailure {
            module: module.clone(),
            detail: error.to_string(),
        }
    }

    // ===== Class lookup =====

    pub fn find_class(&self, request: &LookupRequest<'_>) -> ResolveResult<LoadedClass> {
        let name = request.name;
        let package = package_of(name);

        // Tier 1: boot delegation terminates immediately, hit or miss
        if self.registry.config.boot_delegates(package) {
            trace!(module = %self.module(), name, "boot delegation");
            return match self.parent_find_class(name)? {
                Some(class) => Ok(class),
                None => Err(self.not_found(name)),
            };
        }

        // Tier 2: pre-hooks
        if let Some(class) = self.registry.hooks.pre_find_class(self.module(), name) {
            return Ok(class);
        }

        // Tier 3: statically imported source is a hard commitment
        if let Some(source) = self.host.resolver.imported_source(package, self.registry) {
            if !source.is_null() {
                if let Some(class) = self.class_from_source(&source, name)? {
                    return Ok(class);
                }
                // The late-bound check: a class this module's own loader
                // already defined stays resolvable across an import miss.
                if let Some(class) = self.host.last_loaded_matches(name) {
                    return Ok(class);
                }
            }
            trace!(module = %self.module(), name, "import source miss, failing lookup");
            return Err(self.not_found(name));
        }

        // Tier 4: required-module source; a miss here falls through
        let required = self.host.resolver.required_source(package, self.registry);
        let had_required = !required.is_null();
        if had_required {
            if let Some(class) = self.class_from_source(&required, name)? {
                return Ok(class);
            }
        }

        // Tier 5: local definitions
        if let Some(class) = self.local_find_class(name)? {
            self.host.note_loaded(&class);
            return Ok(class);
        }

        // Tier 6: dynamic import, only without an existing required source
        if !had_required && self.host.resolver.dynamic_patterns().matches(package) {
            return self.dynamic_import_class(package, name);
        }

        // Tier 7: post-hooks
        if let Some(class) = self.registry.hooks.post_find_class(self.module(), name) {
            return Ok(class);
        }

        // Tier 8: peer policy
        if self.registry.config.peer_policy_enabled {
            if let Some(peer) = self.registry.peer_policy() {
                if let Some(class) = peer.find_class(self.module(), name) {
                    return Ok(class);
                }
            }
        }

        // Tier 9: legacy parent fallback, outside-originated requests only
        if self.registry.config.legacy_parent_fallback && !request.engine_origin {
            if let Some(class) = self.parent_find_class(name)? {
                return Ok(class);
            }
        }

        Err(self.not_found(name))
    }

    fn parent_find_class(&self, name: &str) -> ResolveResult<Option<LoadedClass>> {
        match self.registry.parent_provider() {
            Some(parent) => parent
                .find_class(name)
                .map_err(|e| self.activation(self.module(), e)),
            None => Ok(None),
        }
    }

    fn local_find_class(&self, name: &str) -> ResolveResult<Option<LoadedClass>> {
        self.host
            .content_find_class(name)
            .map_err(|e| self.activation(self.module(), e))
    }

    /// Delegate to a source's providers in order, searching each provider's
    /// own content
    fn class_from_source(
        &self,
        source: &PackageSource,
        name: &str,
    ) -> ResolveResult<Option<LoadedClass>> {
        for single in source.providers() {
            let Some(provider) = self.registry.host_of(&single.module) else {
                self.host.resolver.warn_stale(&single.module.to_string());
                continue;
            };
            if let Some(class) = provider
                .content_find_class(name)
                .map_err(|e| self.activation(&single.module, e))?
            {
                return Ok(Some(class));
            }
        }
        Ok(None)
    }

    /// One-shot dynamic resolution: the first lookup of a matching package
    /// calls the external solver exactly once; the result, success or
    /// failure, is cached and terminates the lookup either way.
    fn dynamic_import_class(&self, package: &str, name: &str) -> ResolveResult<LoadedClass> {
        let source = self.dynamic_source(package);
        if source.is_null() {
            return Err(self.not_found(name));
        }
        match self.class_from_source(&source, name)? {
            Some(class) => Ok(class),
            None => Err(self.not_found(name)),
        }
    }

    fn dynamic_source(&self, package: &str) -> Arc<PackageSource> {
        if let Some(source) = self.host.resolver.dynamic_cached(package) {
            return source;
        }

        // Serialized so concurrent first lookups trigger one solver call
        let _guard = self.host.resolver.dynamic_resolve_guard();
        if let Some(source) = self.host.resolver.dynamic_cached(package) {
            return source;
        }

        debug!(module = %self.module(), package, "dynamic import re-resolution");
        let resolved = self
            .registry
            .dynamic_solver()
            .and_then(|solver| solver.resolve_dynamic(self.module(), package));
        let source = match resolved {
            Some(wiring) if !wiring.is_stale() => contributed_source(&wiring, package, self.registry),
            _ => PackageSource::null(package),
        };
        self.host.resolver.cache_dynamic(package, Arc::new(source))
    }

    // ===== Single resource lookup =====

    pub fn find_resource(&self, request: &LookupRequest<'_>) -> ResolveResult<Option<Url>> {
        let path = request.name;
        let package = package_of_path(path);

        if self.registry.config.boot_delegates(&package) {
            return self.parent_find_resource(path);
        }

        if let Some(url) = self.registry.hooks.pre_find_resource(self.module(), path) {
            return Ok(Some(url));
        }

        if let Some(source) = self.host.resolver.imported_source(&package, self.registry) {
            if !source.is_null() {
                if let Some(url) = self.resource_from_source(&source, path)? {
                    return Ok(Some(url));
                }
            }
            return Ok(None);
        }

        let required = self.host.resolver.required_source(&package, self.registry);
        let had_required = !required.is_null();
        if had_required {
            if let Some(url) = self.resource_from_source(&required, path)? {
                return Ok(Some(url));
            }
        }

        if let Some(url) = self
            .host
            .content_find_resource(path)
            .map_err(|e| self.activation(self.module(), e))?
        {
            return Ok(Some(url));
        }

        if !had_required && self.host.resolver.dynamic_patterns().matches(&package) {
            let source = self.dynamic_source(&package);
            return self.resource_from_source(&source, path);
        }

        if let Some(url) = self.registry.hooks.post_find_resource(self.module(), path) {
            return Ok(Some(url));
        }

        if self.registry.config.peer_policy_enabled {
            if let Some(peer) = self.registry.peer_policy() {
                if let Some(url) = peer.find_resource(self.module(), path) {
                    return Ok(Some(url));
                }
            }
        }

        if self.registry.config.legacy_parent_fallback && !request.engine_origin {
            if let Some(url) = self.parent_find_resource(path)? {
                return Ok(Some(url));
            }
        }

        Ok(None)
    }

    fn parent_find_resource(&self, path: &str) -> ResolveResult<Option<Url>> {
        match self.registry.parent_provider() {
            Some(parent) => parent
                .find_resource(path)
                .map_err(|e| self.activation(self.module(), e)),
            None => Ok(None),
        }
    }

    fn resource_from_source(
        &self,
        source: &PackageSource,
        path: &str,
    ) -> ResolveResult<Option<Url>> {
        for single in source.providers() {
            let Some(provider) = self.registry.host_of(&single.module) else {
                self.host.resolver.warn_stale(&single.module.to_string());
                continue;
            };
            if let Some(url) = provider
                .content_find_resource(path)
                .map_err(|e| self.activation(&single.module, e))?
            {
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    // ===== Resource enumeration =====

    /// Accumulating variant: tiers append instead of short-circuiting, with
    /// order-preserving duplicate suppression. Only boot delegation, the
    /// pre-hook, and the legacy fallback keep their early-return semantics.
    pub fn find_resources(&self, request: &LookupRequest<'_>) -> ResolveResult<Vec<Url>> {
        let path = request.name;
        let package = package_of_path(path);

        if self.registry.config.boot_delegates(&package) {
            return match self.registry.parent_provider() {
                Some(parent) => parent
                    .find_resources(path)
                    .map_err(|e| self.activation(self.module(), e)),
                None => Ok(Vec::new()),
            };
        }

        if let Some(urls) = self.registry.hooks.pre_find_resources(self.module(), path) {
            return Ok(urls);
        }

        fn push(accumulated: &mut Vec<Url>, seen: &mut FxHashSet<String>, url: Url) {
            if seen.insert(url.as_str().to_string()) {
                accumulated.push(url);
            }
        }

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut accumulated: Vec<Url> = Vec::new();

        let imported = self.host.resolver.imported_source(&package, self.registry);
        if let Some(source) = &imported {
            for url in self.resources_from_source(source, path)? {
                push(&mut accumulated, &mut seen, url);
            }
        }

        let mut had_required = false;
        if imported.is_none() {
            let required = self.host.resolver.required_source(&package, self.registry);
            had_required = !required.is_null();
            for url in self.resources_from_source(&required, path)? {
                push(&mut accumulated, &mut seen, url);
            }
        }

        for url in self
            .host
            .content_find_resources(path)
            .map_err(|e| self.activation(self.module(), e))?
        {
            push(&mut accumulated, &mut seen, url);
        }

        if imported.is_none()
            && !had_required
            && self.host.resolver.dynamic_patterns().matches(&package)
        {
            let source = self.dynamic_source(&package);
            for url in self.resources_from_source(&source, path)? {
                push(&mut accumulated, &mut seen, url);
            }
        }

        if let Some(urls) = self.registry.hooks.post_find_resources(self.module(), path) {
            for url in urls {
                push(&mut accumulated, &mut seen, url);
            }
        }

        if self.registry.config.peer_policy_enabled {
            if let Some(peer) = self.registry.peer_policy() {
                for url in peer.find_resources(self.module(), path) {
                    push(&mut accumulated, &mut seen, url);
                }
            }
        }

        if self.registry.config.legacy_parent_fallback && !request.engine_origin {
            if let Some(parent) = self.registry.parent_provider() {
                for url in parent
                    .find_resources(path)
                    .map_err(|e| self.activation(self.module(), e))?
                {
                    push(&mut accumulated, &mut seen, url);
                }
            }
        }

        Ok(accumulated)
    }

    fn resources_from_source(
        &self,
        source: &PackageSource,
        path: &str,
    ) -> ResolveResult<Vec<Url>> {
        let mut urls = Vec::new();
        for single in source.providers() {
            let Some(provider) = self.registry.host_of(&single.module) else {
                self.host.resolver.warn_stale(&single.module.to_string());
                continue;
            };
            urls.extend(
                provider
                    .content_find_resources(path)
                    .map_err(|e| self.activation(&single.module, e))?,
            );
        }
        Ok(urls)
    }

    // ===== Resource listing =====

    /// List entry paths under a directory, filtered by a glob pattern
    /// matched against the entry's final path segment. Listing never fails
    /// on absence; an empty set means nothing matched.
    pub fn list_resources(
        &self,
        path: &str,
        pattern: &str,
        options: ListOptions,
    ) -> ResolveResult<BTreeSet<String>> {
        let pattern = glob::Pattern::new(pattern).map_err(|_| ResolveError::InvalidPattern {
            pattern: pattern.to_string(),
        })?;
        let dir = path.trim_matches('/');

        let mut names = BTreeSet::new();
        let listing = self
            .host
            .cached_listing()
            .map_err(|e| self.activation(self.module(), e))?;
        for entry in listing.iter() {
            if Self::entry_selected(entry, dir, options.recurse, &pattern) {
                names.insert(entry.clone());
            }
        }

        if !options.local_only {
            let package = if dir.is_empty() {
                String::new()
            } else {
                dir.replace('/', ".")
            };
            let source = match self.host.resolver.imported_source(&package, self.registry) {
                Some(source) => Some(source),
                None => {
                    let required = self.host.resolver.required_source(&package, self.registry);
                    (!required.is_null()).then_some(required)
                }
            };
            if let Some(source) = source {
                for single in source.providers() {
                    let Some(provider) = self.registry.host_of(&single.module) else {
                        continue;
                    };
                    for entry in provider
                        .content_list(dir, options.recurse)
                        .map_err(|e| self.activation(&single.module, e))?
                    {
                        if Self::entry_selected(&entry, dir, options.recurse, &pattern) {
                            names.insert(entry);
                        }
                    }
                }
            }
        }

        Ok(names)
    }

    fn entry_selected(entry: &str, dir: &str, recurse: bool, pattern: &glob::Pattern) -> bool {
        let rest = if dir.is_empty() {
            Some(entry)
        } else {
            entry
                .strip_prefix(dir)
                .and_then(|rest| rest.strip_prefix('/'))
        };
        let Some(rest) = rest else {
            return false;
        };
        if !recurse && rest.contains('/') {
            return false;
        }
        let file_name = rest.rsplit('/').next().unwrap_or(rest);
        pattern.matches(file_name)
    }
}
