//! Lazy loader lifecycle
//!
//! The per-module loading context is expensive to build, so candidates are
//! constructed optimistically outside any lock; only publication is
//! serialized. Exactly one candidate is ever published per wiring, the
//! loader-created hooks observe exactly that candidate, and post-publication
//! reads are lock-free.

use crate::error::{ResolveError, ResolveResult};
use crate::hooks::HookChain;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use trellis_model::ModuleId;

/// The per-module loading context
///
/// Opaque to the engine beyond identity and lifecycle: the content store
/// does the actual byte work.
#[derive(Debug)]
pub struct LoaderHandle {
    module: ModuleId,
    revision: u64,
    closed: AtomicBool,
    stale: AtomicBool,
}

impl LoaderHandle {
    fn new(module: ModuleId, revision: u64) -> Self {
        Self {
            module,
            revision,
            closed: AtomicBool::new(false),
            stale: AtomicBool::new(false),
        }
    }

    /// Module this loader serves
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Wiring revision this loader was built for
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Tear the loader down; idempotent
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(module = %self.module, "loader closed");
        }
    }

    /// Whether the loader has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the loader as belonging to a superseded wiring
    pub(crate) fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Whether the owning wiring has been refreshed away
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }
}

/// Publish-once slot for a wiring's loader
pub(crate) struct LoaderSlot {
    published: OnceCell<Arc<LoaderHandle>>,
    publish_lock: Mutex<()>,
}

impl LoaderSlot {
    pub fn new() -> Self {
        Self {
            published: OnceCell::new(),
            publish_lock: Mutex::new(()),
        }
    }

    /// The published loader, if any
    pub fn published(&self) -> Option<&Arc<LoaderHandle>> {
        self.published.get()
    }

    /// Retrieve the published loader, constructing and publishing one if
    /// this is the first use
    ///
    /// The critical section covers check-if-published, hook invocation, and
    /// publish; candidate construction stays outside it. A hook veto leaves
    /// the slot empty so a later call may attempt construction again.
    pub fn get_or_publish(
        &self,
        module: &ModuleId,
        revision: u64,
        hooks: &HookChain,
    ) -> ResolveResult<Arc<LoaderHandle>> {
        if let Some(handle) = self.published.get() {
            return Ok(handle.clone());
        }

        let candidate = Arc::new(LoaderHandle::new(module.clone(), revision));

        let _guard = self.publish_lock.lock();
        if let Some(handle) = self.published.get() {
            // Lost the race; the candidate is discarded without any hook
            // ever observing it.
            return Ok(handle.clone());
        }

        hooks
            .loader_created(&candidate)
            .map_err(|reason| ResolveError::ConstructionVetoed {
                module: module.clone(),
                reason,
            })?;

        let _ = self.published.set(candidate.clone());
        debug!(module = %module, revision, "loader published");
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn mid() -> ModuleId {
        ModuleId::new("m", Version::new(1, 0, 0))
    }

    #[test]
    fn test_same_handle_returned() {
        let slot = LoaderSlot::new();
        let hooks = HookChain::default();
        let first = slot.get_or_publish(&mid(), 0, &hooks).unwrap();
        let second = slot.get_or_publish(&mid(), 0, &hooks).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_close_idempotent() {
        let slot = LoaderSlot::new();
        let hooks = HookChain::default();
        let handle = slot.get_or_publish(&mid(), 0, &hooks).unwrap();
        assert!(!handle.is_closed());
        handle.close();
        handle.close();
        assert!(handle.is_closed());
    }
}
