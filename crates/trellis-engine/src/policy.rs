//! Peer policy
//!
//! An explicitly configured secondary search scope, consulted only after
//! every primary delegation tier has failed. Off unless a policy is
//! installed and enabled in the engine configuration.

use trellis_model::{LoadedClass, ModuleId};
use url::Url;

/// Secondary search scope for symbols no primary tier could supply
pub trait PeerPolicy: Send + Sync {
    /// Look up a class among the configured peers
    fn find_class(&self, requester: &ModuleId, name: &str) -> Option<LoadedClass>;

    /// Look up a resource among the configured peers
    fn find_resource(&self, requester: &ModuleId, path: &str) -> Option<Url>;

    /// Enumerate resource copies among the configured peers
    fn find_resources(&self, requester: &ModuleId, path: &str) -> Vec<Url>;
}
