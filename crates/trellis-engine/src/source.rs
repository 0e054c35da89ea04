//! Package sources
//!
//! A package source answers "where do classes and resources of package P
//! come from": one concrete module, an ordered merge of several, or a cached
//! sentinel meaning resolution was attempted and definitively failed.

use rustc_hash::FxHashSet;
use trellis_model::{Capability, ModuleId};

/// One concrete provider of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSource {
    /// Providing module
    pub module: ModuleId,

    /// The exported capability satisfying the package
    pub capability: Capability,
}

/// Where a package's content actually comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// One concrete provider
    Single(SingleSource),

    /// Order-preserving merge of several providers
    Multi {
        /// Package all sources provide
        package: String,
        /// Deduplicated providers, in contribution order
        sources: Vec<SingleSource>,
    },

    /// Resolution was attempted and definitively failed
    Null {
        /// Package that resolved to nowhere
        package: String,
    },
}

impl PackageSource {
    /// The definitive negative for a package
    pub fn null(package: impl Into<String>) -> Self {
        PackageSource::Null {
            package: package.into(),
        }
    }

    /// Merge contributed singles into a source
    ///
    /// Deduplicates by providing module, preserving first-seen order, then
    /// collapses to `Single`, `Multi`, or `Null` by cardinality.
    pub fn merge(package: &str, contributed: Vec<SingleSource>) -> Self {
        let mut seen: FxHashSet<ModuleId> = FxHashSet::default();
        let mut sources: Vec<SingleSource> = Vec::new();
        for single in contributed {
            if seen.insert(single.module.clone()) {
                sources.push(single);
            }
        }

        match sources.len() {
            0 => PackageSource::null(package),
            1 => PackageSource::Single(sources.into_iter().next().unwrap()),
            _ => PackageSource::Multi {
                package: package.to_string(),
                sources,
            },
        }
    }

    /// Package this source answers for
    pub fn package(&self) -> &str {
        match self {
            PackageSource::Single(single) => &single.capability.package,
            PackageSource::Multi { package, .. } => package,
            PackageSource::Null { package } => package,
        }
    }

    /// Whether this is the cached negative sentinel
    pub fn is_null(&self) -> bool {
        matches!(self, PackageSource::Null { .. })
    }

    /// Providers in delegation order; empty for `Null`
    pub fn providers(&self) -> &[SingleSource] {
        match self {
            PackageSource::Single(single) => std::slice::from_ref(single),
            PackageSource::Multi { sources, .. } => sources,
            PackageSource::Null { .. } => &[],
        }
    }
}
