//! Integration tests for re-export contribution over the module graph
//!
//! Covers cycle termination, merge determinism across required-module paths,
//! re-export chain depth, and the re-export visibility rules.

mod common;

use common::*;
use trellis_engine::{LookupRequest, PackageSource};
use trellis_model::{WiringBuilder, WiringRef};

#[test]
fn test_mutual_cycle_terminates_and_unions_exports() {
    // a and b require each other with re-export; contribution must visit
    // each module once and surface both modules' own exports.
    let registry = registry();
    let a = WiringBuilder::new(mid("a"))
        .export(cap("com.shared"))
        .require(reexport("b"), WiringRef::new(mid("b"), 0))
        .build()
        .unwrap();
    let b = WiringBuilder::new(mid("b"))
        .export(cap("com.shared"))
        .require(reexport("a"), WiringRef::new(mid("a"), 0))
        .build()
        .unwrap();
    install_with(&registry, a, &["com.shared.FromA"], &[]);
    install_with(&registry, b, &["com.shared.FromB"], &[]);

    // Lookup from a reaches b's definition through the cycle
    let class = registry
        .find_class(&mid("a"), LookupRequest::new("com.shared.FromB"))
        .unwrap();
    assert_eq!(class.defined_by, mid("b"));

    // And vice versa
    let class = registry
        .find_class(&mid("b"), LookupRequest::new("com.shared.FromA"))
        .unwrap();
    assert_eq!(class.defined_by, mid("a"));

    // The merged source from a's perspective carries both providers once
    let source = registry.package_source(&mid("a"), "com.shared").unwrap();
    assert_eq!(source.providers().len(), 2);
}

#[test]
fn test_multi_source_merge_order_follows_wire_order() {
    // com.m comes from r1 then r2, in wire order.
    let registry = registry();
    let r1 = WiringBuilder::new(mid("r1")).export(cap("com.m")).build().unwrap();
    let r2 = WiringBuilder::new(mid("r2")).export(cap("com.m")).build().unwrap();
    install_with(&registry, r1.clone(), &["com.m.One"], &[]);
    install_with(&registry, r2.clone(), &["com.m.Two"], &[]);

    let y = WiringBuilder::new(mid("y"))
        .require(require("r1"), &r1)
        .require(require("r2"), &r2)
        .build()
        .unwrap();
    install_with(&registry, y, &[], &[]);

    let source = registry.package_source(&mid("y"), "com.m").unwrap();
    match source.as_ref() {
        PackageSource::Multi { sources, .. } => {
            assert_eq!(sources[0].module, mid("r1"));
            assert_eq!(sources[1].module, mid("r2"));
        }
        other => panic!("Expected Multi source, got {:?}", other),
    }

    // Delegation follows the same order: r1 defines the class first
    let class = registry
        .find_class(&mid("y"), LookupRequest::new("com.m.One"))
        .unwrap();
    assert_eq!(class.defined_by, mid("r1"));
    let class = registry
        .find_class(&mid("y"), LookupRequest::new("com.m.Two"))
        .unwrap();
    assert_eq!(class.defined_by, mid("r2"));
}

#[test]
fn test_merge_dedups_shared_bottom_provider() {
    // r1 and r2 both re-export d; the merged source must carry d once and
    // collapse to Single.
    let registry = registry();
    let d = WiringBuilder::new(mid("d")).export(cap("com.m")).build().unwrap();
    install_with(&registry, d.clone(), &["com.m.Base"], &[]);

    let r1 = WiringBuilder::new(mid("r1"))
        .require(reexport("d"), &d)
        .build()
        .unwrap();
    let r2 = WiringBuilder::new(mid("r2"))
        .require(reexport("d"), &d)
        .build()
        .unwrap();
    install_with(&registry, r1.clone(), &[], &[]);
    install_with(&registry, r2.clone(), &[], &[]);

    let y = WiringBuilder::new(mid("y"))
        .require(require("r1"), &r1)
        .require(require("r2"), &r2)
        .build()
        .unwrap();
    install_with(&registry, y, &[], &[]);

    let source = registry.package_source(&mid("y"), "com.m").unwrap();
    match source.as_ref() {
        PackageSource::Single(single) => assert_eq!(single.module, mid("d")),
        other => panic!("Expected Single source, got {:?}", other),
    }
}

#[test]
fn test_reexport_chain_of_depth_two() {
    let registry = registry();
    let c = WiringBuilder::new(mid("c")).export(cap("com.deep")).build().unwrap();
    install_with(&registry, c.clone(), &["com.deep.Leaf"], &[]);

    let b = WiringBuilder::new(mid("b"))
        .require(reexport("c"), &c)
        .build()
        .unwrap();
    install_with(&registry, b.clone(), &[], &[]);

    let a = WiringBuilder::new(mid("a"))
        .require(require("b"), &b)
        .build()
        .unwrap();
    install_with(&registry, a, &[], &[]);

    let class = registry
        .find_class(&mid("a"), LookupRequest::new("com.deep.Leaf"))
        .unwrap();
    assert_eq!(class.defined_by, mid("c"));
}

#[test]
fn test_non_reexported_dependency_is_not_visible() {
    // z requires w without re-export and does not itself provide com.w, so
    // w's export must not leak through z to y.
    let registry = registry();
    let w = WiringBuilder::new(mid("w")).export(cap("com.w")).build().unwrap();
    install_with(&registry, w.clone(), &["com.w.Hidden"], &[]);

    let z = WiringBuilder::new(mid("z"))
        .require(require("w"), &w)
        .build()
        .unwrap();
    install_with(&registry, z.clone(), &[], &[]);

    let y = WiringBuilder::new(mid("y"))
        .require(require("z"), &z)
        .build()
        .unwrap();
    install_with(&registry, y, &[], &[]);

    // z itself can see w's export through its own direct wire
    assert!(registry.try_find_class(&mid("z"), "com.w.Hidden").is_some());

    // y cannot: z does not re-export it
    assert!(registry.try_find_class(&mid("y"), "com.w.Hidden").is_none());

    let source = registry.package_source(&mid("y"), "com.w").unwrap();
    assert!(source.is_null());
}

#[test]
fn test_self_sourcing_module_pulls_from_dependency() {
    // A module may source a package from a dependency without the dependency
    // being re-exported, as long as it itself exports that package: its own
    // export makes the wire traversable for that package.
    let registry = registry();
    let lib = WiringBuilder::new(mid("lib")).export(cap("com.api")).build().unwrap();
    install_with(&registry, lib.clone(), &["com.api.Impl"], &[]);

    let facade = WiringBuilder::new(mid("facade"))
        .export(cap("com.api"))
        .require(require("lib"), &lib)
        .build()
        .unwrap();
    install_with(&registry, facade.clone(), &[], &[]);

    let y = WiringBuilder::new(mid("y"))
        .require(require("facade"), &facade)
        .build()
        .unwrap();
    install_with(&registry, y, &[], &[]);

    // facade exports com.api itself, so lib's contribution flows through
    // even though the lib wire carries no re-export directive.
    let source = registry.package_source(&mid("y"), "com.api").unwrap();
    assert_eq!(source.providers().len(), 2);
    assert_eq!(source.providers()[0].module, mid("lib"));
    assert_eq!(source.providers()[1].module, mid("facade"));

    let class = registry
        .find_class(&mid("y"), LookupRequest::new("com.api.Impl"))
        .unwrap();
    assert_eq!(class.defined_by, mid("lib"));
}
