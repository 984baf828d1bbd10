// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `prune_unreachable(container, artifact_roots)` (spec module §4.6, derived operation): deletes
//! every removable node not reachable from a configured set of artifact roots.

use crate::graph::dag::TargetDag;
use crate::label::Addr;
use crate::model::{Build, Node, NodeIndex};
use crate::Error;
use indexmap::IndexSet;

/// Extension point letting a domain overlay protect rule kinds that would otherwise be eligible
/// for removal (e.g. a `config_setting` referenced only from `select()` expressions the target
/// model doesn't see, or `bool_flag` globally).
pub trait Removability {
    /// Returns `false` to keep a node alive even if it's unreachable from every artifact root.
    fn is_removable(&self, build: &Build, ix: NodeIndex) -> bool;
}

/// The default policy: removable iff [`Node::is_removable_by_default`] says so.
pub struct DefaultRemovability;

impl Removability for DefaultRemovability {
    fn is_removable(&self, build: &Build, ix: NodeIndex) -> bool {
        build.get(ix).is_removable_by_default()
    }
}

/// Deletes every removable node in the graph that isn't reachable from `artifact_roots`, along
/// with each deleted target's declared outputs. Returns the number of nodes removed.
pub fn prune_unreachable(
    build: &mut Build,
    artifact_roots: &[NodeIndex],
    policy: &dyn Removability,
) -> Result<usize, Error> {
    let dag = TargetDag::build(build, artifact_roots.iter().copied())?;
    let reachable: IndexSet<NodeIndex> = dag.nodes().collect();

    let mut removed = 0usize;
    let candidates: Vec<NodeIndex> = build.all_live_indices().collect();
    for ix in candidates {
        if reachable.contains(&ix) {
            continue;
        }
        if !policy.is_removable(build, ix) {
            continue;
        }
        remove_target_and_outputs(build, ix, &mut removed);
    }

    removed += sweep_orphaned_files(build);

    Ok(removed)
}

/// A `FileNode`'s existence is derivative of being referenced: once the last target or function
/// pointing at it is gone, it no longer belongs in the tree. Mirrors invariant 4 of spec module
/// §3 ("removing a target removes all of its generated outputs"), extended to source files that
/// only the just-removed targets referenced.
fn sweep_orphaned_files(build: &mut Build) -> usize {
    let mut referenced = IndexSet::new();
    for (_, target) in build.targets() {
        referenced.extend(target.attrs.all_label_refs().into_iter().cloned());
    }
    for ix in build.all_live_indices() {
        if let Node::Function(f) = build.get(ix) {
            referenced.extend(f.attrs.all_label_refs().into_iter().cloned());
        }
    }

    let orphaned: Vec<NodeIndex> = build
        .all_live_indices()
        .filter(|&ix| matches!(build.get(ix), Node::File(f) if !referenced.contains(&f.label)))
        .collect();
    for ix in &orphaned {
        detach_and_remove(build, *ix);
    }
    orphaned.len()
}

fn remove_target_and_outputs(build: &mut Build, ix: NodeIndex, removed: &mut usize) {
    let generated: Vec<NodeIndex> = build
        .all_live_indices()
        .filter(|&g| matches!(build.get(g), Node::Generated(d) if d.maternal == ix))
        .collect();
    for g in generated {
        detach_and_remove(build, g);
        *removed += 1;
    }
    detach_and_remove(build, ix);
    *removed += 1;
}

/// Tombstones a leaf node and removes it from its owning package's `children`, matching what
/// `header_only`/`macro_collapse` do after their own `build.remove()` calls.
fn detach_and_remove(build: &mut Build, ix: NodeIndex) {
    if let Some(label) = build.get(ix).label().cloned() {
        if let Addr::Package(pkg) = label.parent() {
            if let Some(pkg_ix) = build.lookup(&pkg.to_string()) {
                if let Node::Package(p) = build.get_mut(pkg_ix) {
                    p.children.retain(|_, c| *c != ix);
                }
            }
        }
    }
    build.remove(ix);
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::label::Label;
    use crate::query::build_format;

    #[test]
    fn prunes_an_unreachable_target_and_its_file() {
        let mut build = Build::new(Catalog::base());
        let text = r#"
cc_binary(
  name = "bin",
  srcs = ["bin.cc"],
  deps = ["//a:lib", "//z:kept"],
)
# /repo/a/BUILD:1:1

cc_library(
  name = "lib",
  srcs = ["lib.cc"],
)
# /repo/a/BUILD:2:1

cc_library(
  name = "kept",
  srcs = ["kept.cc"],
)
# /repo/z/BUILD:1:1

cc_library(
  name = "orphan",
  srcs = ["orphan.cc"],
)
# /repo/z/BUILD:2:1
"#;
        let parsed = build_format::parse_build_output(text, build.catalog(), "/repo").unwrap();
        crate::tree::place_parsed_targets(&mut build, parsed.targets).unwrap();

        let bin_ix = build.resolve_label(&Label::parse("//a:bin").unwrap()).unwrap();
        let orphan_ix = build.resolve_label(&Label::parse("//z:orphan").unwrap()).unwrap();
        let orphan_file_ix = build
            .resolve_label(&Label::parse("//z:orphan.cc").unwrap())
            .unwrap();

        prune_unreachable(&mut build, &[bin_ix], &DefaultRemovability).unwrap();

        assert!(!build.is_live(orphan_ix));
        assert!(build.is_live(bin_ix));
        let lib_ix = build.resolve_label(&Label::parse("//a:lib").unwrap()).unwrap();
        assert!(build.is_live(lib_ix));

        // //z keeps a live target alongside the removed //z:orphan; emitting it must not panic on
        // a stale NodeIndex left in Package::children by the removal.
        let kept_ix = build.resolve_label(&Label::parse("//z:kept").unwrap()).unwrap();
        assert!(build.is_live(kept_ix));
        let z = build.lookup("//z").unwrap();
        let text = crate::emit::emit_package(&build, z).unwrap();
        assert!(text.contains("name = \"kept\""));
        assert!(!text.contains("orphan"));
        // The orphan's source file is never referenced once its only target is gone.
        assert!(!build.is_live(orphan_file_ix));
    }
}
