// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dfs(root, out_edges, in_edges?)` (spec module §4.6): walks label-typed attribute edges between
//! targets, rewriting `GeneratedFileNode` edges to their maternal target and skipping `FileNode`
//! and external leaves, recording in/out adjacency and raising `CycleDetected` the instant a node
//! on the current DFS path is seen again.
//!
//! Written iteratively with an explicit stack rather than recursively: target graphs in a large
//! monorepo have effectively unbounded depth, and a recursive walk would blow the native stack on
//! a sufficiently deep dependency chain (the same concern that keeps `guppy`'s SCC computation on
//! `kosaraju_scc` instead of the recursive `tarjan_scc`).

use crate::label::Label;
use crate::model::{Build, Node, NodeIndex};
use crate::Error;
use indexmap::{IndexMap, IndexSet};

/// The in/out adjacency of one node in a built [`TargetDag`].
#[derive(Clone, Debug, Default)]
pub struct Adjacency {
    pub out: IndexSet<NodeIndex>,
    pub in_: IndexSet<NodeIndex>,
}

/// A DAG over non-file, non-generated-file targets, derived from a [`Build`] snapshot.
#[derive(Clone, Debug, Default)]
pub struct TargetDag {
    adjacency: IndexMap<NodeIndex, Adjacency>,
}

impl TargetDag {
    /// Walks from `roots` only, recording adjacency for every target reached.
    pub fn build(build: &Build, roots: impl IntoIterator<Item = NodeIndex>) -> Result<Self, Error> {
        let mut dag = TargetDag::default();
        let mut visited = IndexSet::new();
        for root in roots {
            walk(build, root, &mut dag, &mut visited)?;
        }
        Ok(dag)
    }

    /// Walks from every live, non-stub internal target in `build`, so that the whole graph is
    /// checked for cycles at once -- the shape `prune_unreachable`'s callers and the
    /// invariant-check tests after each transformer stage both want.
    pub fn build_full(build: &Build) -> Result<Self, Error> {
        let roots: Vec<_> = build
            .targets()
            .filter(|(_, t)| !t.is_stub())
            .map(|(ix, _)| ix)
            .collect();
        Self::build(build, roots)
    }

    pub fn out_neighbors(&self, ix: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.adjacency
            .get(&ix)
            .into_iter()
            .flat_map(|adj| adj.out.iter().copied())
    }

    pub fn in_neighbors(&self, ix: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.adjacency
            .get(&ix)
            .into_iter()
            .flat_map(|adj| adj.in_.iter().copied())
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn adjacency_of(&self, ix: NodeIndex) -> Option<&Adjacency> {
        self.adjacency.get(&ix)
    }
}

enum Frame {
    Enter(NodeIndex),
    Exit(NodeIndex),
}

fn walk(
    build: &Build,
    root: NodeIndex,
    dag: &mut TargetDag,
    visited: &mut IndexSet<NodeIndex>,
) -> Result<(), Error> {
    let mut stack = vec![Frame::Enter(root)];
    let mut path: Vec<NodeIndex> = Vec::new();
    let mut path_set: IndexSet<NodeIndex> = IndexSet::new();

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(ix) => {
                if path_set.contains(&ix) {
                    let start = path.iter().position(|p| *p == ix).expect("path_set/path out of sync");
                    let mut cycle: Vec<Label> = path[start..]
                        .iter()
                        .map(|p| build.get(*p).label().expect("cycle member is a labeled node").clone())
                        .collect();
                    cycle.push(build.get(ix).label().expect("cycle member is a labeled node").clone());
                    return Err(Error::CycleDetected(cycle));
                }
                if visited.contains(&ix) {
                    continue;
                }

                path.push(ix);
                path_set.insert(ix);
                stack.push(Frame::Exit(ix));

                dag.adjacency.entry(ix).or_default();
                for neighbor in target_out_neighbors(build, ix) {
                    dag.adjacency.entry(ix).or_default().out.insert(neighbor);
                    dag.adjacency.entry(neighbor).or_default().in_.insert(ix);
                    stack.push(Frame::Enter(neighbor));
                }
            }
            Frame::Exit(ix) => {
                path.pop();
                path_set.swap_remove(&ix);
                visited.insert(ix);
            }
        }
    }

    Ok(())
}

/// The out-neighbors of a target, per spec module §4.6: a `GeneratedFileNode` reference is
/// rewritten to its maternal target; `FileNode`s and external targets are leaves and not
/// traversed (and so don't appear as neighbors at all).
fn target_out_neighbors(build: &Build, ix: NodeIndex) -> IndexSet<NodeIndex> {
    let mut neighbors = IndexSet::new();
    let Node::Target(target) = build.get(ix) else {
        return neighbors;
    };
    for label in target.attrs.all_label_refs() {
        let Some(ref_ix) = build.resolve_label(label) else {
            continue;
        };
        match build.get(ref_ix) {
            Node::Target(t) => {
                if !t.label.is_external() {
                    neighbors.insert(ref_ix);
                }
            }
            Node::Generated(g) => {
                let maternal = build.get(g.maternal);
                if matches!(maternal.as_target(), Some(t) if !t.label.is_external()) {
                    neighbors.insert(g.maternal);
                }
            }
            Node::File(_) => {}
            _ => {}
        }
    }
    neighbors
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::query::build_format;

    fn build_with(text: &str) -> Build {
        let mut build = Build::new(Catalog::base());
        let parsed = build_format::parse_build_output(text, build.catalog(), "/repo").unwrap();
        crate::tree::place_parsed_targets(&mut build, parsed.targets).unwrap();
        build
    }

    #[test]
    fn detects_a_three_cycle() {
        let build = build_with(
            r#"
cc_library(
  name = "a",
  deps = ["//pkg:b"],
)
# /repo/pkg/BUILD:1:1

cc_library(
  name = "b",
  deps = ["//pkg:c"],
)
# /repo/pkg/BUILD:2:1

cc_library(
  name = "c",
  deps = ["//pkg:a"],
)
# /repo/pkg/BUILD:3:1
"#,
        );

        let err = TargetDag::build_full(&build).unwrap_err();
        match err {
            Error::CycleDetected(path) => {
                let s: Vec<_> = path.iter().map(|l| l.as_str()).collect();
                assert_eq!(s.first(), s.last());
                assert_eq!(s.len(), 4);
            }
            other => panic!("expected CycleDetected, got {:?}", other),
        }
    }

    #[test]
    fn acyclic_graph_builds_adjacency() {
        let build = build_with(
            r#"
cc_library(
  name = "a",
  deps = ["//pkg:b"],
)
# /repo/pkg/BUILD:1:1

cc_library(
  name = "b",
  deps = [],
)
# /repo/pkg/BUILD:2:1
"#,
        );

        let dag = TargetDag::build_full(&build).unwrap();
        let a = build.resolve_label(&crate::label::Label::parse("//pkg:a").unwrap()).unwrap();
        let b = build.resolve_label(&crate::label::Label::parse("//pkg:b").unwrap()).unwrap();
        assert!(dag.out_neighbors(a).any(|n| n == b));
        assert!(dag.in_neighbors(b).any(|n| n == a));
    }
}
