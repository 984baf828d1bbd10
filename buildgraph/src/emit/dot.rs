// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Graphviz `.dot` emitter (spec module §4.7, second algorithm): renders a [`TargetDag`] for
//! visual inspection. Invoking a layout engine (`twopi`, `dot`) on the result is out of scope here
//! -- see spec module §6.3 -- this only produces the text.

use crate::graph::TargetDag;
use crate::model::{Build, NodeIndex};
use indexmap::IndexSet;

/// Renders `dag` as Graphviz `dot` source.
///
/// Nodes are visited in sorted-label order and labeled `<label>:<out-degree>:<in-degree>` so a
/// reader can spot hubs without running a layout pass first. An edge present in both directions
/// (`a -> b` and `b -> a`) is collapsed into a single undirected, color-coded edge rather than
/// being drawn twice.
pub fn emit_dot(build: &Build, dag: &TargetDag) -> String {
    let mut nodes: Vec<NodeIndex> = dag.nodes().collect();
    nodes.sort_by_key(|&ix| label_of(build, ix).to_string());

    let mut lines = vec!["digraph buildgraph {".to_string()];
    for &ix in &nodes {
        let label = label_of(build, ix);
        let out = dag.out_neighbors(ix).count();
        let in_ = dag.in_neighbors(ix).count();
        lines.push(format!(
            "  \"{}\" [label=\"{}:{}:{}\"];",
            escape(label),
            escape(label),
            out,
            in_
        ));
    }

    let mut collapsed: IndexSet<(NodeIndex, NodeIndex)> = IndexSet::new();
    for &a in &nodes {
        for b in dag.out_neighbors(a) {
            let is_reciprocal = dag.out_neighbors(b).any(|n| n == a);
            if is_reciprocal {
                let key = if a < b { (a, b) } else { (b, a) };
                if !collapsed.insert(key) {
                    continue;
                }
                lines.push(format!(
                    "  \"{}\" -> \"{}\" [dir=none, color=\"red\"];",
                    escape(label_of(build, a)),
                    escape(label_of(build, b))
                ));
            } else {
                lines.push(format!(
                    "  \"{}\" -> \"{}\";",
                    escape(label_of(build, a)),
                    escape(label_of(build, b))
                ));
            }
        }
    }

    lines.push("}".to_string());
    lines.join("\n") + "\n"
}

fn label_of(build: &Build, ix: NodeIndex) -> &str {
    build
        .get(ix)
        .label()
        .expect("a TargetDag node is always a labeled target")
        .as_str()
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
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
    fn emits_one_node_per_target_with_degree_labels() {
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
        let dot = emit_dot(&build, &dag);
        assert!(dot.starts_with("digraph buildgraph {\n"));
        assert!(dot.contains("\"//pkg:a\" [label=\"//pkg:a:1:0\"];"));
        assert!(dot.contains("\"//pkg:b\" [label=\"//pkg:b:0:1\"];"));
        assert!(dot.contains("\"//pkg:a\" -> \"//pkg:b\";"));
    }

    #[test]
    fn diamond_shaped_dag_emits_without_duplicate_edges() {
        let build = build_with(
            r#"
cc_library(
  name = "top",
  deps = ["//pkg:left", "//pkg:right"],
)
# /repo/pkg/BUILD:1:1

cc_library(
  name = "left",
  deps = ["//pkg:bottom"],
)
# /repo/pkg/BUILD:2:1

cc_library(
  name = "right",
  deps = ["//pkg:bottom"],
)
# /repo/pkg/BUILD:3:1

cc_library(
  name = "bottom",
  deps = [],
)
# /repo/pkg/BUILD:4:1
"#,
        );
        let dag = TargetDag::build_full(&build).unwrap();
        let dot = emit_dot(&build, &dag);
        assert_eq!(dot.matches("\"//pkg:left\" -> \"//pkg:bottom\";").count(), 1);
        assert_eq!(dot.matches("\"//pkg:right\" -> \"//pkg:bottom\";").count(), 1);
        assert!(dot.contains("\"//pkg:bottom\" [label=\"//pkg:bottom:0:2\"];"));
        assert!(!dot.contains("dir=none"));
    }
}
