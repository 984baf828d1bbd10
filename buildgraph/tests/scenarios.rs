// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios from spec module §8, run through the package tree builder and the
//! transformers that each one is meant to exercise, rather than one component in isolation.
//!
//! S1 and S6 go through the full collector, since they hinge on `FileNode` materialization from a
//! `label_kind` response. The others parse and place directly -- the same shortcut the
//! transformers' own unit tests take -- since their external `deps` would otherwise need either a
//! fabricated second query round or an `excluded_prefixes` entry just to satisfy the collector's
//! alien-stub check, neither of which has anything to do with what the scenario is testing.

use buildgraph::catalog::Catalog;
use buildgraph::collector::{Collector, CollectorConfig, OutputFormat, QueryRunner};
use buildgraph::emit;
use buildgraph::graph::TargetDag;
use buildgraph::label::Label;
use buildgraph::model::{Build, Node};
use buildgraph::query::build_format;
use buildgraph::transform::alias::AliasElision;
use buildgraph::transform::cc_merge::CcLibraryMerge;
use buildgraph::transform::exports::CrossPackageExportSynthesis;
use buildgraph::transform::header_only::HeaderOnlyMerger;
use buildgraph::transform::prune_unreachable::PruneUnreachable;
use buildgraph::transform::Transformer;
use buildgraph::Error;
use std::error;

struct FixtureRunner {
    build_response: String,
    label_kind_response: String,
}

impl QueryRunner for FixtureRunner {
    fn query_deps(
        &mut self,
        _targets: &[String],
        _excluded: &[String],
        output: OutputFormat,
    ) -> Result<String, Box<dyn error::Error + Send + Sync>> {
        Ok(match output {
            OutputFormat::Build => self.build_response.clone(),
            OutputFormat::LabelKind => self.label_kind_response.clone(),
        })
    }
}

/// Drives a full `Collector` run. Only suitable for scenarios where every referenced label is
/// either defined in `build_text` or classified in `label_text` -- otherwise the collector's
/// end-of-run alien-stub check fails the whole thing, which these tests are not about.
fn collect(build_text: &str, label_text: &str, root: &str) -> Build {
    let mut build = Build::new(Catalog::base());
    let mut collector = Collector::new(
        &mut build,
        CollectorConfig {
            prefix_path: "/src".to_string(),
            ..Default::default()
        },
    );
    let mut runner = FixtureRunner {
        build_response: build_text.to_string(),
        label_kind_response: label_text.to_string(),
    };
    collector.run(&mut runner, &[root.to_string()]).unwrap();
    build
}

/// Parses and places a build-output blob without running the collector's convergence loop, for
/// scenarios whose `deps` point at labels this test has no interest in resolving.
fn parse_and_place(build_text: &str) -> Build {
    let mut build = Build::new(Catalog::base());
    let parsed = build_format::parse_build_output(build_text, build.catalog(), "/src").unwrap();
    buildgraph::tree::place_parsed_targets(&mut build, parsed.targets).unwrap();
    build
}

#[test]
fn s1_smoke_parse_and_emit() {
    let build = collect(
        fixtures::build_output::SMOKE_CC_LIBRARY,
        fixtures::label_kind::SMOKE_CC_LIBRARY,
        "//pkg:a",
    );

    let a_cc = build.resolve_label(&Label::parse("//pkg:a.cc").unwrap()).unwrap();
    assert!(matches!(build.get(a_cc), Node::File(_)));
    let a_h = build.resolve_label(&Label::parse("//pkg:a.h").unwrap()).unwrap();
    assert!(matches!(build.get(a_h), Node::File(_)));

    let pkg = build.lookup("//pkg").unwrap();
    let text = emit::emit_package(&build, pkg).unwrap();
    assert!(text.contains("cc_library(\n    name = \"a\","));
    assert!(text.contains("hdrs = [\":a.h\"],"));
    assert!(text.contains("srcs = [\":a.cc\"],"));
    assert!(text.contains("visibility = [\"//visibility:public\"],"));
}

#[test]
fn s2_alias_elision_into_genrule_cmd() {
    let mut build = parse_and_place(fixtures::build_output::ALIAS_INTO_GENRULE_CMD);

    AliasElision.apply(&mut build).unwrap();

    let g = build.resolve_label(&Label::parse("//p:g").unwrap()).unwrap();
    let target = build.get(g).as_target().unwrap();
    let tools = target.attrs.label_list("tools");
    assert_eq!(tools[0].as_str(), "//x:real");
    match target.attrs.get("cmd").unwrap() {
        buildgraph::attr::AttrValue::String(s) => {
            assert!(s.contains("//x:real"));
            assert!(!s.contains("//p:al"));
        }
        other => panic!("expected a String attr, got {:?}", other),
    }
}

#[test]
fn s3_cycle_detected_reports_the_full_path() {
    let build = parse_and_place(fixtures::build_output::THREE_CYCLE);

    let err = TargetDag::build_full(&build).unwrap_err();
    match err {
        Error::CycleDetected(path) => {
            let joined = path.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(" -> ");
            assert!(joined.contains("//pkg:a -> //pkg:b -> //pkg:c -> //pkg:a"));
        }
        other => panic!("expected CycleDetected, got {:?}", other),
    }
}

#[test]
fn s4_header_only_collapse() {
    let mut build = parse_and_place(fixtures::build_output::HEADER_ONLY_TRIO);

    HeaderOnlyMerger.apply(&mut build).unwrap();

    assert!(build.lookup("//p:x_gather").map(|ix| !build.is_live(ix)).unwrap_or(true));
    assert!(build.lookup("//p:x_params").map(|ix| !build.is_live(ix)).unwrap_or(true));

    let x = build.resolve_label(&Label::parse("//p:x").unwrap()).unwrap();
    let target = build.get(x).as_target().unwrap();
    assert_eq!(target.kind, "cc_header_only_library");
    assert_eq!(target.attrs.label_list("deps")[0].as_str(), "//e:h1");
    assert_eq!(target.attrs.label_list("extra_deps")[0].as_str(), "//e:o");
}

#[test]
fn s5_unreachable_pruning_removes_the_orphan_and_its_file() {
    let mut build = parse_and_place(fixtures::build_output::UNREACHABLE_ORPHAN);

    let bin = build.resolve_label(&Label::parse("//a:bin").unwrap()).unwrap();
    PruneUnreachable {
        artifact_roots: vec![Label::parse("//a:bin").unwrap()],
    }
    .apply(&mut build)
    .unwrap();

    assert!(build.is_live(bin));
    let lib = build.resolve_label(&Label::parse("//a:lib").unwrap()).unwrap();
    assert!(build.is_live(lib));

    let orphan = build.resolve_label(&Label::parse("//z:orphan").unwrap()).unwrap();
    assert!(!build.is_live(orphan));
    let orphan_file = build.resolve_label(&Label::parse("//z:orphan.cc").unwrap()).unwrap();
    assert!(!build.is_live(orphan_file));

    // //z held both the pruned target and its pruned source file; emitting it must not trip over
    // a stale NodeIndex left behind in Package::children by the removals above.
    let z = build.lookup("//z").unwrap();
    assert_eq!(emit::emit_package(&build, z), None);

    let a = build.lookup("//a").unwrap();
    let text = emit::emit_package(&build, a).unwrap();
    assert!(text.contains("name = \"bin\""));
    assert!(text.contains("name = \"lib\""));
}

#[test]
fn s6_exports_files_synthesis() {
    let mut build = collect(
        fixtures::build_output::CROSS_PACKAGE_EXPORT,
        fixtures::label_kind::CROSS_PACKAGE_EXPORT,
        "//p:t",
    );

    CrossPackageExportSynthesis.apply(&mut build).unwrap();

    let q = build.lookup("//q").unwrap();
    let functions = match build.get(q) {
        Node::Package(p) => p.functions.clone(),
        _ => panic!("//q should be a package"),
    };
    assert_eq!(functions.len(), 1);
    let f = match build.get(functions[0]) {
        Node::Function(f) => f,
        _ => panic!("expected a function node"),
    };
    assert_eq!(f.name, "exports_files");
    assert_eq!(f.attrs.label_list("srcs")[0].as_str(), "//q:s.h");

    let p = build.lookup("//p").unwrap();
    let p_functions = match build.get(p) {
        Node::Package(pkg) => pkg.functions.len(),
        _ => panic!("//p should be a package"),
    };
    assert_eq!(p_functions, 0);
}

#[test]
fn cc_library_merge_is_source_preserving_across_a_two_level_closure() {
    let text = r#"
cc_library(
  name = "top",
  srcs = ["top.cc"],
  deps = ["//p:mid"],
)
# /src/p/BUILD:1:1

cc_library(
  name = "mid",
  srcs = ["mid.cc"],
  hdrs = ["mid.h"],
  deps = [],
)
# /src/p/BUILD:2:1
"#;
    let mut build = parse_and_place(text);

    CcLibraryMerge {
        roots: vec![Label::parse("//p:top").unwrap()],
        new_prefix: "merged_".to_string(),
    }
    .apply(&mut build)
    .unwrap();

    let merged = build
        .resolve_label(&Label::parse("//p:merged_top").unwrap())
        .unwrap();
    let target = build.get(merged).as_target().unwrap();
    let mut srcs: Vec<_> = target.attrs.label_list("srcs").iter().map(|l| l.as_str()).collect();
    srcs.sort();
    assert_eq!(srcs, vec!["//p:mid.cc", "//p:top.cc"]);
    assert_eq!(target.attrs.label_list("hdrs")[0].as_str(), "//p:mid.h");
}
