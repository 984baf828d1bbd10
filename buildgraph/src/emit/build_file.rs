// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The build-file pretty-printer (spec modules §4.7, §6.4): re-emits one deterministic,
//! UTF-8 text file per package that has at least one emittable construct.
//!
//! Determinism (testable property 4) falls out of never consulting anything but the in-memory
//! graph in a fixed order: packages are visited in sorted-address order, targets in
//! `(kind, label)` order, and every list-valued attribute is either sorted (label lists) or kept
//! in its stored insertion order (string lists) rather than re-derived from iteration order that
//! could vary run to run.

use crate::attr::AttrValue;
use crate::label::PackageAddr;
use crate::model::{Build, FunctionData, Node, NodeIndex, TargetData};
use indexmap::IndexMap;

/// One package's emitted build file.
#[derive(Clone, Debug)]
pub struct EmittedFile {
    pub package: PackageAddr,
    pub text: String,
}

/// Emits every package with at least one target or package-level function, in sorted package
/// order.
pub fn emit_all(build: &Build) -> Vec<EmittedFile> {
    let mut packages: Vec<(PackageAddr, NodeIndex)> = build
        .all_live_indices()
        .filter_map(|ix| match build.get(ix) {
            Node::Package(p) => Some((p.addr.clone(), ix)),
            _ => None,
        })
        .collect();
    packages.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));

    packages
        .into_iter()
        .filter_map(|(addr, ix)| emit_package(build, ix).map(|text| EmittedFile { package: addr, text }))
        .collect()
}

/// Emits one package's build file, or `None` if it has nothing to say.
pub fn emit_package(build: &Build, pkg_ix: NodeIndex) -> Option<String> {
    let (addr, child_ixs, function_ixs) = match build.get(pkg_ix) {
        Node::Package(p) => (
            p.addr.clone(),
            p.children.values().copied().collect::<Vec<_>>(),
            p.functions.clone(),
        ),
        _ => return None,
    };

    let mut targets: Vec<&TargetData> = child_ixs
        .iter()
        .filter_map(|&ix| build.get(ix).as_target())
        .filter(|t| !t.is_stub())
        .collect();
    targets.sort_by(|a, b| (a.kind.as_str(), a.label.as_str()).cmp(&(b.kind.as_str(), b.label.as_str())));

    let functions: Vec<&FunctionData> = function_ixs
        .iter()
        .filter_map(|&ix| match build.get(ix) {
            Node::Function(f) => Some(f),
            _ => None,
        })
        .collect();

    if targets.is_empty() && functions.is_empty() {
        return None;
    }

    let mut sections = vec![format!("# Package: {}", addr)];

    let imports = collect_imports(build, &targets);
    if !imports.is_empty() {
        sections.push(imports.join("\n"));
    }

    if !functions.is_empty() {
        let rendered: Vec<String> = functions.iter().map(|f| render_function(f, &addr)).collect();
        sections.push(rendered.join("\n\n"));
    }

    if !targets.is_empty() {
        let rendered: Vec<String> = targets
            .iter()
            .map(|t| render_target(build, t, &addr))
            .collect();
        sections.push(rendered.join("\n\n"));
    }

    Some(sections.join("\n\n") + "\n")
}

fn collect_imports(build: &Build, targets: &[&TargetData]) -> Vec<String> {
    let mut seen: IndexMap<&'static str, ()> = IndexMap::new();
    for t in targets {
        if let Some(stmt) = build.catalog().get(&t.kind).and_then(|s| s.import_statement()) {
            seen.insert(stmt, ());
        }
    }
    let mut stmts: Vec<&'static str> = seen.into_keys().collect();
    stmts.sort_unstable();
    stmts.into_iter().map(str::to_string).collect()
}

fn render_function(f: &FunctionData, pkg: &PackageAddr) -> String {
    let mut lines = vec![format!("{}(", f.name)];
    for (name, value) in ordered_attrs(f.attrs.iter().collect()) {
        lines.push(render_attr(name, value, pkg));
    }
    lines.push(")".to_string());
    lines.join("\n")
}

fn render_target(build: &Build, t: &TargetData, pkg: &PackageAddr) -> String {
    let mut lines = vec![format!("{}(", t.kind)];
    lines.push(format!("    name = \"{}\",", t.label.name()));
    for (name, value) in ordered_attrs(t.attrs.iter().collect()) {
        lines.push(render_attr(name, value, pkg));
    }
    if has_visibility(build, &t.kind) {
        lines.push("    visibility = [\"//visibility:public\"],".to_string());
    }
    lines.push(")".to_string());
    lines.join("\n")
}

fn has_visibility(build: &Build, kind: &str) -> bool {
    build.catalog().get(kind).map(|s| s.has_visibility()).unwrap_or(true)
}

/// Orders attributes label-lists -> string-lists -> strings -> single labels -> bools/ints ->
/// maps, per spec module §6.4. Ties within a tier keep the bag's own insertion order.
fn ordered_attrs<'a>(attrs: Vec<(&'a str, &'a AttrValue)>) -> Vec<(&'a str, &'a AttrValue)> {
    let mut tiered: Vec<(u8, &'a str, &'a AttrValue)> = attrs
        .into_iter()
        .map(|(name, value)| (tier_of(value), name, value))
        .collect();
    tiered.sort_by_key(|(tier, ..)| *tier);
    tiered.into_iter().map(|(_, name, value)| (name, value)).collect()
}

fn tier_of(value: &AttrValue) -> u8 {
    match value {
        AttrValue::LabelList(_) | AttrValue::OutLabelList(_) => 0,
        AttrValue::StringList(_) => 1,
        AttrValue::String(_) => 2,
        AttrValue::Label(_) | AttrValue::OutLabel(_) => 3,
        AttrValue::Bool(_) | AttrValue::Int(_) => 4,
        AttrValue::StrStrMap(_) => 5,
    }
}

fn render_attr(name: &str, value: &AttrValue, pkg: &PackageAddr) -> String {
    match value {
        AttrValue::LabelList(ls) | AttrValue::OutLabelList(ls) => {
            let mut shortened: Vec<String> = ls.iter().map(|l| l.shorten_within(pkg)).collect();
            shortened.sort();
            format!("    {} = {},", name, format_list(&shortened))
        }
        AttrValue::StringList(ss) => {
            format!("    {} = {},", name, format_list(ss))
        }
        AttrValue::String(s) => format!("    {} = \"{}\",", name, escape(s)),
        AttrValue::Label(l) | AttrValue::OutLabel(l) => {
            format!("    {} = \"{}\",", name, l.shorten_within(pkg))
        }
        AttrValue::Bool(b) => format!("    {} = {},", name, if *b { "True" } else { "False" }),
        AttrValue::Int(i) => format!("    {} = {},", name, i),
        AttrValue::StrStrMap(map) => {
            let mut entries: Vec<(&String, &String)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.as_str());
            let mut lines = vec![format!("    {} = {{", name)];
            for (k, v) in entries {
                lines.push(format!("        \"{}\": \"{}\",", escape(k), escape(v)));
            }
            lines.push("    },".to_string());
            lines.join("\n")
        }
    }
}

fn format_list(items: &[String]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    if items.len() == 1 {
        return format!("[\"{}\"]", escape(&items[0]));
    }
    let mut lines = vec!["[".to_string()];
    for item in items {
        lines.push(format!("        \"{}\",", escape(item)));
    }
    lines.push("    ]".to_string());
    lines.join("\n")
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::query::build_format;

    #[test]
    fn smoke_parse_and_emit() {
        let mut build = Build::new(Catalog::base());
        let text = r#"
cc_library(
  name = "a",
  srcs = ["a.cc"],
  hdrs = ["a.h"],
  deps = ["//p:b"],
)
# /repo/p/BUILD:1:1

cc_library(
  name = "b",
  srcs = ["b.cc"],
)
# /repo/p/BUILD:2:1
"#;
        let parsed = build_format::parse_build_output(text, build.catalog(), "/repo").unwrap();
        crate::tree::place_parsed_targets(&mut build, parsed.targets).unwrap();

        let pkg = build.lookup("//p").unwrap();
        let text = emit_package(&build, pkg).unwrap();
        assert!(text.starts_with("# Package: //p\n\n"));
        assert!(text.contains("cc_library(\n    name = \"a\","));
        assert!(text.contains("deps = [\":b\"]"));
        assert!(text.contains("visibility = [\"//visibility:public\"],"));
    }

    #[test]
    fn emission_is_deterministic_across_reruns() {
        let mut build = Build::new(Catalog::base());
        let text = r#"
cc_library(
  name = "a",
  srcs = ["a.cc", "z.cc", "m.cc"],
)
# /repo/p/BUILD:1:1
"#;
        let parsed = build_format::parse_build_output(text, build.catalog(), "/repo").unwrap();
        crate::tree::place_parsed_targets(&mut build, parsed.targets).unwrap();

        let pkg = build.lookup("//p").unwrap();
        let first = emit_package(&build, pkg).unwrap();
        let second = emit_package(&build, pkg).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn package_with_only_stubs_emits_nothing() {
        let mut build = Build::new(Catalog::base());
        let text = r#"
cc_library(
  name = "a",
  deps = ["//other:b"],
)
# /repo/p/BUILD:1:1
"#;
        let parsed = build_format::parse_build_output(text, build.catalog(), "/repo").unwrap();
        crate::tree::place_parsed_targets(&mut build, parsed.targets).unwrap();

        let other_pkg = build.lookup("//other").unwrap();
        assert!(emit_package(&build, other_pkg).is_none());
    }
}
