// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cc_header_only_library` Merger (spec module §4.8.C): a special case of the macro collapse
//! pass, but structural rather than generator-function-keyed, so it's usable standalone.
//!
//! For each package holding a `_transitive_hdrs` target named `X_gather`, locates the sibling
//! `_transitive_parameters_library` (found via the paired `cc_library X`'s own `deps`, since that's
//! the only link between the two in the source text) and replaces all three with one
//! `cc_header_only_library` named `X`.

use crate::attr::{AttrBag, AttrValue};
use crate::label::Label;
use crate::model::{Build, Node, NodeIndex};
use crate::transform::Transformer;
use crate::Error;
use indexmap::IndexSet;

pub struct HeaderOnlyMerger;

impl Transformer for HeaderOnlyMerger {
    fn name(&self) -> &'static str {
        "cc_header_only_library_merge"
    }

    fn apply(&self, build: &mut Build) -> Result<(), Error> {
        let package_ixs: Vec<NodeIndex> = build
            .all_live_indices()
            .filter(|&ix| matches!(build.get(ix), Node::Package(_)))
            .collect();
        for pkg_ix in package_ixs {
            merge_package(build, pkg_ix)?;
        }
        Ok(())
    }
}

fn merge_package(build: &mut Build, pkg_ix: NodeIndex) -> Result<(), Error> {
    let pkg_addr = match build.get(pkg_ix) {
        Node::Package(p) => p.addr.clone(),
        _ => return Ok(()),
    };
    let children: Vec<NodeIndex> = match build.get(pkg_ix) {
        Node::Package(p) => p.children.values().copied().collect(),
        _ => return Ok(()),
    };

    let gathers: Vec<(String, NodeIndex)> = children
        .into_iter()
        .filter_map(|ix| {
            let target = build.get(ix).as_target()?;
            if target.kind != "_transitive_hdrs" {
                return None;
            }
            target
                .label
                .name()
                .strip_suffix("_gather")
                .map(|stem| (stem.to_string(), ix))
        })
        .collect();

    for (group_name, gather_ix) in gathers {
        if !build.is_live(gather_ix) {
            continue;
        }
        merge_group(build, pkg_ix, &pkg_addr, &group_name, gather_ix)?;
    }
    Ok(())
}

fn merge_group(
    build: &mut Build,
    pkg_ix: NodeIndex,
    pkg_addr: &crate::label::PackageAddr,
    group_name: &str,
    gather_ix: NodeIndex,
) -> Result<(), Error> {
    let cc_lib_label = Label::from_parts(pkg_addr.external, &pkg_addr.repo, &pkg_addr.path, group_name);
    let cc_lib_ix = build.resolve_label(&cc_lib_label).filter(|&ix| build.is_live(ix));
    let Some(cc_lib_ix) = cc_lib_ix else {
        return Err(Error::TransformError {
            transformer: "cc_header_only_library_merge",
            package: pkg_addr.to_string(),
            group_key: Some(group_name.to_string()),
            expected: format!("a sibling cc_library named '{}'", group_name),
        });
    };

    let cc_lib_deps = build.get(cc_lib_ix).as_target().unwrap().attrs.label_list("deps").to_vec();
    let params_ix = cc_lib_deps.iter().find_map(|label| {
        let ix = build.resolve_label(label)?;
        matches!(build.get(ix).as_target(), Some(t) if t.kind == "_transitive_parameters_library")
            .then_some((ix, label.clone()))
    });
    let Some((params_ix, params_label)) = params_ix else {
        return Err(Error::TransformError {
            transformer: "cc_header_only_library_merge",
            package: pkg_addr.to_string(),
            group_key: Some(group_name.to_string()),
            expected: "a sibling _transitive_parameters_library referenced from the cc_library's deps".to_string(),
        });
    };

    let new_deps = build.get(gather_ix).as_target().unwrap().attrs.label_list("deps").to_vec();
    let hdrs = build.get(cc_lib_ix).as_target().unwrap().attrs.label_list("hdrs").to_vec();
    let includes = build.get(cc_lib_ix).as_target().unwrap().attrs.get("includes").cloned();

    let mut seen: IndexSet<Label> = IndexSet::new();
    let extra_deps: Vec<Label> = cc_lib_deps
        .into_iter()
        .filter(|d| *d != params_label)
        .filter(|d| seen.insert(d.clone()))
        .collect();

    let mut attrs = AttrBag::new();
    attrs.insert("deps", AttrValue::LabelList(new_deps));
    attrs.insert("extra_deps", AttrValue::LabelList(extra_deps));
    attrs.insert("hdrs", AttrValue::LabelList(hdrs));
    if let Some(includes) = includes {
        attrs.insert("includes", includes);
    }

    build.remove(gather_ix);
    build.remove(params_ix);

    let merged_ix = build.replace(
        cc_lib_label.as_str(),
        Node::Target(crate::model::TargetData {
            label: cc_lib_label.clone(),
            kind: "cc_header_only_library".to_string(),
            attrs,
            generator_name: Some(group_name.to_string()),
            generator_function: Some("cc_header_only_library".to_string()),
        }),
    );
    build.attach_child(&cc_lib_label, merged_ix)?;

    if let Node::Package(p) = build.get_mut(pkg_ix) {
        p.children.retain(|_, ix| *ix != gather_ix && *ix != params_ix);
    }

    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::query::build_format;

    #[test]
    fn merges_the_header_only_trio() {
        let mut build = Build::new(Catalog::base());
        let text = r#"
_transitive_hdrs(
  name = "x_gather",
  deps = ["//e:h1"],
)
# /repo/p/BUILD:1:1

_transitive_parameters_library(
  name = "x_params",
  original_deps = [],
)
# /repo/p/BUILD:2:1

cc_library(
  name = "x",
  hdrs = ["x.h"],
  deps = [":x_params", "//e:o"],
)
# /repo/p/BUILD:3:1
"#;
        let parsed = build_format::parse_build_output(text, build.catalog(), "/repo").unwrap();
        crate::tree::place_parsed_targets(&mut build, parsed.targets).unwrap();

        HeaderOnlyMerger.apply(&mut build).unwrap();

        let x = build
            .resolve_label(&Label::parse("//p:x").unwrap())
            .unwrap();
        let target = build.get(x).as_target().unwrap();
        assert_eq!(target.kind, "cc_header_only_library");
        assert_eq!(target.attrs.label_list("deps")[0].as_str(), "//e:h1");
        assert_eq!(target.attrs.label_list("extra_deps")[0].as_str(), "//e:o");

        let gather = build.resolve_label(&Label::parse("//p:x_gather").unwrap()).unwrap();
        assert!(!build.is_live(gather));
        let params = build.resolve_label(&Label::parse("//p:x_params").unwrap()).unwrap();
        assert!(!build.is_live(params));
    }
}
