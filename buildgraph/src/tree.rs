// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Package Tree Builder (spec module §4.5): assembles parsed targets into the two-rooted forest
//! (internal root at `""`, external root at `@`), creating Repository and Package containers on
//! demand.
//!
//! This is deliberately thin: [`crate::model::Build::ensure_container`] and
//! [`crate::model::Build::attach_child`] already implement the set-default container semantics
//! this component is responsible for; what's here is the single entry point that turns a flat
//! `label -> ParsedTarget` map (from one parser pass, or merged across several collector
//! iterations) into nodes placed in the tree, stubbing out anything a target refers to that isn't
//! resolvable yet.

use crate::attr::AttrBag;
use crate::model::{Build, GeneratedData, Node, NodeIndex, TargetData, STUB_KIND};
use crate::query::ParsedTarget;
use crate::Error;
use indexmap::IndexMap;

/// Places every parsed target under its owning package, promoting an existing stub in place if
/// one was already referenced, and stubs out every label any of them reference that isn't live.
///
/// Returns the indices of the targets placed, in input order, for callers (the collector) that
/// need to do further per-target bookkeeping.
pub fn place_parsed_targets(
    build: &mut Build,
    targets: IndexMap<String, ParsedTarget>,
) -> Result<Vec<NodeIndex>, Error> {
    let mut placed = Vec::with_capacity(targets.len());

    for (key, parsed) in targets {
        if let Some(ix) = build.resolve_label(&parsed.label) {
            if !matches!(build.get(ix).as_target(), Some(t) if t.is_stub()) {
                placed.push(ix);
                continue;
            }
        }

        let mut attrs = AttrBag::new();
        for (name, value) in parsed.attrs {
            attrs.insert(name, value);
        }

        let target_ix = build.replace(
            &key,
            Node::Target(TargetData {
                label: parsed.label.clone(),
                kind: parsed.kind,
                attrs,
                generator_name: parsed.generator_name,
                generator_function: parsed.generator_function,
            }),
        );
        build.attach_child(&parsed.label, target_ix)?;
        placed.push(target_ix);

        for generated_label in &parsed.generated {
            if build.resolve_label(generated_label).is_some() {
                continue;
            }
            build.place_under_package(
                generated_label,
                Node::Generated(GeneratedData {
                    label: generated_label.clone(),
                    maternal: target_ix,
                }),
            )?;
        }
    }

    stub_unresolved_references(build)?;
    Ok(placed)
}

/// Every label referenced by a live target's attributes that isn't itself resolvable yet gets a
/// placeholder `TargetNode` of kind `__target_stub__`, so downstream stages (and the next
/// collector iteration) have something uniform to look up.
fn stub_unresolved_references(build: &mut Build) -> Result<(), Error> {
    let referenced: Vec<_> = build
        .targets()
        .flat_map(|(_, t)| t.attrs.all_label_refs().into_iter().cloned())
        .collect();

    for label in referenced {
        if build.resolve_label(&label).is_some() {
            continue;
        }
        build.place_under_package(
            &label,
            Node::Target(TargetData {
                label: label.clone(),
                kind: STUB_KIND.to_string(),
                attrs: AttrBag::new(),
                generator_name: None,
                generator_function: None,
            }),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::query::build_format;

    #[test]
    fn places_a_target_under_its_package_and_stubs_its_deps() {
        let mut build = Build::new(Catalog::base());
        let text = r#"
cc_library(
  name = "a",
  srcs = ["a.cc"],
  deps = ["//other:b"],
)
# /repo/pkg/BUILD:1:1
"#;
        let parsed = build_format::parse_build_output(text, build.catalog(), "/repo").unwrap();
        place_parsed_targets(&mut build, parsed.targets).unwrap();

        let a = build.resolve_label(&crate::label::Label::parse("//pkg:a").unwrap()).unwrap();
        assert!(matches!(build.get(a), Node::Target(_)));

        let stub = build
            .resolve_label(&crate::label::Label::parse("//other:b").unwrap())
            .unwrap();
        let target = build.get(stub).as_target().unwrap();
        assert!(target.is_stub());

        let pkg = build.lookup("//pkg").unwrap();
        assert!(matches!(build.get(pkg), Node::Package(_)));
    }
}
