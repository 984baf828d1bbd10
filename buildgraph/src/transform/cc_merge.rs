// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! cc_library Deep Merge (spec module §4.8.D): flattens a `cc_library` dependency closure into a
//! single target, and its `cc_shared_library` counterpart.
//!
//! The closure walk treats every encountered node by what it *is*, not by where it sits in the
//! tree: a `cc_library` is inlined (its own attrs merged in, its `deps` pushed onward); a
//! `filegroup` is expanded transitively to its constituent files (memoized, since the same
//! filegroup is commonly shared by several libraries in the closure); a file, generated file,
//! external target, or a target carrying `strip_include_prefix` is a leaf the walk stops at;
//! anything else (an ordinary internal wrapper target) is traversed one level further by
//! following its own label references, without contributing attrs of its own.

use crate::attr::{AttrBag, AttrValue};
use crate::label::{Label, PackageAddr};
use crate::model::{Build, Node, NodeIndex, TargetData};
use crate::transform::alias::resolve_chain;
use crate::transform::Transformer;
use crate::Error;
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Merges the transitive `deps` closure of a `cc_library` root into one new `cc_library`, named
/// `<new_prefix><root.name()>`, placed in the root's own package.
pub struct CcLibraryMerge {
    pub roots: Vec<Label>,
    pub new_prefix: String,
}

impl Transformer for CcLibraryMerge {
    fn name(&self) -> &'static str {
        "cc_library_merge"
    }

    fn apply(&self, build: &mut Build) -> Result<(), Error> {
        for root in self.roots.clone() {
            merge_one(build, &root, &self.new_prefix)?;
        }
        Ok(())
    }
}

/// Merges the closure reachable from a `cc_shared_library`'s `roots`, emitting an internal
/// `cc_library` plus a duplicated `cc_shared_library` pointed at it, and globally rewrites every
/// reference to the original shared-library label to the new one.
pub struct CcSharedLibraryMerge {
    pub roots: Vec<Label>,
    pub new_prefix: String,
}

impl Transformer for CcSharedLibraryMerge {
    fn name(&self) -> &'static str {
        "cc_shared_library_merge"
    }

    fn apply(&self, build: &mut Build) -> Result<(), Error> {
        for root in self.roots.clone() {
            merge_shared_one(build, &root, &self.new_prefix)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Accum {
    hdrs: IndexSet<Label>,
    srcs: IndexSet<Label>,
    deps: IndexSet<Label>,
    textual_hdrs: IndexSet<Label>,
    copts: IndexSet<String>,
    linkopts: IndexSet<String>,
    features: IndexSet<String>,
    includes: IndexSet<String>,
    strip_include_prefix: IndexSet<String>,
}

fn merge_one(build: &mut Build, root: &Label, new_prefix: &str) -> Result<(), Error> {
    let root_ix = expect_target(build, root, "cc_library_merge", "a cc_library root")?;
    let pkg = root.package();

    let mut accum = Accum::default();
    let mut visited: IndexSet<Label> = IndexSet::new();
    let mut fg_memo: IndexMap<Label, Vec<Label>> = IndexMap::new();
    walk(build, root, &mut accum, &mut visited, &mut fg_memo)?;
    let _ = root_ix;

    let new_label = Label::from_parts(pkg.external, &pkg.repo, &pkg.path, &format!("{}{}", new_prefix, root.name()));
    let attrs = finalize(accum);
    let ix = build.place_under_package(
        &new_label,
        Node::Target(TargetData {
            label: new_label.clone(),
            kind: "cc_library".to_string(),
            attrs,
            generator_name: None,
            generator_function: None,
        }),
    )?;
    let _ = ix;
    Ok(())
}

fn merge_shared_one(build: &mut Build, root: &Label, new_prefix: &str) -> Result<(), Error> {
    let root_ix = expect_target(build, root, "cc_shared_library_merge", "a cc_shared_library root")?;
    let pkg = root.package();
    let root_roots = build.get(root_ix).as_target().unwrap().attrs.label_list("roots").to_vec();

    let mut accum = Accum::default();
    let mut visited: IndexSet<Label> = IndexSet::new();
    let mut fg_memo: IndexMap<Label, Vec<Label>> = IndexMap::new();
    for r in &root_roots {
        walk(build, r, &mut accum, &mut visited, &mut fg_memo)?;
    }

    let internal_label = Label::from_parts(
        pkg.external,
        &pkg.repo,
        &pkg.path,
        &format!("{}{}_internal", new_prefix, root.name()),
    );
    let internal_attrs = finalize(accum);
    build.place_under_package(
        &internal_label,
        Node::Target(TargetData {
            label: internal_label.clone(),
            kind: "cc_library".to_string(),
            attrs: internal_attrs,
            generator_name: None,
            generator_function: None,
        }),
    )?;

    let mut new_attrs = build.get(root_ix).as_target().unwrap().attrs.clone();
    new_attrs.insert("roots", AttrValue::LabelList(vec![internal_label]));
    if let Some(AttrValue::String(name)) = new_attrs.get_mut("shared_lib_name") {
        *name = format!("{}{}", new_prefix, name);
    }

    let new_shared_label = Label::from_parts(pkg.external, &pkg.repo, &pkg.path, &format!("{}{}", new_prefix, root.name()));
    let shared_ix = build.place_under_package(
        &new_shared_label,
        Node::Target(TargetData {
            label: new_shared_label.clone(),
            kind: "cc_shared_library".to_string(),
            attrs: new_attrs,
            generator_name: None,
            generator_function: None,
        }),
    )?;
    let _ = shared_ix;

    rewrite_references(build, root, &new_shared_label);
    Ok(())
}

fn expect_target(build: &Build, label: &Label, transformer: &'static str, expected: &str) -> Result<NodeIndex, Error> {
    build
        .resolve_label(label)
        .filter(|&ix| build.get(ix).as_target().is_some())
        .ok_or_else(|| Error::TransformError {
            transformer,
            package: label.package().to_string(),
            group_key: Some(label.as_str().to_string()),
            expected: expected.to_string(),
        })
}

fn walk(
    build: &Build,
    start: &Label,
    accum: &mut Accum,
    visited: &mut IndexSet<Label>,
    fg_memo: &mut IndexMap<Label, Vec<Label>>,
) -> Result<(), Error> {
    let mut queue: VecDeque<Label> = VecDeque::new();
    queue.push_back(start.clone());

    while let Some(label) = queue.pop_front() {
        let resolved = resolve_chain(build, &label)?;
        if !visited.insert(resolved.clone()) {
            continue;
        }

        let Some(ix) = build.resolve_label(&resolved) else {
            accum.deps.insert(resolved);
            continue;
        };

        match build.get(ix) {
            Node::Target(t) if t.kind == "cc_library" => {
                for h in t.attrs.label_list("hdrs") {
                    accum.hdrs.insert(h.clone());
                }
                for s in t.attrs.label_list("srcs") {
                    accum.srcs.insert(s.clone());
                }
                for th in t.attrs.label_list("textual_hdrs") {
                    accum.textual_hdrs.insert(th.clone());
                }
                extend_strings(&t.attrs, "copts", &mut accum.copts);
                extend_strings(&t.attrs, "linkopts", &mut accum.linkopts);
                extend_strings(&t.attrs, "features", &mut accum.features);
                extend_strings(&t.attrs, "includes", &mut accum.includes);
                extend_strings(&t.attrs, "strip_include_prefix", &mut accum.strip_include_prefix);
                for d in t.attrs.label_list("deps") {
                    queue.push_back(d.clone());
                }
            }
            Node::Target(t) if t.kind == "filegroup" => {
                for file in expand_filegroup(build, &resolved, fg_memo) {
                    accum.srcs.insert(file);
                }
            }
            Node::Target(t) => {
                let has_strip_prefix = t.attrs.get("strip_include_prefix").is_some();
                if resolved.is_external() || has_strip_prefix {
                    accum.deps.insert(resolved);
                } else {
                    for d in t.attrs.all_label_refs() {
                        queue.push_back(d.clone());
                    }
                }
            }
            Node::File(_) | Node::Generated(_) => {
                accum.srcs.insert(resolved);
            }
            _ => {}
        }
    }
    Ok(())
}

fn extend_strings(attrs: &crate::attr::AttrBag, name: &str, into: &mut IndexSet<String>) {
    if let Some(values) = attrs.get(name).and_then(AttrValue::as_string_list) {
        into.extend(values.iter().cloned());
    }
}

fn expand_filegroup(build: &Build, label: &Label, memo: &mut IndexMap<Label, Vec<Label>>) -> Vec<Label> {
    if let Some(cached) = memo.get(label) {
        return cached.clone();
    }
    let mut result = Vec::new();
    if let Some(ix) = build.resolve_label(label) {
        if let Some(t) = build.get(ix).as_target() {
            if t.kind == "filegroup" {
                for src in t.attrs.label_list("srcs").to_vec() {
                    result.extend(expand_filegroup(build, &src, memo));
                }
                memo.insert(label.clone(), result.clone());
                return result;
            }
        }
    }
    result.push(label.clone());
    memo.insert(label.clone(), result.clone());
    result
}

fn finalize(mut accum: Accum) -> AttrBag {
    let promote: Vec<Label> = accum
        .textual_hdrs
        .iter()
        .filter(|l| !l.name().ends_with(".md"))
        .cloned()
        .collect();
    for l in &promote {
        accum.textual_hdrs.swap_remove(l);
        accum.hdrs.insert(l.clone());
    }
    accum.srcs.retain(|s| !accum.hdrs.contains(s));

    let mut attrs = AttrBag::new();
    attrs.insert("hdrs", AttrValue::LabelList(sorted(accum.hdrs)));
    attrs.insert("srcs", AttrValue::LabelList(sorted(accum.srcs)));
    attrs.insert("deps", AttrValue::LabelList(sorted(accum.deps)));
    if !accum.textual_hdrs.is_empty() {
        attrs.insert("textual_hdrs", AttrValue::LabelList(sorted(accum.textual_hdrs)));
    }
    attrs.insert("copts", AttrValue::StringList(canonicalize_copts(accum.copts)));
    if !accum.linkopts.is_empty() {
        attrs.insert("linkopts", AttrValue::StringList(sorted_strings(accum.linkopts)));
    }
    if !accum.features.is_empty() {
        attrs.insert("features", AttrValue::StringList(sorted_strings(accum.features)));
    }
    if !accum.includes.is_empty() {
        attrs.insert("includes", AttrValue::StringList(sorted_strings(accum.includes)));
    }
    if !accum.strip_include_prefix.is_empty() {
        attrs.insert(
            "strip_include_prefix",
            AttrValue::StringList(sorted_strings(accum.strip_include_prefix)),
        );
    }
    attrs
}

fn canonicalize_copts(copts: IndexSet<String>) -> Vec<String> {
    let mut values: Vec<String> = copts.into_iter().collect();
    if values.iter().any(|c| c == "-fexceptions") {
        values.retain(|c| c != "-fno-exceptions");
    }
    for c in values.iter_mut() {
        if c == "-O3" {
            *c = "-O2".to_string();
        }
    }
    let deduped: IndexSet<String> = values.into_iter().collect();
    sorted_strings(deduped)
}

fn sorted(set: IndexSet<Label>) -> Vec<Label> {
    let mut v: Vec<Label> = set.into_iter().collect();
    v.sort();
    v
}

fn sorted_strings(set: IndexSet<String>) -> Vec<String> {
    let mut v: Vec<String> = set.into_iter().collect();
    v.sort();
    v
}

/// Globally replaces every reference to `old` with `new` across every live target's attrs.
fn rewrite_references(build: &mut Build, old: &Label, new: &Label) {
    let ixs: Vec<NodeIndex> = build.targets().map(|(ix, _)| ix).collect();
    for ix in ixs {
        if let Node::Target(t) = build.get_mut(ix) {
            for label_mut in t.attrs.all_label_refs_mut() {
                if *label_mut == *old {
                    *label_mut = new.clone();
                }
            }
        }
    }
}
