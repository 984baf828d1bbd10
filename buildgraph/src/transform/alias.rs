// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alias Elision (spec module §4.8.A): follow every `alias` target's `actual` attribute
//! transitively to a non-alias terminal, then rewrite every edge (and every `genrule`/
//! `_local_genrule_internal` `cmd` string) that pointed at the alias to point at the terminal
//! instead.

use crate::attr::AttrValue;
use crate::label::Label;
use crate::model::{Build, Node, NodeIndex};
use crate::transform::Transformer;
use crate::Error;
use indexmap::{IndexMap, IndexSet};

pub struct AliasElision;

impl Transformer for AliasElision {
    fn name(&self) -> &'static str {
        "alias_elision"
    }

    fn apply(&self, build: &mut Build) -> Result<(), Error> {
        let mut referenced: IndexSet<Label> = IndexSet::new();
        for (_, target) in build.targets() {
            referenced.extend(target.attrs.all_label_refs().into_iter().cloned());
        }

        let mut resolved: IndexMap<Label, Label> = IndexMap::new();
        for label in &referenced {
            let terminal = resolve_chain(build, label)?;
            if terminal != *label {
                resolved.insert(label.clone(), terminal);
            }
        }
        if resolved.is_empty() {
            return Ok(());
        }

        let target_ixs: Vec<NodeIndex> = build.targets().map(|(ix, _)| ix).collect();
        for ix in target_ixs {
            if let Node::Target(target) = build.get_mut(ix) {
                for label_mut in target.attrs.all_label_refs_mut() {
                    if let Some(new_label) = resolved.get(label_mut) {
                        *label_mut = new_label.clone();
                    }
                }
                if let Some(AttrValue::String(cmd)) = target.attrs.get_mut("cmd") {
                    for (old, new) in &resolved {
                        if cmd.contains(old.as_str()) {
                            *cmd = cmd.replace(old.as_str(), new.as_str());
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Follows `actual` from `start` until a non-`alias` target (or an unresolvable/external label,
/// left as-is) is reached. A label that cycles back on itself through a chain of aliases is a
/// `TransformError`, since there's no terminal to rewrite to.
pub(crate) fn resolve_chain(build: &Build, start: &Label) -> Result<Label, Error> {
    let mut current = start.clone();
    let mut seen: IndexSet<Label> = IndexSet::new();

    loop {
        if !seen.insert(current.clone()) {
            return Err(Error::TransformError {
                transformer: "alias_elision",
                package: current.package().to_string(),
                group_key: None,
                expected: "a terminal non-alias target (found an alias cycle)".to_string(),
            });
        }

        let Some(ix) = build.resolve_label(&current) else {
            return Ok(current);
        };
        let Some(target) = build.get(ix).as_target() else {
            return Ok(current);
        };
        if target.kind != "alias" {
            return Ok(current);
        }
        match target.attrs.get("actual").and_then(AttrValue::as_label) {
            Some(next) => current = next.clone(),
            None => return Ok(current),
        }
    }
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
    fn elides_alias_in_a_dep_and_in_a_cmd_string() {
        let mut build = build_with(
            r#"
alias(
  name = "al",
  actual = "//x:real",
)
# /repo/p/BUILD:1:1

genrule(
  name = "g",
  srcs = [],
  tools = ["//p:al"],
  cmd = "$(location //p:al) > $@",
)
# /repo/p/BUILD:2:1

cc_library(
  name = "real",
  srcs = [],
)
# /repo/x/BUILD:1:1
"#,
        );

        AliasElision.apply(&mut build).unwrap();

        let g = build
            .resolve_label(&Label::parse("//p:g").unwrap())
            .unwrap();
        let target = build.get(g).as_target().unwrap();
        let tools = target.attrs.label_list("tools");
        assert_eq!(tools[0].as_str(), "//x:real");
        let cmd = match target.attrs.get("cmd").unwrap() {
            AttrValue::String(s) => s,
            _ => panic!("cmd should be a string"),
        };
        assert!(cmd.contains("//x:real"));
        assert!(!cmd.contains("//p:al"));
    }

    #[test]
    fn is_idempotent() {
        let mut build = build_with(
            r#"
alias(
  name = "al",
  actual = "//x:real",
)
# /repo/p/BUILD:1:1

cc_library(
  name = "user",
  srcs = [],
  deps = ["//p:al"],
)
# /repo/p/BUILD:2:1

cc_library(
  name = "real",
  srcs = [],
)
# /repo/x/BUILD:1:1
"#,
        );

        AliasElision.apply(&mut build).unwrap();
        let after_first: Vec<_> = build
            .targets()
            .map(|(_, t)| (t.label.as_str().to_string(), t.attrs.label_list("deps").to_vec()))
            .collect();

        AliasElision.apply(&mut build).unwrap();
        let after_second: Vec<_> = build
            .targets()
            .map(|(_, t)| (t.label.as_str().to_string(), t.attrs.label_list("deps").to_vec()))
            .collect();

        assert_eq!(after_first, after_second);
    }
}
