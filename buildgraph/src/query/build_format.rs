// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser for `query deps --output=build` text (spec module §4.3, first algorithm).
//!
//! The format is a sequence of rule blocks separated by one or more blank lines, each of the
//! shape:
//!
//! ```text
//! cc_library(
//!   name = "foo",
//!   srcs = ["foo.cc"],
//!   hdrs = ["foo.h"],
//!   deps = [":bar", "//other:baz"],
//! )
//! # /repo_root/some/pkg/BUILD.bazel:3:1
//! ```
//!
//! The trailing `# <path>/BUILD[.bazel]:<line>:<col>` comment (its position relative to the
//! parenthesized body varies by tool and version, so we search the whole block for it rather than
//! assuming it leads) gives us the owning package once `prefix_path` is stripped off the front.

use crate::attr::AttrValue;
use crate::catalog::{AttrBucket, Catalog};
use crate::errors::UnknownRule;
use crate::label::Label;
use crate::Error;
use indexmap::IndexMap;

/// One parsed rule instance, not yet attached to any package tree.
#[derive(Clone, Debug)]
pub struct ParsedTarget {
    pub label: Label,
    pub kind: String,
    pub attrs: IndexMap<String, AttrValue>,
    pub generator_name: Option<String>,
    pub generator_function: Option<String>,
    /// Labels of declared outputs (from `out_label`/`out_label_list` attributes and from the
    /// schema's templated `outputs`), each of which becomes a `GeneratedFileNode` owned by this
    /// target.
    pub generated: Vec<Label>,
}

/// Everything produced by one pass over a `--output=build` blob.
#[derive(Clone, Debug, Default)]
pub struct ParsedBuildOutput {
    pub targets: IndexMap<String, ParsedTarget>,
    pub unknown_rules: Vec<UnknownRule>,
}

/// Parses a full `query deps --output=build` text blob.
///
/// `prefix_path` is the absolute (or tool-relative) path to the monorepo checkout root; it's
/// stripped from each block's source comment to recover the package path.
pub fn parse_build_output(
    text: &str,
    catalog: &Catalog,
    prefix_path: &str,
) -> Result<ParsedBuildOutput, Error> {
    let mut out = ParsedBuildOutput::default();

    for block in split_blocks(text) {
        if block.trim().is_empty() {
            continue;
        }
        let Some((kind, body)) = split_header(&block) else {
            continue;
        };
        if catalog.is_ignored(kind) {
            continue;
        }

        let package = extract_package(&block, prefix_path);

        let Some(schema) = catalog.get(kind) else {
            out.unknown_rules.push(UnknownRule {
                kind: kind.to_string(),
                package: package.clone(),
            });
            continue;
        };

        let assignments = split_assignments(body);
        let name = assignments
            .iter()
            .find(|(k, _)| k == "name")
            .map(|(_, v)| strip_quotes(v))
            .ok_or_else(|| Error::InvalidLabel(format!("{} block missing name=", kind)))?;

        if is_incompatible(&assignments) {
            continue;
        }

        let label = match &package {
            Some(pkg) => Label::from_parts(false, "", pkg, &name),
            None if kind == "bind" => Label::from_parts(false, "", "external", &name),
            // A block with no owning-package comment and not a `bind` is an external node (e.g.
            // a bare `protobuf` rule pulled in from a `WORKSPACE`-level macro) -- skip just this
            // block rather than failing the whole parse.
            None => continue,
        };

        let mut attrs = IndexMap::new();
        let mut generated = Vec::new();
        for (attr_name, raw) in &assignments {
            if attr_name == "name" || attr_name == "generator_name" || attr_name == "generator_function" {
                continue;
            }
            let Some(bucket) = schema.bucket_of(attr_name) else {
                continue;
            };
            let value = parse_value(bucket, raw)?;
            match &value {
                AttrValue::OutLabel(l) => generated.push(l.clone()),
                AttrValue::OutLabelList(ls) => generated.extend(ls.iter().cloned()),
                _ => {}
            }
            attrs.insert(attr_name.to_string(), value);
        }

        for template in schema.outputs_templates() {
            let out_name = template.replace("{name}", &name);
            let out_label = match &label.parent() {
                crate::label::Addr::Package(pkg) => {
                    Label::from_parts(pkg.external, &pkg.repo, &pkg.path, &out_name)
                }
                _ => unreachable!(),
            };
            generated.push(out_label);
        }

        let generator_name = assignments
            .iter()
            .find(|(k, _)| k == "generator_name")
            .map(|(_, v)| strip_quotes(v));
        let generator_function = assignments
            .iter()
            .find(|(k, _)| k == "generator_function")
            .map(|(_, v)| strip_quotes(v));

        out.targets.insert(
            label.as_str().to_string(),
            ParsedTarget {
                label,
                kind: kind.to_string(),
                attrs,
                generator_name,
                generator_function,
                generated,
            },
        );
    }

    Ok(out)
}

fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                blocks.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.trim().is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Splits a block into `(rule_kind, body)` where `body` is the text strictly between the rule's
/// opening and closing parentheses. Returns `None` if the block has no recognizable `kind(` head
/// (e.g. it's a bare comment line between rules).
fn split_header(block: &str) -> Option<(&str, &str)> {
    let open = block.find('(')?;
    let kind = block[..open].trim();
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let close = find_matching_close(block, open)?;
    Some((kind, &block[open + 1..close]))
}

fn find_matching_close(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = open;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if c == '\\' {
                i += 1;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            match c {
                '"' => in_string = true,
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Splits a rule body into `(attr_name, raw_value)` pairs, joining continuation lines by tracking
/// bracket depth so that multi-line lists and maps are handled the same as single-line ones.
fn split_assignments(body: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let bytes = body.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        // Skip whitespace/commas between assignments.
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] as char == ',' {
            i += 1;
            continue;
        }
        let name_start = i;
        while i < bytes.len() && bytes[i] as char != '=' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let name = body[name_start..i].trim().to_string();
        i += 1; // skip '='
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        let value_start = i;
        let mut depth = 0i32;
        let mut in_string = false;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if in_string {
                if c == '\\' {
                    i += 1;
                } else if c == '"' {
                    in_string = false;
                }
            } else {
                match c {
                    '"' => in_string = true,
                    '[' | '{' => depth += 1,
                    ']' | '}' => depth -= 1,
                    ',' if depth == 0 => break,
                    _ => {}
                }
            }
            i += 1;
        }
        let value = body[value_start..i].trim().to_string();
        if !name.is_empty() {
            out.push((name, value));
        }
        if i < bytes.len() {
            i += 1; // skip the trailing comma
        }
    }
    out
}

fn parse_value(bucket: AttrBucket, raw: &str) -> Result<AttrValue, Error> {
    Ok(match bucket {
        AttrBucket::Label => AttrValue::Label(Label::parse(strip_quotes(raw))?),
        AttrBucket::OutLabel => AttrValue::OutLabel(Label::parse(strip_quotes(raw))?),
        AttrBucket::LabelList => {
            let mut labels = Vec::new();
            for item in split_list(raw) {
                labels.push(Label::parse(item)?);
            }
            AttrValue::LabelList(labels)
        }
        AttrBucket::OutLabelList => {
            let mut labels = Vec::new();
            for item in split_list(raw) {
                labels.push(Label::parse(item)?);
            }
            AttrValue::OutLabelList(labels)
        }
        AttrBucket::String => AttrValue::String(strip_quotes(raw)),
        AttrBucket::StringList => {
            AttrValue::StringList(split_list(raw).into_iter().map(|s| s.to_string()).collect())
        }
        AttrBucket::Bool => AttrValue::Bool(matches!(raw.trim(), "True" | "true" | "1")),
        AttrBucket::Int => AttrValue::Int(raw.trim().parse().unwrap_or(0)),
        AttrBucket::StrStrMap => {
            let mut map = IndexMap::new();
            for entry in split_list(raw) {
                if let Some((k, v)) = entry.split_once(':') {
                    map.insert(strip_quotes(k), strip_quotes(v));
                }
            }
            AttrValue::StrStrMap(map)
        }
    })
}

/// Splits a bracketed `[...]` (or braced `{...}`) list body into trimmed, still-quoted items.
fn split_list(raw: &str) -> Vec<&str> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .or_else(|| trimmed.strip_prefix('{'))
        .unwrap_or(trimmed);
    let inner = inner
        .strip_suffix(']')
        .or_else(|| inner.strip_suffix('}'))
        .unwrap_or(inner);

    let mut items = Vec::new();
    let bytes = inner.as_bytes();
    let mut i = 0usize;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut start = 0usize;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if c == '\\' {
                i += 1;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            match c {
                '"' => in_string = true,
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                ',' if depth == 0 => {
                    let item = inner[start..i].trim();
                    if !item.is_empty() {
                        items.push(item);
                    }
                    start = i + 1;
                }
                _ => {}
            }
        }
        i += 1;
    }
    let tail = inner[start..].trim();
    if !tail.is_empty() {
        items.push(tail);
    }
    items
}

fn strip_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .replace("\\\"", "\"")
}

/// Detects `target_compatible_with = ["@platforms//:incompatible"]`, which marks a target as
/// unbuildable on the host platform; such targets are dropped outright rather than parsed.
fn is_incompatible(assignments: &[(String, String)]) -> bool {
    assignments.iter().any(|(k, v)| {
        k == "target_compatible_with" && {
            let items = split_list(v);
            items.len() == 1 && strip_quotes(items[0]) == "@platforms//:incompatible"
        }
    })
}

/// Extracts the owning package from a block's source comment, `# <prefix_path>/<package>/BUILD[.bazel]:...`.
/// Returns `None` if no such comment is present (an external block, or one the source tool didn't
/// annotate).
fn extract_package(block: &str, prefix_path: &str) -> Option<String> {
    let prefix = prefix_path.trim_end_matches('/');
    for line in block.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('#') else {
            continue;
        };
        let rest = rest.trim();
        let Some(path) = rest.split(':').next() else {
            continue;
        };
        let Some(stripped) = path.strip_prefix(prefix) else {
            continue;
        };
        let stripped = stripped.trim_start_matches('/');
        for suffix in ["/BUILD.bazel", "/BUILD"] {
            if let Some(pkg) = stripped.strip_suffix(suffix) {
                return Some(pkg.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::base()
    }

    #[test]
    fn parses_a_simple_cc_library_block() {
        let text = r#"
cc_library(
  name = "foo",
  srcs = ["foo.cc"],
  hdrs = ["foo.h"],
  deps = [":bar", "//other:baz"],
)
# /repo/pkg/BUILD.bazel:3:1
"#;
        let out = parse_build_output(text, &catalog(), "/repo").unwrap();
        assert_eq!(out.unknown_rules, vec![]);
        let target = out.targets.get("//pkg:foo").expect("foo parsed");
        assert_eq!(target.kind, "cc_library");
        let deps = target.attrs.get("deps").unwrap().as_label_list().unwrap();
        assert_eq!(deps[0].as_str(), "//pkg:bar");
        assert_eq!(deps[1].as_str(), "//other:baz");
    }

    #[test]
    fn genrule_outs_become_generated_labels() {
        let text = r#"
genrule(
  name = "gen",
  srcs = [],
  outs = ["gen.h"],
  cmd = "touch $@",
)
# /repo/pkg/BUILD:1:1
"#;
        let out = parse_build_output(text, &catalog(), "/repo").unwrap();
        let target = out.targets.get("//pkg:gen").unwrap();
        assert_eq!(target.generated.len(), 1);
        assert_eq!(target.generated[0].as_str(), "//pkg:gen.h");
    }

    #[test]
    fn unknown_rule_kind_is_recorded_not_fatal() {
        let text = r#"
some_future_rule(
  name = "x",
)
# /repo/pkg/BUILD:1:1
"#;
        let out = parse_build_output(text, &catalog(), "/repo").unwrap();
        assert!(out.targets.is_empty());
        assert_eq!(out.unknown_rules.len(), 1);
        assert_eq!(out.unknown_rules[0].kind, "some_future_rule");
        assert_eq!(out.unknown_rules[0].package.as_deref(), Some("pkg"));
    }

    #[test]
    fn ignored_rule_kind_is_silently_skipped() {
        let text = r#"
package(
  default_visibility = ["//visibility:public"],
)
"#;
        let out = parse_build_output(text, &catalog(), "/repo").unwrap();
        assert!(out.targets.is_empty());
        assert!(out.unknown_rules.is_empty());
    }

    #[test]
    fn incompatible_target_is_dropped() {
        let text = r#"
cc_library(
  name = "only_linux",
  srcs = [],
  target_compatible_with = ["@platforms//:incompatible"],
)
# /repo/pkg/BUILD:1:1
"#;
        let out = parse_build_output(text, &catalog(), "/repo").unwrap();
        assert!(out.targets.is_empty());
    }

    #[test]
    fn non_bind_rule_without_package_comment_is_dropped_not_fatal() {
        let text = r#"
cc_library(
  name = "some_external",
  srcs = [],
)
"#;
        let out = parse_build_output(text, &catalog(), "/repo").unwrap();
        assert!(out.targets.is_empty());
        assert!(out.unknown_rules.is_empty());
    }

    #[test]
    fn bind_without_package_comment_uses_virtual_external_package() {
        let text = r#"
bind(
  name = "some_external",
  actual = "@other//:thing",
)
"#;
        let out = parse_build_output(text, &catalog(), "/repo").unwrap();
        let target = out.targets.get("//external:some_external").unwrap();
        assert_eq!(target.kind, "bind");
    }
}
