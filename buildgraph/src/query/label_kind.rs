// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser for `query deps --output=label_kind` text (spec module §4.3, second algorithm).
//!
//! This format is much terser than `--output=build`: one line per target, of the shape
//!
//! ```text
//! source file //pkg:foo.cc
//! cc_library rule //pkg:foo
//! ```
//!
//! It carries no attribute data, only enough to confirm a label exists and classify it by kind.
//! The collector uses it to materialize `FileNode`s for `source` entries and to distinguish a
//! genuinely unresolvable ("alien") label from one that simply hasn't been queried with
//! `--output=build` yet.

use crate::label::Label;
use crate::Error;
use indexmap::IndexMap;

/// One line of `--output=label_kind` text.
#[derive(Clone, Debug)]
pub struct LabelKindEntry {
    pub kind: String,
    pub label: Label,
}

/// The parsed contents of a `--output=label_kind` blob, grouped by kind.
///
/// Groups are ordered by descending size (ties broken by first appearance), matching the order
/// the source tool reports them in when summarizing a query.
#[derive(Clone, Debug, Default)]
pub struct ParsedLabelKind {
    pub kinds: IndexMap<String, Vec<Label>>,
}

impl ParsedLabelKind {
    pub fn sources(&self) -> impl Iterator<Item = &Label> {
        self.kinds.get("source").into_iter().flatten()
    }

    pub fn all_entries(&self) -> impl Iterator<Item = (&str, &Label)> {
        self.kinds
            .iter()
            .flat_map(|(kind, labels)| labels.iter().map(move |label| (kind.as_str(), label)))
    }
}

pub fn parse_label_kind_output(text: &str) -> Result<ParsedLabelKind, Error> {
    let mut kinds: IndexMap<String, Vec<Label>> = IndexMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry = parse_line(line)?;
        kinds.entry(entry.kind).or_default().push(entry.label);
    }

    let mut pairs: Vec<(String, Vec<Label>)> = kinds.into_iter().collect();
    pairs.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    let kinds = pairs.into_iter().collect();

    Ok(ParsedLabelKind { kinds })
}

/// Parses a single `<kind> <klass> <label> [(<location>)]` line. `<klass>` (`rule` or `file`) is
/// not retained -- the kind alone (`source`, `cc_library`, ...) is what callers discriminate on.
fn parse_line(line: &str) -> Result<LabelKindEntryInternal, Error> {
    let mut parts = line.splitn(3, ' ');
    let kind = parts
        .next()
        .ok_or_else(|| Error::InvalidLabel(line.to_string()))?;
    let _klass = parts
        .next()
        .ok_or_else(|| Error::InvalidLabel(line.to_string()))?;
    let remainder = parts
        .next()
        .ok_or_else(|| Error::InvalidLabel(line.to_string()))?;
    let label_str = remainder.split_whitespace().next().unwrap_or(remainder);
    let label = Label::parse(label_str)?;
    Ok(LabelKindEntryInternal {
        kind: kind.to_string(),
        label,
    })
}

type LabelKindEntryInternal = LabelKindEntry;

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn classifies_source_and_rule_lines() {
        let text = "\
source file //pkg:foo.cc
cc_library rule //pkg:foo
source file //pkg:bar.cc
source file //pkg:baz.cc
";
        let parsed = parse_label_kind_output(text).unwrap();
        assert_eq!(parsed.kinds.get("source").unwrap().len(), 3);
        assert_eq!(parsed.kinds.get("cc_library").unwrap().len(), 1);
        // Groups are ordered by descending size: "source" (3) before "cc_library" (1).
        let first_kind = parsed.kinds.keys().next().unwrap();
        assert_eq!(first_kind, "source");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_label_kind_output("not enough fields").is_err());
    }
}
