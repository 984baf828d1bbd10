// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The collector: drives repeated `query deps` calls until every internal, non-excluded label
//! referenced by a collected target has itself been collected (spec module §4.4).
//!
//! Subprocess invocation of the external build tool is explicitly out of core scope (see
//! `SPEC_FULL.md`); callers supply a [`QueryRunner`] implementation instead, the same shape as
//! `guppy`'s `MetadataCommand` taking the place of an actual `cargo metadata` invocation.

use crate::errors::UnknownRule;
use crate::label::Label;
use crate::model::{Build, FileData, Node};
use crate::query::{build_format, label_kind};
use crate::Error;
use indexmap::{IndexMap, IndexSet};
use std::error;

/// The `--output` format the collector asks a [`QueryRunner`] to produce.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    Build,
    LabelKind,
}

/// Ambient collaborator: actually runs `query deps` against the monorepo checkout, however that
/// happens to be invoked (subprocess, RPC, a cached fixture in tests).
pub trait QueryRunner {
    fn query_deps(
        &mut self,
        targets: &[String],
        excluded: &[String],
        output: OutputFormat,
    ) -> Result<String, Box<dyn error::Error + Send + Sync>>;
}

/// Configuration controlling how aggressively the collector chases unresolved references.
#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// Absolute path to the monorepo checkout root, used to recover package paths from
    /// `--output=build` source comments.
    pub prefix_path: String,
    /// Package-path prefixes the caller has declared out of scope: targets under these are left
    /// as stubs rather than chased or reported as alien.
    pub excluded_prefixes: Vec<String>,
    /// Safety valve against a reference cycle in unresolved labels that never converges.
    pub max_iterations: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            prefix_path: String::new(),
            excluded_prefixes: Vec::new(),
            max_iterations: 64,
        }
    }
}

/// Per-kind counts of what ended up in the graph after collection -- a supplement over the
/// original tool, which never reported collection statistics to the caller.
#[derive(Clone, Debug, Default)]
pub struct CollectionStats {
    pub targets_by_kind: IndexMap<String, usize>,
    pub files: usize,
    pub generated_files: usize,
    pub stubs_remaining: usize,
}

/// Outcome of a full collection run.
#[derive(Clone, Debug, Default)]
pub struct CollectionReport {
    pub unknown_rules: Vec<UnknownRule>,
    pub iterations: usize,
    pub stats: CollectionStats,
}

/// Drives [`QueryRunner`] calls to saturation and merges every response into a [`Build`].
pub struct Collector<'a> {
    build: &'a mut Build,
    config: CollectorConfig,
}

impl<'a> Collector<'a> {
    pub fn new(build: &'a mut Build, config: CollectorConfig) -> Self {
        Self { build, config }
    }

    pub fn run(
        &mut self,
        runner: &mut dyn QueryRunner,
        initial_targets: &[String],
    ) -> Result<CollectionReport, Error> {
        let mut unknown_rules = Vec::new();
        let mut frontier: Vec<String> = initial_targets.to_vec();
        let mut seen_frontier: IndexSet<String> = frontier.iter().cloned().collect();
        let mut iterations = 0usize;

        while !frontier.is_empty() {
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(Error::InternalError(format!(
                    "collector did not converge after {} iterations",
                    self.config.max_iterations
                )));
            }

            let text = runner
                .query_deps(&frontier, &self.config.excluded_prefixes, OutputFormat::Build)
                .map_err(|e| Error::InternalError(e.to_string()))?;
            let parsed =
                build_format::parse_build_output(&text, self.build.catalog(), &self.config.prefix_path)?;
            unknown_rules.extend(parsed.unknown_rules);
            self.merge_build_targets(parsed.targets)?;

            let label_text = runner
                .query_deps(&frontier, &self.config.excluded_prefixes, OutputFormat::LabelKind)
                .map_err(|e| Error::InternalError(e.to_string()))?;
            let label_kinds = label_kind::parse_label_kind_output(&label_text)?;
            self.materialize_sources(&label_kinds);

            let unresolved = self.unresolved_internal_labels();
            frontier = unresolved
                .into_iter()
                .filter(|l| seen_frontier.insert(l.clone()))
                .collect();
        }

        self.check_remaining_stubs()?;

        Ok(CollectionReport {
            unknown_rules,
            iterations,
            stats: self.stats(),
        })
    }

    /// Inserts (or promotes stub versions of) every parsed target via the package tree builder,
    /// which also stubs out every label they reference that isn't live yet.
    fn merge_build_targets(
        &mut self,
        targets: IndexMap<String, build_format::ParsedTarget>,
    ) -> Result<(), Error> {
        crate::tree::place_parsed_targets(self.build, targets)?;
        Ok(())
    }

    /// Turns every `source`-kind entry from a `label_kind` response into a `FileNode`, if it
    /// isn't already represented some other way.
    ///
    /// A source label collected this same iteration already exists as a stub `TargetNode` --
    /// `place_parsed_targets`'s own stubbing pass runs first and has no way to know a label it
    /// hasn't seen a `label_kind` line for yet is a file rather than an unqueried target -- so a
    /// stub is promoted in place via `replace` rather than skipped outright.
    fn materialize_sources(&mut self, parsed: &label_kind::ParsedLabelKind) {
        for label in parsed.sources() {
            match self.build.resolve_label(label) {
                Some(ix) if matches!(self.build.get(ix).as_target(), Some(t) if t.is_stub()) => {
                    self.build.replace(
                        label.as_str(),
                        Node::File(FileData {
                            label: label.clone(),
                        }),
                    );
                }
                Some(_) => {}
                None => {
                    let _ = self.build.place_under_package(
                        label,
                        Node::File(FileData {
                            label: label.clone(),
                        }),
                    );
                }
            }
        }
    }

    /// Labels that are stubs, internal (not `@`-prefixed), and not under an excluded prefix: the
    /// set the next query iteration needs to chase.
    fn unresolved_internal_labels(&self) -> Vec<String> {
        self.build
            .targets()
            .filter(|(_, t)| t.is_stub())
            .map(|(_, t)| &t.label)
            .filter(|label| !label.is_external())
            .filter(|label| !self.is_excluded(label))
            .map(|label| label.as_str().to_string())
            .collect()
    }

    /// A label is excluded if its package path equals, or falls strictly under, one of the
    /// configured excluded prefixes. Comparing with `starts_with` alone would also match an
    /// unrelated sibling package that merely shares a prefix (`foo` matching `foobar`); the
    /// trailing-slash / exact-match check here is the fix for that.
    fn is_excluded(&self, label: &Label) -> bool {
        let path = label.package_path();
        self.config.excluded_prefixes.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            path == prefix || path.starts_with(&format!("{}/", prefix))
        })
    }

    /// After the frontier has been exhausted, any remaining internal, non-excluded stub is
    /// "alien": referenced, but never resolvable from the targets the caller asked for. This is
    /// fatal, since every downstream stage assumes a saturated graph.
    fn check_remaining_stubs(&self) -> Result<(), Error> {
        let mut alien: IndexMap<String, Vec<String>> = IndexMap::new();
        for (_, target) in self.build.targets() {
            if !target.is_stub() || target.label.is_external() || self.is_excluded(&target.label) {
                continue;
            }
            let referrers = alien.entry(target.label.as_str().to_string()).or_default();
            for (_, referrer) in self.build.targets() {
                if referrer.attrs.all_label_refs().iter().any(|l| **l == target.label) {
                    referrers.push(referrer.label.as_str().to_string());
                }
            }
        }

        if alien.is_empty() {
            return Ok(());
        }

        Err(Error::UnresolvedTargets(
            alien
                .into_iter()
                .map(|(label, referrers)| crate::errors::UnresolvedTarget { label, referrers })
                .collect(),
        ))
    }

    pub fn stats(&self) -> CollectionStats {
        let mut targets_by_kind = IndexMap::new();
        let mut files = 0;
        let mut generated_files = 0;
        let mut stubs_remaining = 0;

        for ix in self.build.all_live_indices() {
            match self.build.get(ix) {
                Node::Target(t) => {
                    if t.is_stub() {
                        stubs_remaining += 1;
                    } else {
                        *targets_by_kind.entry(t.kind.clone()).or_insert(0) += 1;
                    }
                }
                Node::File(_) => files += 1,
                Node::Generated(_) => generated_files += 1,
                _ => {}
            }
        }

        CollectionStats {
            targets_by_kind,
            files,
            generated_files,
            stubs_remaining,
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    struct FixtureRunner {
        build_responses: Vec<String>,
        label_kind_responses: Vec<String>,
        call: usize,
    }

    impl QueryRunner for FixtureRunner {
        fn query_deps(
            &mut self,
            _targets: &[String],
            _excluded: &[String],
            output: OutputFormat,
        ) -> Result<String, Box<dyn error::Error + Send + Sync>> {
            let idx = self.call;
            Ok(match output {
                OutputFormat::Build => self.build_responses[idx].clone(),
                OutputFormat::LabelKind => {
                    let text = self.label_kind_responses[idx].clone();
                    self.call += 1;
                    text
                }
            })
        }
    }

    #[test]
    fn converges_on_a_single_iteration_with_no_unresolved_deps() {
        let mut build = Build::new(crate::catalog::Catalog::base());
        let mut collector = Collector::new(
            &mut build,
            CollectorConfig {
                prefix_path: "/repo".into(),
                ..Default::default()
            },
        );
        let mut runner = FixtureRunner {
            build_responses: vec![r#"
cc_library(
  name = "foo",
  srcs = ["foo.cc"],
)
# /repo/pkg/BUILD:1:1
"#
            .to_string()],
            label_kind_responses: vec!["source file //pkg:foo.cc\ncc_library rule //pkg:foo\n".to_string()],
            call: 0,
        };

        let report = collector.run(&mut runner, &["//pkg:foo".to_string()]).unwrap();
        assert_eq!(report.iterations, 1);
        assert_eq!(report.stats.stubs_remaining, 0);
        assert_eq!(*report.stats.targets_by_kind.get("cc_library").unwrap(), 1);
    }

    #[test]
    fn excluded_prefix_is_not_reported_as_alien() {
        let mut build = Build::new(crate::catalog::Catalog::base());
        let mut collector = Collector::new(
            &mut build,
            CollectorConfig {
                prefix_path: "/repo".into(),
                excluded_prefixes: vec!["third_party".to_string()],
                ..Default::default()
            },
        );
        let mut runner = FixtureRunner {
            build_responses: vec![r#"
cc_library(
  name = "foo",
  srcs = [],
  deps = ["//third_party/zlib:zlib"],
)
# /repo/pkg/BUILD:1:1
"#
            .to_string()],
            label_kind_responses: vec!["cc_library rule //pkg:foo\n".to_string()],
            call: 0,
        };

        let report = collector.run(&mut runner, &["//pkg:foo".to_string()]).unwrap();
        assert_eq!(report.stats.stubs_remaining, 1);
    }
}
