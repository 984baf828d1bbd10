// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors `buildgraph` methods can return.

use crate::label::Label;
use std::error;
use std::fmt;

use Error::*;

/// Error type describing the sorts of errors `buildgraph` can return.
///
/// Every variant here corresponds to one of the fatal error classes in the error-handling design:
/// parse errors, collection errors, graph errors and transformer errors all terminate the run
/// with a single diagnostic. `UnknownRule` is the only recoverable class -- see
/// [`crate::query::ParsedBuildOutput::unknown_rules`].
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A label string did not match the canonical `[@]<repo>//<package-path>:<name>` shape.
    InvalidLabel(String),
    /// The collector's stub closure contained targets that are neither external, legitimately
    /// excluded, nor resolvable: "alien" targets.
    UnresolvedTargets(Vec<UnresolvedTarget>),
    /// A cycle was found while walking the target DAG.
    CycleDetected(Vec<Label>),
    /// Two nodes in the forest were inserted under the same label.
    LabelCollision(String),
    /// A transformer encountered an invariant violation it cannot recover from.
    TransformError {
        /// Name of the transformer that failed.
        transformer: &'static str,
        /// The package being processed when the failure occurred.
        package: String,
        /// The generator-function/generator-name group key, if applicable.
        group_key: Option<String>,
        /// What the transformer expected but didn't find.
        expected: String,
    },
    /// An internal invariant of the graph was violated.
    InternalError(String),
}

/// One target that the collector could not resolve: neither external, nor under an excluded
/// prefix, nor materializable from the `label_kind` source group.
#[derive(Debug, Clone)]
pub struct UnresolvedTarget {
    /// The label that remained a stub.
    pub label: String,
    /// The labels of targets that reference this stub.
    pub referrers: Vec<String>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidLabel(s) => write!(f, "invalid label: '{}'", s),
            UnresolvedTargets(targets) => {
                writeln!(f, "unresolved targets:")?;
                for target in targets {
                    write!(f, "  {} (referenced by: ", target.label)?;
                    for (i, referrer) in target.referrers.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", referrer)?;
                    }
                    writeln!(f, ")")?;
                }
                Ok(())
            }
            CycleDetected(path) => {
                write!(f, "cycle detected: ")?;
                for (i, label) in path.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{}", label)?;
                }
                Ok(())
            }
            LabelCollision(label) => write!(f, "label collision on insert: {}", label),
            TransformError {
                transformer,
                package,
                group_key,
                expected,
            } => write!(
                f,
                "{}: in package '{}'{}: expected {}",
                transformer,
                package,
                group_key
                    .as_ref()
                    .map(|k| format!(" (group '{}')", k))
                    .unwrap_or_default(),
                expected,
            ),
            InternalError(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl error::Error for Error {}

/// A non-fatal warning produced while parsing `query deps --output=build` text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownRule {
    /// The unrecognized rule kind.
    pub kind: String,
    /// The package the block appeared under, if one could be determined.
    pub package: Option<String>,
}

impl fmt::Display for UnknownRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(pkg) => write!(f, "unknown rule kind '{}' in package '{}'", self.kind, pkg),
            None => write!(f, "unknown rule kind '{}'", self.kind),
        }
    }
}
