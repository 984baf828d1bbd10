// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transformer stack (spec module §4.8): graph-rewriting passes composed into a fixed,
//! semantically-significant chain.
//!
//! Per spec module §9 ("Transformer chain vs. duck-typed visitor"), each transformer is just a
//! function `(graph) -> graph`; there's no visitor hierarchy to extend, only a plain sequence. A
//! chain runs each transformer in order and re-validates the DAG invariant (no cycles) after every
//! stage, so a rewrite bug surfaces at the stage that introduced it rather than downstream.

pub mod alias;
pub mod cc_merge;
pub mod exports;
pub mod header_only;
pub mod macro_collapse;
pub mod prune_unreachable;

use crate::graph::dag::TargetDag;
use crate::model::Build;
use crate::Error;

/// A single graph-rewriting pass. Implementors mutate `build` in place.
pub trait Transformer {
    /// A short, stable name used in `TransformError` diagnostics.
    fn name(&self) -> &'static str;

    fn apply(&self, build: &mut Build) -> Result<(), Error>;
}

/// Runs a fixed chain of transformers in order, checking the DAG invariant after each one.
///
/// The order is significant (alias elision must precede anything that reads `deps` structurally;
/// macro collapse must precede the cc_library merger so there's nothing private left to merge
/// around; pruning runs last) -- callers assemble the chain explicitly rather than this function
/// picking an order itself.
pub fn run_chain(build: &mut Build, chain: &[Box<dyn Transformer>]) -> Result<(), Error> {
    for transformer in chain {
        transformer.apply(build)?;
        TargetDag::build_full(build)?;
    }
    Ok(())
}
