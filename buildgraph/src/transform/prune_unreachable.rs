// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unreachable Target Removal (spec module §4.8.F): the last stage of the chain, wrapping the
//! derived-graph operation in [`crate::graph::prune`] as a [`Transformer`] so it composes with the
//! rest of the chain uniformly.

use crate::graph::prune::{prune_unreachable, DefaultRemovability, Removability};
use crate::label::Label;
use crate::model::Build;
use crate::transform::Transformer;
use crate::Error;

pub struct PruneUnreachable {
    pub artifact_roots: Vec<Label>,
}

impl Transformer for PruneUnreachable {
    fn name(&self) -> &'static str {
        "prune_unreachable"
    }

    fn apply(&self, build: &mut Build) -> Result<(), Error> {
        let roots: Vec<_> = self
            .artifact_roots
            .iter()
            .filter_map(|label| build.resolve_label(label))
            .collect();
        prune_unreachable(build, &roots, &DefaultRemovability)?;
        Ok(())
    }
}

/// A variant accepting a caller-supplied removability policy, for domain overlays that need to
/// protect extra rule kinds (see [`Removability`]).
pub struct PruneUnreachableWithPolicy<P: Removability> {
    pub artifact_roots: Vec<Label>,
    pub policy: P,
}

impl<P: Removability> Transformer for PruneUnreachableWithPolicy<P> {
    fn name(&self) -> &'static str {
        "prune_unreachable"
    }

    fn apply(&self, build: &mut Build) -> Result<(), Error> {
        let roots: Vec<_> = self
            .artifact_roots
            .iter()
            .filter_map(|label| build.resolve_label(label))
            .collect();
        prune_unreachable(build, &roots, &self.policy)?;
        Ok(())
    }
}
