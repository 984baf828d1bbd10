// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Target DAG (spec module §4.6): a directed graph over non-file, non-generated-file targets,
//! derived fresh from the `Build` arena for each operation rather than maintained persistently.
//!
//! Materializing a throwaway adjacency map per call (instead of keeping one around permanently,
//! the way `guppy`'s `PackageGraph` does for its dependency graph) sidesteps a structural mismatch:
//! a graph library built on swap-remove invalidates node indices on removal, but transformers need
//! `crate::model::NodeIndex` to stay valid for the lifetime of the `Build` arena. Treating the DAG
//! as a derived view over `IndexMap` keeps both invariants intact.

pub mod dag;
pub mod prune;

pub use dag::{Adjacency, TargetDag};
pub use prune::{prune_unreachable, Removability};
