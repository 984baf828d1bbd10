// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for CLI operations with `buildgraph`: translates a JSON configuration file into
//! `buildgraph`'s own data structures.
//!
//! This library allows a binary to turn a config file plus a [`buildgraph::collector::QueryRunner`]
//! impl into a fully collected, transformed, emitted graph without itself knowing the JSON schema.

pub mod config;

pub use config::{ArtifactTargets, BaseTargets, Config, DebugTargetGraph, MergedTargets};
