// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `buildgraph`: parses an external build tool's `query`/`cquery` textual output into an in-memory
//! target graph, rewrites it through a fixed chain of normalizing transformers, and hands the
//! result to an emitter.
//!
//! The pipeline, matching the control flow of the design document:
//!
//! ```text
//! Config -> Collector (catalog, label algebra, query parser, collection)
//!        -> Package Tree Builder
//!        -> Transformer chain (using the Target DAG)
//!        -> Emitters
//! ```
//!
//! This crate implements everything left of the external interfaces: it never shells out to the
//! build tool itself, never invokes a layout engine, and never reads a config file or writes an
//! output file from disk. Those concerns belong to `buildgraph-cmdlib` and the `buildgraph-cli`
//! binary built on top of this library.

pub mod attr;
pub mod catalog;
pub mod collector;
pub mod emit;
pub mod errors;
pub mod graph;
pub mod label;
pub mod model;
pub mod query;
pub mod transform;
pub mod tree;

pub use collector::{Collector, CollectorConfig, CollectionReport, CollectionStats, OutputFormat, QueryRunner};
pub use errors::{Error, UnknownRule, UnresolvedTarget};
pub use label::Label;
pub use model::{Build, NodeIndex};
