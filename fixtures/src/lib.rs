// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test corpora for `buildgraph` and `buildgraph-cmdlib`: sample `query deps` text blobs
//! and JSON configs, grounded in spec module §8's end-to-end scenarios so the same literal inputs
//! back both unit and integration tests.

pub mod build_output;
pub mod configs;
pub mod label_kind;
