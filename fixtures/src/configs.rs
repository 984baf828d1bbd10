// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sample JSON configuration blobs (spec module §6.1), used to exercise `buildgraph-cmdlib`'s
//! deserialization without every caller hand-rolling a JSON string.

/// A minimal config naming a single root target.
pub const MINIMAL: &str = r#"{
  "base_targets": { "target": "//a:bin" },
  "prefix_path": "/src"
}"#;

/// A config exercising every recognized field.
pub const FULL: &str = r#"{
  "base_targets": {
    "target": "//a:bin",
    "excluded_targets": ["third_party"],
    "bazel_config": "opt"
  },
  "prefix_path": "/src",
  "output_build_path": "/tmp/out",
  "build_file_name": "BUILD.bazel",
  "debug_build": true,
  "debug_tree": true,
  "debug_target_graph": {
    "path": "/tmp/graph.dot",
    "targets": ["//a:bin"]
  },
  "merged_targets": {
    "new_targets_prefix": "merged_",
    "targets": ["//a:lib"]
  },
  "artifact_targets": {
    "targets": ["//a:bin"],
    "prune_unreachable": true
  }
}"#;
