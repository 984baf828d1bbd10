// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sample `query deps --output=build` text blobs, one per end-to-end scenario in spec module §8.
//! All package comments use `/src` as the checkout root, matching the scenarios' literal text.

/// S1: a single `cc_library` with two sources.
pub const SMOKE_CC_LIBRARY: &str = r#"
cc_library(
  name = "a",
  srcs = ["a.cc"],
  hdrs = ["a.h"],
  deps = [],
)
# /src/pkg/BUILD:1:1
"#;

/// S2: an `alias` referenced from both a `genrule`'s `tools` list and its `cmd` string.
pub const ALIAS_INTO_GENRULE_CMD: &str = r#"
alias(
  name = "al",
  actual = "//x:real",
)
# /src/p/BUILD:1:1

genrule(
  name = "g",
  srcs = [],
  tools = ["//p:al"],
  outs = ["g.out"],
  cmd = "$(location //p:al) > $@",
)
# /src/p/BUILD:2:1
"#;

/// S3: a three-cycle `A -> B -> C -> A` via `deps`.
pub const THREE_CYCLE: &str = r#"
cc_library(
  name = "a",
  deps = ["//pkg:b"],
)
# /src/pkg/BUILD:1:1

cc_library(
  name = "b",
  deps = ["//pkg:c"],
)
# /src/pkg/BUILD:2:1

cc_library(
  name = "c",
  deps = ["//pkg:a"],
)
# /src/pkg/BUILD:3:1
"#;

/// S4: the `cc_header_only_library` trio -- `_transitive_hdrs`, `_transitive_parameters_library`
/// and the `cc_library` they expand from.
pub const HEADER_ONLY_TRIO: &str = r#"
_transitive_hdrs(
  name = "x_gather",
  deps = ["//e:h1"],
)
# /src/p/BUILD:1:1

_transitive_parameters_library(
  name = "x_params",
  original_deps = [],
)
# /src/p/BUILD:2:1

cc_library(
  name = "x",
  hdrs = ["x.h"],
  deps = [":x_params", "//e:o"],
)
# /src/p/BUILD:3:1
"#;

/// S5: `//a:bin -> //a:lib`, plus a standalone `//z:orphan` that pruning should remove.
pub const UNREACHABLE_ORPHAN: &str = r#"
cc_binary(
  name = "bin",
  srcs = [],
  deps = ["//a:lib"],
)
# /src/a/BUILD:1:1

cc_library(
  name = "lib",
  srcs = ["lib.cc"],
)
# /src/a/BUILD:2:1

cc_library(
  name = "orphan",
  srcs = ["orphan.cc"],
)
# /src/z/BUILD:1:1
"#;

/// S6: `//p:t` borrows a source file that lives in `//q`.
pub const CROSS_PACKAGE_EXPORT: &str = r#"
cc_library(
  name = "t",
  srcs = ["//q:s.h"],
)
# /src/p/BUILD:1:1
"#;
