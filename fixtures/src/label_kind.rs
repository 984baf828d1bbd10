// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matching `query deps --output=label_kind` blobs for the scenarios in [`crate::build_output`]
//! that exercise a full `Collector` run rather than a bare parse.

/// Paired with [`crate::build_output::SMOKE_CC_LIBRARY`].
pub const SMOKE_CC_LIBRARY: &str = "\
source file //pkg:a.cc
source file //pkg:a.h
cc_library rule //pkg:a
";

/// Paired with [`crate::build_output::CROSS_PACKAGE_EXPORT`]; `s.h` is what makes `//q:s.h` a
/// `FileNode` instead of remaining a stub.
pub const CROSS_PACKAGE_EXPORT: &str = "\
cc_library rule //p:t
source file //q:s.h
";
