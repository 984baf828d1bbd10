// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Converts the external build tool's textual `query deps` output into a flat target map, with
//! unresolved label stubs where a reference hasn't been parsed yet.
//!
//! Two sub-parsers exist, one per `--output` format the collector drives (spec module §4.3):
//! [`build_format`] for `--output=build` (full rule text, blank-line delimited) and
//! [`label_kind`] for `--output=label_kind` (one summary line per target, used to discover file
//! nodes and to confirm a stub isn't simply unqueried).

pub mod build_format;
pub mod label_kind;

pub use build_format::{parse_build_output, ParsedBuildOutput, ParsedTarget};
pub use label_kind::{parse_label_kind_output, LabelKindEntry, ParsedLabelKind};
