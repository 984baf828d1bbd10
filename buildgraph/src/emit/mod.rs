// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Emitters (spec module §4.7): turn a transformed [`crate::model::Build`] back into text.
//! Writing the result to disk and invoking a layout engine on the dot output are both out of
//! scope here -- see spec module §6.3 -- these functions only produce strings.

pub mod build_file;
pub mod dot;

pub use build_file::{emit_all, emit_package, EmittedFile};
pub use dot::emit_dot;
