// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;

#[derive(Debug, Parser)]
#[clap(about = "Collect, normalize and rewrite a monorepo's build-file graph")]
pub struct Args {
    /// Path to the JSON configuration file (spec module §6.1).
    pub config: String,

    /// The external build tool to invoke for `cquery` (spec module §6.2). Must be on PATH.
    #[clap(long, default_value = "buck2")]
    pub tool: String,
}
