// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use buildgraph_cli::Args;
use clap::Parser;
use color_eyre::eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    std::process::exit(buildgraph_cli::run(args)?);
}
