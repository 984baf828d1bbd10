// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [`QueryRunner`] that actually shells out to the external build tool (spec module §6.2),
//! the one piece of the pipeline `buildgraph` itself deliberately has no opinion about.

use buildgraph::collector::{OutputFormat, QueryRunner};
use std::error;
use std::process::Command;

/// Invokes `<tool> cquery ... --output <fmt>` and returns its stdout.
///
/// Exit status is not inspected, matching spec module §6.2 -- `cquery` can exit non-zero on a
/// partial, `--keep_going`-tolerated failure and still have produced usable stdout. Arguments are
/// passed directly to the child process rather than through a shell, so the `' union '`-joined
/// label list from the spec's command-line rendering needs no literal quoting here.
pub struct SubprocessQueryRunner {
    tool: String,
    bazel_config: String,
}

impl SubprocessQueryRunner {
    pub fn new(tool: String, bazel_config: String) -> Self {
        Self { tool, bazel_config }
    }
}

impl QueryRunner for SubprocessQueryRunner {
    fn query_deps(
        &mut self,
        targets: &[String],
        excluded: &[String],
        output: OutputFormat,
    ) -> Result<String, Box<dyn error::Error + Send + Sync>> {
        let mut args = vec!["cquery".to_string()];
        if !self.bazel_config.is_empty() {
            args.push(format!("--config={}", self.bazel_config));
        }
        args.push(format!("deps({})", targets.join(" union ")));
        args.push("--keep_going".to_string());
        args.push("--output".to_string());
        args.push(
            match output {
                OutputFormat::Build => "build",
                OutputFormat::LabelKind => "label_kind",
            }
            .to_string(),
        );
        if !excluded.is_empty() {
            args.push("--".to_string());
            args.extend(excluded.iter().map(|e| format!("-{}", e)));
        }

        let output = Command::new(&self.tool).args(&args).output()?;
        Ok(String::from_utf8(output.stdout)?)
    }
}
