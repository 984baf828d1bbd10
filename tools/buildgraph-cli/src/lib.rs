// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A command-line frontend for `buildgraph`.
//!
//! Wires together the pieces that are deliberately out of `buildgraph`'s own scope: loading the
//! JSON config (spec module §6.1), shelling out to the external build tool's `cquery` (§6.2) as a
//! [`buildgraph::collector::QueryRunner`], driving the collector and transformer chain, writing
//! rewritten build files to disk, and optionally shelling out to `twopi` (§6.3) to rasterize a
//! `.dot` dump.

mod query_runner;
mod subcommand;

pub use query_runner::SubprocessQueryRunner;
pub use subcommand::Args;

use anyhow::{Context, Result};
use buildgraph::catalog::Catalog;
use buildgraph::collector::Collector;
use buildgraph::graph::TargetDag;
use buildgraph::label::Label;
use buildgraph::model::Build;
use buildgraph::transform::alias::AliasElision;
use buildgraph::transform::cc_merge::CcLibraryMerge;
use buildgraph::transform::exports::CrossPackageExportSynthesis;
use buildgraph::transform::macro_collapse::MacroCollapse;
use buildgraph::transform::prune_unreachable::PruneUnreachable;
use buildgraph::transform::{run_chain, Transformer};
use buildgraph::{emit, Error as BuildgraphError};
use buildgraph_cmdlib::Config;
use std::fs;

/// `0` success; `1` configuration or invariant error; `2` unresolved-target or
/// cycle-detected error (spec module §6.5).
pub fn run(args: Args) -> Result<i32> {
    let config_text = fs::read_to_string(&args.config)
        .with_context(|| format!("reading config file {}", args.config))?;
    let config = Config::from_json(&config_text).context("parsing config file as JSON")?;

    let mut build = Build::new(Catalog::base());
    let mut runner = SubprocessQueryRunner::new(args.tool.clone(), config.base_targets.bazel_config.clone());

    let mut collector = Collector::new(&mut build, config.collector_config());
    let report = match collector.run(&mut runner, &[config.base_targets.target.clone()]) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error: {}", err);
            return Ok(exit_code_for(&err));
        }
    };

    if config.debug_tree {
        eprintln!("collected in {} iteration(s)", report.iterations);
        for (kind, count) in &report.stats.targets_by_kind {
            eprintln!("  {}: {}", kind, count);
        }
        if report.stats.stubs_remaining > 0 {
            eprintln!("  stubs remaining: {}", report.stats.stubs_remaining);
        }
    }
    for unknown in &report.unknown_rules {
        eprintln!("warning: {}", unknown);
    }

    let chain = build_chain(&config)?;
    if let Err(err) = run_chain(&mut build, &chain) {
        eprintln!("error: {}", err);
        return Ok(exit_code_for(&err));
    }

    if !config.debug_target_graph.targets.is_empty() && !config.debug_target_graph.path.is_empty() {
        write_debug_graph(&build, &config)?;
    }

    let emitted = emit::emit_all(&build);
    if config.debug_build {
        for file in &emitted {
            println!("# Package: {}\n{}", file.package, file.text);
        }
    }
    if !config.output_build_path.is_empty() {
        write_build_files(&emitted, &config)?;
    }

    Ok(0)
}

/// Assembles the transformer chain (spec module §4.8's A/B/D/E/F ordering); which optional stages
/// run depends on whether the config named any roots for them.
fn build_chain(config: &Config) -> Result<Vec<Box<dyn Transformer>>> {
    let mut chain: Vec<Box<dyn Transformer>> = vec![Box::new(AliasElision), Box::new(MacroCollapse::default())];

    if !config.merged_targets.targets.is_empty() {
        let roots = config
            .merged_targets
            .targets
            .iter()
            .map(|l| Label::parse(l))
            .collect::<Result<Vec<_>, _>>()
            .context("parsing merged_targets.targets as labels")?;
        chain.push(Box::new(CcLibraryMerge {
            roots,
            new_prefix: config.merged_targets.new_targets_prefix.clone(),
        }));
    }

    chain.push(Box::new(CrossPackageExportSynthesis));

    if config.artifact_targets.prune_unreachable {
        let artifact_roots = config
            .artifact_targets
            .targets
            .iter()
            .map(|l| Label::parse(l))
            .collect::<Result<Vec<_>, _>>()
            .context("parsing artifact_targets.targets as labels")?;
        chain.push(Box::new(PruneUnreachable { artifact_roots }));
    }

    Ok(chain)
}

fn write_build_files(emitted: &[emit::EmittedFile], config: &Config) -> Result<()> {
    let out_dir = camino::Utf8Path::new(&config.output_build_path);
    for file in emitted {
        let pkg_dir = out_dir.join(file.package.path.as_str());
        fs::create_dir_all(&pkg_dir)
            .with_context(|| format!("creating output directory {}", pkg_dir))?;
        let out_path = pkg_dir.join(&config.build_file_name);
        fs::write(&out_path, &file.text).with_context(|| format!("writing {}", out_path))?;
    }
    Ok(())
}

fn write_debug_graph(build: &Build, config: &Config) -> Result<()> {
    let roots = config
        .debug_target_graph
        .targets
        .iter()
        .map(|l| Label::parse(l))
        .collect::<Result<Vec<_>, _>>()
        .context("parsing debug_target_graph.targets as labels")?
        .into_iter()
        .filter_map(|label| build.resolve_label(&label))
        .collect::<Vec<_>>();
    let dag = TargetDag::build(build, roots).context("building target DAG for the debug dump")?;
    let dot = emit::emit_dot(build, &dag);
    fs::write(&config.debug_target_graph.path, dot)
        .with_context(|| format!("writing dot dump to {}", config.debug_target_graph.path))?;
    Ok(())
}

fn exit_code_for(err: &BuildgraphError) -> i32 {
    match err {
        BuildgraphError::UnresolvedTargets(_) | BuildgraphError::CycleDetected(_) => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn minimal_config_runs_alias_and_export_stages_only() {
        let config = Config::from_json(fixtures::configs::MINIMAL).unwrap();
        let chain = build_chain(&config).unwrap();
        let names: Vec<_> = chain.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["alias_elision", "macro_collapse", "cross_package_export_synthesis"]);
    }

    #[test]
    fn full_config_adds_merge_and_prune_stages() {
        let config = Config::from_json(fixtures::configs::FULL).unwrap();
        let chain = build_chain(&config).unwrap();
        let names: Vec<_> = chain.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "alias_elision",
                "macro_collapse",
                "cc_library_merge",
                "cross_package_export_synthesis",
                "prune_unreachable",
            ]
        );
    }
}
