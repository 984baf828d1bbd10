// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The JSON configuration schema (spec module §6.1). Unknown top-level keys are ignored (no
//! `deny_unknown_fields`); missing nested objects deserialize to their `Default`.

use buildgraph::collector::CollectorConfig;
use serde::Deserialize;

/// The root target and its exclusions, as handed to the external build tool's `cquery`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BaseTargets {
    pub target: String,
    #[serde(default)]
    pub excluded_targets: Vec<String>,
    #[serde(default)]
    pub bazel_config: String,
}

/// Where to write the Graphviz dump of each listed root's target DAG, if any.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DebugTargetGraph {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// The roots and output-name prefix for the cc_library/cc_shared_library deep merge.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MergedTargets {
    #[serde(default)]
    pub new_targets_prefix: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// The targets the final graph must still be able to build, and whether unreachable-target
/// pruning should run at all.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArtifactTargets {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub prune_unreachable: bool,
}

/// The full configuration file.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub base_targets: BaseTargets,
    #[serde(default)]
    pub prefix_path: String,
    #[serde(default)]
    pub output_build_path: String,
    #[serde(default = "default_build_file_name")]
    pub build_file_name: String,
    #[serde(default)]
    pub debug_build: bool,
    #[serde(default)]
    pub debug_tree: bool,
    #[serde(default)]
    pub debug_target_graph: DebugTargetGraph,
    #[serde(default)]
    pub merged_targets: MergedTargets,
    #[serde(default)]
    pub artifact_targets: ArtifactTargets,
}

fn default_build_file_name() -> String {
    "BUILD".to_string()
}

impl Config {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Translates the collection-relevant fields into a [`CollectorConfig`]; the transform-chain
    /// and emitter fields (`merged_targets`, `artifact_targets`, `debug_*`) are read directly by
    /// the CLI binary that assembles the chain.
    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            prefix_path: self.prefix_path.clone(),
            excluded_prefixes: self.base_targets.excluded_targets.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn missing_nested_objects_default_to_empty() {
        let config = Config::from_json(
            r#"{
                "base_targets": { "target": "//foo:bar" },
                "prefix_path": "/repo"
            }"#,
        )
        .unwrap();
        assert_eq!(config.build_file_name, "BUILD");
        assert!(config.debug_target_graph.targets.is_empty());
        assert!(config.merged_targets.targets.is_empty());
        assert!(!config.artifact_targets.prune_unreachable);
    }

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let config = Config::from_json(
            r#"{
                "base_targets": { "target": "//foo:bar" },
                "some_future_field": 42
            }"#,
        )
        .unwrap();
        assert_eq!(config.base_targets.target, "//foo:bar");
    }

    #[test]
    fn excluded_targets_become_collector_excluded_prefixes() {
        let config = Config::from_json(
            r#"{
                "base_targets": { "target": "//foo:bar", "excluded_targets": ["third_party"] }
            }"#,
        )
        .unwrap();
        let collector_config = config.collector_config();
        assert_eq!(collector_config.excluded_prefixes, vec!["third_party".to_string()]);
    }
}
