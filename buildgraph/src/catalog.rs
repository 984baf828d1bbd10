// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rule catalog: a declarative, process-wide schema for every rule kind the parser must
//! recognize.
//!
//! Each [`RuleSchema`] partitions its attribute names into the semantic buckets of spec module
//! §3 ("Rule schema (static catalog)"). The catalog is immutable once built; a domain-specific
//! overlay extends the base set, with overlay entries shadowing base entries by rule kind.

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;

/// The semantic bucket an attribute name belongs to, used by the parser to pick an extractor and
/// by the emitter to pick an ordering group.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AttrBucket {
    LabelList,
    Label,
    StringList,
    String,
    Bool,
    Int,
    StrStrMap,
    OutLabelList,
    OutLabel,
}

/// The schema for a single rule kind.
#[derive(Clone, Debug)]
pub struct RuleSchema {
    kind: &'static str,
    attrs: IndexMap<&'static str, AttrBucket>,
    /// Templated output names such as `{name}.pb.h`; each declared output becomes a
    /// `GeneratedFileNode` once `{name}` is substituted with the target's own name.
    outputs_templates: Vec<&'static str>,
    is_macro: bool,
    import_statement: Option<&'static str>,
    has_visibility: bool,
}

impl RuleSchema {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            attrs: IndexMap::new(),
            outputs_templates: Vec::new(),
            is_macro: false,
            import_statement: None,
            has_visibility: true,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    fn with(mut self, names: &[&'static str], bucket: AttrBucket) -> Self {
        for name in names {
            self.attrs.insert(name, bucket);
        }
        self
    }

    pub fn label_list(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::LabelList)
    }
    pub fn label(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::Label)
    }
    pub fn string_list(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::StringList)
    }
    pub fn string(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::String)
    }
    pub fn bool_attrs(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::Bool)
    }
    pub fn int_attrs(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::Int)
    }
    pub fn str_str_map(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::StrStrMap)
    }
    pub fn out_label_list(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::OutLabelList)
    }
    pub fn out_label(self, names: &[&'static str]) -> Self {
        self.with(names, AttrBucket::OutLabel)
    }
    pub fn outputs(mut self, templates: &[&'static str]) -> Self {
        self.outputs_templates.extend(templates.iter());
        self
    }
    pub fn macro_rule(mut self) -> Self {
        self.is_macro = true;
        self
    }
    pub fn import(mut self, stmt: &'static str) -> Self {
        self.import_statement = Some(stmt);
        self
    }
    pub fn no_visibility(mut self) -> Self {
        self.has_visibility = false;
        self
    }

    pub fn bucket_of(&self, attr: &str) -> Option<AttrBucket> {
        self.attrs.get(attr).copied()
    }

    pub fn attrs_in_bucket(&self, bucket: AttrBucket) -> impl Iterator<Item = &'static str> + '_ {
        self.attrs
            .iter()
            .filter(move |(_, b)| **b == bucket)
            .map(|(name, _)| *name)
    }

    pub fn outputs_templates(&self) -> &[&'static str] {
        &self.outputs_templates
    }

    pub fn is_macro(&self) -> bool {
        self.is_macro
    }

    pub fn import_statement(&self) -> Option<&'static str> {
        self.import_statement
    }

    pub fn has_visibility(&self) -> bool {
        self.has_visibility
    }
}

/// An immutable, process-wide registry of rule schemas, partitioned into rules the parser should
/// parse and rules it should silently discard.
#[derive(Clone, Debug)]
pub struct Catalog {
    rules: IndexMap<&'static str, RuleSchema>,
    ignored: IndexSet<&'static str>,
}

impl Catalog {
    /// Returns the base catalog shipped with `buildgraph`.
    pub fn base() -> Self {
        BASE_CATALOG.clone()
    }

    /// Merges a domain-specific overlay on top of this catalog. Overlay rules shadow base rules
    /// of the same kind; overlay-ignored kinds are unioned with the base ignore set.
    pub fn with_overlay(
        mut self,
        extra_rules: impl IntoIterator<Item = RuleSchema>,
        extra_ignored: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        for rule in extra_rules {
            self.rules.insert(rule.kind(), rule);
        }
        for kind in extra_ignored {
            self.ignored.insert(kind);
        }
        self
    }

    pub fn get(&self, kind: &str) -> Option<&RuleSchema> {
        self.rules.get(kind)
    }

    pub fn is_ignored(&self, kind: &str) -> bool {
        self.ignored.contains(kind)
    }

    pub fn rules(&self) -> impl Iterator<Item = &RuleSchema> {
        self.rules.values()
    }

    pub fn ignored_rules(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ignored.iter().copied()
    }
}

static BASE_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    let mut rules = IndexMap::new();
    for rule in base_rules() {
        rules.insert(rule.kind(), rule);
    }
    let ignored: IndexSet<&'static str> = [
        "package",
        "licenses",
        "package_group",
        "toolchain",
        "platform",
        "test_suite",
    ]
    .into_iter()
    .collect();
    Catalog { rules, ignored }
});

fn base_rules() -> Vec<RuleSchema> {
    vec![
        RuleSchema::new("cc_library")
            .label_list(&["srcs", "hdrs", "deps", "textual_hdrs", "data"])
            .string_list(&["copts", "linkopts", "features", "includes", "strip_include_prefix"])
            .bool_attrs(&["alwayslink", "linkstatic"]),
        RuleSchema::new("cc_shared_library")
            .label_list(&["roots", "deps", "dynamic_deps"])
            .string(&["shared_lib_name"])
            .string_list(&["features"]),
        RuleSchema::new("cc_binary")
            .label_list(&["srcs", "deps", "data"])
            .string_list(&["copts", "linkopts"]),
        RuleSchema::new("cc_test")
            .label_list(&["srcs", "deps", "data"])
            .string_list(&["copts", "args"]),
        RuleSchema::new("alias").label(&["actual"]),
        RuleSchema::new("bind").label(&["actual"]).no_visibility(),
        RuleSchema::new("genrule")
            .label_list(&["srcs", "tools"])
            .out_label_list(&["outs"])
            .string(&["cmd"]),
        RuleSchema::new("filegroup").label_list(&["srcs", "data"]),
        RuleSchema::new("proto_library").label_list(&["srcs", "deps"]),
        RuleSchema::new("cc_proto_library").label_list(&["deps"]),
        RuleSchema::new("py_library")
            .label_list(&["srcs", "deps", "data"])
            .string_list(&["srcs_version"]),
        RuleSchema::new("py_test")
            .label_list(&["srcs", "deps", "data"])
            .string_list(&["args"]),
        RuleSchema::new("py_binary")
            .label_list(&["srcs", "deps", "data"])
            .string_list(&["args"]),
        RuleSchema::new("config_setting")
            .str_str_map(&["values"])
            .no_visibility(),
        RuleSchema::new("bool_flag").bool_attrs(&["build_setting_default"]),
        // Private rules expanded by macros -- see transform::macro_collapse.
        RuleSchema::new("_transitive_hdrs").label_list(&["deps"]).no_visibility(),
        RuleSchema::new("_transitive_parameters_library")
            .label_list(&["original_deps"])
            .no_visibility(),
        RuleSchema::new("cc_header_only_library")
            .label_list(&["deps", "extra_deps", "hdrs"])
            .string_list(&["includes"]),
        RuleSchema::new("_empty_test").label_list(&["deps"]).no_visibility(),
        RuleSchema::new("build_test").label_list(&["targets"]).macro_rule(),
        RuleSchema::new("pkg_tar_impl")
            .label_list(&["srcs", "deps"])
            .bool_attrs(&["private_stamp_detect"])
            .no_visibility(),
        RuleSchema::new("pkg_tar").label_list(&["srcs", "deps"]).macro_rule(),
        RuleSchema::new("filegroup_as_file")
            .label_list(&["dep"])
            .macro_rule()
            .no_visibility(),
        RuleSchema::new("transitive_hdrs").label_list(&["deps"]).macro_rule(),
        RuleSchema::new("_generate_cc")
            .label(&["well_known_protos"])
            .label_list(&["srcs"])
            .no_visibility(),
        RuleSchema::new("generate_cc")
            .label_list(&["srcs"])
            .bool_attrs(&["well_known_protos"])
            .macro_rule(),
        RuleSchema::new("_local_genrule_internal")
            .label_list(&["srcs", "tools"])
            .out_label_list(&["outs"])
            .string(&["cmd"])
            .no_visibility(),
        RuleSchema::new("tfcompile_model_library")
            .label_list(&["cpp_class", "deps"])
            .macro_rule(),
        RuleSchema::new("pywrap_common_library_version_script")
            .label_list(&["deps"])
            .macro_rule(),
    ]
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn overlay_shadows_base() {
        let overlay = RuleSchema::new("cc_library").string(&["custom"]);
        let catalog = Catalog::base().with_overlay([overlay], []);
        let schema = catalog.get("cc_library").unwrap();
        assert_eq!(schema.bucket_of("custom"), Some(AttrBucket::String));
        assert_eq!(schema.bucket_of("srcs"), None);
    }

    #[test]
    fn base_catalog_has_cc_library() {
        let catalog = Catalog::base();
        let schema = catalog.get("cc_library").unwrap();
        assert_eq!(schema.bucket_of("srcs"), Some(AttrBucket::LabelList));
        assert!(!catalog.is_ignored("cc_library"));
        assert!(catalog.is_ignored("package"));
    }
}
