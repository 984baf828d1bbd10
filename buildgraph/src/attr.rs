// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dynamic attribute bag attached to every [`crate::model::TargetData`].
//!
//! The source tool represents a target's attributes as an open dictionary keyed by attribute
//! name. Here that becomes a small tagged union of value kinds, indexed by an insertion-ordered
//! map -- see spec module §9, "Dynamic attribute bags".

use crate::label::Label;
use indexmap::IndexMap;

/// The value of a single target attribute, tagged by the rule-catalog bucket it came from.
#[derive(Clone, Debug)]
pub enum AttrValue {
    Label(Label),
    LabelList(Vec<Label>),
    String(String),
    StringList(Vec<String>),
    Bool(bool),
    Int(i64),
    StrStrMap(IndexMap<String, String>),
    /// A label referring to a declared output of the target that owns this attribute.
    OutLabel(Label),
    OutLabelList(Vec<Label>),
}

impl AttrValue {
    /// Returns the label-typed values carried by this attribute, whether singular or a list.
    ///
    /// Used uniformly by the target DAG and by transformers that rewrite label references without
    /// caring which bucket an attribute belongs to.
    pub fn labels(&self) -> Vec<&Label> {
        match self {
            AttrValue::Label(l) | AttrValue::OutLabel(l) => vec![l],
            AttrValue::LabelList(ls) | AttrValue::OutLabelList(ls) => ls.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Returns mutable access to the label-typed values carried by this attribute.
    pub fn labels_mut(&mut self) -> Vec<&mut Label> {
        match self {
            AttrValue::Label(l) | AttrValue::OutLabel(l) => vec![l],
            AttrValue::LabelList(ls) | AttrValue::OutLabelList(ls) => ls.iter_mut().collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_label(&self) -> Option<&Label> {
        match self {
            AttrValue::Label(l) | AttrValue::OutLabel(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_label_list(&self) -> Option<&[Label]> {
        match self {
            AttrValue::LabelList(ls) | AttrValue::OutLabelList(ls) => Some(ls),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::StringList(ss) => Some(ss),
            _ => None,
        }
    }
}

/// An insertion-ordered bag of attributes for a single target.
#[derive(Clone, Debug, Default)]
pub struct AttrBag {
    values: IndexMap<String, AttrValue>,
}

impl AttrBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) {
        self.values.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.values.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttrValue> {
        self.values.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn label_list(&self, name: &str) -> &[Label] {
        self.values
            .get(name)
            .and_then(AttrValue::as_label_list)
            .unwrap_or(&[])
    }

    pub fn bool_attr(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(AttrValue::as_bool)
            .unwrap_or(false)
    }

    /// Returns every label referenced by any attribute in this bag, in attribute-insertion
    /// order. This is the edge set the target DAG walks.
    pub fn all_label_refs(&self) -> Vec<&Label> {
        self.values.values().flat_map(AttrValue::labels).collect()
    }

    /// Mutable variant of [`Self::all_label_refs`], used by transformers rewriting edges in place.
    pub fn all_label_refs_mut(&mut self) -> Vec<&mut Label> {
        self.values
            .values_mut()
            .flat_map(AttrValue::labels_mut)
            .collect()
    }
}
