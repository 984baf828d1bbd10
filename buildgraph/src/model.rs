// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The node arena and the `Build` object that owns it.
//!
//! Replaces the source's class hierarchy (Container/Target/File/GeneratedFile/Function, all
//! subclasses of a common Node base) with a tagged-union `Node` over a flat arena, as described in
//! spec module §9 ("Polymorphism over node variants"). Every label-typed reference between nodes
//! is logically just a string; resolution materializes it into an [`NodeIndex`], but ownership
//! always stays with the containing `Package`. Deleting a node tombstones its arena slot rather
//! than physically removing it, so that `NodeIndex` values (in particular a
//! `GeneratedFileNode`'s maternal-target back-reference) never dangle or get silently reused.

use crate::attr::AttrBag;
use crate::catalog::Catalog;
use crate::label::{Addr, Label, PackageAddr, RepoAddr};
use crate::Error;
use indexmap::IndexMap;

/// A stable index into the `Build` arena. Stable across tombstoning deletions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeIndex(usize);

/// The rule kind used for a stub target inserted by the parser/collector for a label that hasn't
/// been parsed yet.
pub const STUB_KIND: &str = "__target_stub__";

/// A container node: `Root` or `Repository`. Both simply index children by their own key.
#[derive(Clone, Debug, Default)]
pub struct ContainerData {
    pub children: IndexMap<String, NodeIndex>,
}

/// A `Package` container: owns its direct `Target`/`File`/`GeneratedFile` children (keyed by
/// label) and its `Function` calls.
#[derive(Clone, Debug)]
pub struct PackageData {
    pub addr: PackageAddr,
    pub children: IndexMap<String, NodeIndex>,
    pub functions: Vec<NodeIndex>,
}

/// A concrete rule instance.
#[derive(Clone, Debug)]
pub struct TargetData {
    pub label: Label,
    pub kind: String,
    pub attrs: AttrBag,
    pub generator_name: Option<String>,
    pub generator_function: Option<String>,
}

impl TargetData {
    pub fn is_stub(&self) -> bool {
        self.kind == STUB_KIND
    }
}

/// A leaf representing a source file.
#[derive(Clone, Debug)]
pub struct FileData {
    pub label: Label,
}

/// A leaf representing a declared output of some target.
#[derive(Clone, Debug)]
pub struct GeneratedData {
    pub label: Label,
    /// The target that declared this output. Never owns it -- a reference only.
    pub maternal: NodeIndex,
}

/// A package-level non-target call, e.g. `exports_files(...)`.
#[derive(Clone, Debug)]
pub struct FunctionData {
    pub name: String,
    pub attrs: AttrBag,
}

/// The tagged union of every node kind the forest can contain.
#[derive(Clone, Debug)]
pub enum Node {
    Root(ContainerData),
    Repository(ContainerData),
    Package(PackageData),
    Target(TargetData),
    File(FileData),
    Generated(GeneratedData),
    Function(FunctionData),
}

impl Node {
    pub fn as_target(&self) -> Option<&TargetData> {
        match self {
            Node::Target(t) => Some(t),
            _ => None,
        }
    }
    pub fn as_target_mut(&mut self) -> Option<&mut TargetData> {
        match self {
            Node::Target(t) => Some(t),
            _ => None,
        }
    }
    pub fn as_package(&self) -> Option<&PackageData> {
        match self {
            Node::Package(p) => Some(p),
            _ => None,
        }
    }
    pub fn as_package_mut(&mut self) -> Option<&mut PackageData> {
        match self {
            Node::Package(p) => Some(p),
            _ => None,
        }
    }
    pub fn as_generated(&self) -> Option<&GeneratedData> {
        match self {
            Node::Generated(g) => Some(g),
            _ => None,
        }
    }
    pub fn as_file(&self) -> Option<&FileData> {
        match self {
            Node::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&Label> {
        match self {
            Node::Target(t) => Some(&t.label),
            Node::File(f) => Some(&f.label),
            Node::Generated(g) => Some(&g.label),
            _ => None,
        }
    }

    /// True for the kinds `prune_unreachable` is allowed to delete by default: anything that
    /// isn't a file, generated file, container or function. Domain overlays can further restrict
    /// this via [`crate::graph::dag::Removability`].
    pub fn is_removable_by_default(&self) -> bool {
        matches!(self, Node::Target(t) if !t.is_stub())
    }
}

/// Owns every node in both forests (the internal tree rooted at the empty repo, and the external
/// tree rooted at `@`), plus the process-wide rule catalog used to interpret target attributes.
#[derive(Clone, Debug)]
pub struct Build {
    arena: Vec<Option<Node>>,
    /// Every addressable node (container or leaf), keyed by its canonical key string. Containers
    /// are keyed by `Addr::to_string()`; targets/files/generated files by `Label::as_str()`.
    index: IndexMap<String, NodeIndex>,
    internal_root: NodeIndex,
    external_root: NodeIndex,
    catalog: Catalog,
}

impl Build {
    pub fn new(catalog: Catalog) -> Self {
        let mut arena = Vec::new();
        let mut index = IndexMap::new();

        arena.push(Some(Node::Root(ContainerData::default())));
        let internal_root = NodeIndex(0);
        index.insert(Addr::Root.to_string(), internal_root);

        // The external forest (spec module §3's "two forests") gets its own root, parallel to
        // the internal one; every `@`-prefixed repository's container chain parents under this
        // instead of `internal_root`.
        arena.push(Some(Node::Root(ContainerData::default())));
        let external_root = NodeIndex(1);
        index.insert(Addr::ExternalRoot.to_string(), external_root);

        Self {
            arena,
            index,
            internal_root,
            external_root,
            catalog,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn internal_root(&self) -> NodeIndex {
        self.internal_root
    }

    pub fn external_root(&self) -> NodeIndex {
        self.external_root
    }

    pub fn get(&self, ix: NodeIndex) -> &Node {
        self.arena[ix.0]
            .as_ref()
            .expect("NodeIndex used after its node was removed")
    }

    pub fn get_mut(&mut self, ix: NodeIndex) -> &mut Node {
        self.arena[ix.0]
            .as_mut()
            .expect("NodeIndex used after its node was removed")
    }

    pub fn is_live(&self, ix: NodeIndex) -> bool {
        self.arena[ix.0].is_some()
    }

    /// Looks up a node by its canonical key (a label string for leaves, an `Addr` string for
    /// containers).
    pub fn lookup(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    pub fn resolve_label(&self, label: &Label) -> Option<NodeIndex> {
        self.lookup(label.as_str())
    }

    /// Inserts a new node under `key`, returning [`Error::LabelCollision`] if the key is already
    /// taken by a live node.
    pub fn insert(&mut self, key: String, node: Node) -> Result<NodeIndex, Error> {
        if let Some(existing) = self.index.get(&key) {
            if self.is_live(*existing) {
                return Err(Error::LabelCollision(key));
            }
        }
        let ix = NodeIndex(self.arena.len());
        self.arena.push(Some(node));
        self.index.insert(key, ix);
        Ok(ix)
    }

    /// Inserts a node, replacing whatever was previously indexed under `key` outright (used by
    /// the collector to promote a stub into a real target).
    pub fn replace(&mut self, key: &str, node: Node) -> NodeIndex {
        if let Some(ix) = self.index.get(key).copied() {
            self.arena[ix.0] = Some(node);
            ix
        } else {
            let ix = NodeIndex(self.arena.len());
            self.arena.push(Some(node));
            self.index.insert(key.to_string(), ix);
            ix
        }
    }

    /// Tombstones a node. Does not remove it from any container's `children` map -- callers are
    /// responsible for that (transformers snapshot children before mutating; see spec module §5).
    pub fn remove(&mut self, ix: NodeIndex) {
        self.arena[ix.0] = None;
    }

    pub fn all_live_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (0..self.arena.len())
            .map(NodeIndex)
            .filter(move |ix| self.is_live(*ix))
    }

    pub fn targets(&self) -> impl Iterator<Item = (NodeIndex, &TargetData)> {
        self.all_live_indices()
            .filter_map(move |ix| self.get(ix).as_target().map(|t| (ix, t)))
    }

    /// Ensures a container chain `Root -> Repository -> Package(...) -> ... -> Package` exists for
    /// the given address, creating intermediate containers on demand (set-default semantics), and
    /// returns the index of the final container.
    pub fn ensure_container(&mut self, addr: &Addr) -> Result<NodeIndex, Error> {
        match addr {
            Addr::Root => Ok(self.internal_root),
            Addr::ExternalRoot => Ok(self.external_root),
            Addr::Repository(repo) => {
                let key = repo.to_string();
                if let Some(ix) = self.lookup(&key) {
                    return Ok(ix);
                }
                let parent_addr = Addr::Repository(repo.clone()).parent().expect("repository has a parent");
                let parent = self.ensure_container(&parent_addr)?;
                let ix = self.insert(key.clone(), Node::Repository(ContainerData::default()))?;
                self.add_child(parent, key, ix);
                Ok(ix)
            }
            Addr::Package(pkg) => {
                let key = pkg.to_string();
                if let Some(ix) = self.lookup(&key) {
                    return Ok(ix);
                }
                let parent_addr = Addr::Package(pkg.clone()).parent().expect("package has a parent");
                let parent = self.ensure_container(&parent_addr)?;
                let ix = self.insert(
                    key.clone(),
                    Node::Package(PackageData {
                        addr: pkg.clone(),
                        children: IndexMap::new(),
                        functions: Vec::new(),
                    }),
                )?;
                self.add_child(parent, key, ix);
                Ok(ix)
            }
        }
    }

    fn add_child(&mut self, parent: NodeIndex, key: String, child: NodeIndex) {
        match self.get_mut(parent) {
            Node::Root(c) | Node::Repository(c) => {
                c.children.insert(key, child);
            }
            Node::Package(p) => {
                p.children.insert(key, child);
            }
            _ => unreachable!("only containers can be parents"),
        }
    }

    /// Places a leaf (target/file/generated-file) node under its owning package, creating the
    /// package (and its repository) on demand.
    pub fn place_under_package(&mut self, label: &Label, node: Node) -> Result<NodeIndex, Error> {
        let pkg_addr = match label.parent() {
            Addr::Package(p) => p,
            _ => unreachable!("Label::parent always returns a Package address"),
        };
        let pkg_ix = self.ensure_container(&Addr::Package(pkg_addr))?;
        let ix = self.insert(label.as_str().to_string(), node)?;
        match self.get_mut(pkg_ix) {
            Node::Package(p) => {
                p.children.insert(label.as_str().to_string(), ix);
            }
            _ => unreachable!(),
        }
        Ok(ix)
    }

    /// Ensures a leaf node is listed under its owning package's children, creating the package
    /// chain on demand. Idempotent: calling this again for the same label is a no-op re-insert.
    /// Used when a node's arena slot was replaced in place (e.g. a stub promoted to a real
    /// target) and may predate the package being indexed.
    pub fn attach_child(&mut self, label: &Label, ix: NodeIndex) -> Result<(), Error> {
        let pkg_addr = match label.parent() {
            Addr::Package(p) => p,
            _ => unreachable!("Label::parent always returns a Package address"),
        };
        let pkg_ix = self.ensure_container(&Addr::Package(pkg_addr))?;
        match self.get_mut(pkg_ix) {
            Node::Package(p) => {
                p.children.insert(label.as_str().to_string(), ix);
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    /// Attaches a `Function` node to the given package.
    pub fn add_function(&mut self, pkg: NodeIndex, function: FunctionData) -> NodeIndex {
        let ix = NodeIndex(self.arena.len());
        self.arena.push(Some(Node::Function(function)));
        match self.get_mut(pkg) {
            Node::Package(p) => p.functions.push(ix),
            _ => unreachable!("add_function called on a non-package node"),
        }
        ix
    }

    pub fn repo_addr_is_external(addr: &RepoAddr) -> bool {
        addr.external
    }
}
