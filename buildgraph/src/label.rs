// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical target labels and the address algebra over them.
//!
//! A [`Label`] identifies a target or file: `[@]<repo>//<package-path>:<name>`. Labels form the
//! identity of every node in the graph -- equality, ordering and hashing all go through the
//! canonical string, never through the parsed parts.

use crate::Error;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A canonical target label of the form `[@]<repo>//<package-path>:<name>`.
#[derive(Clone, Debug)]
pub struct Label {
    repr: Box<str>,
    external: bool,
    repo_end: usize,
    path_end: usize,
}

impl Label {
    /// Parses a canonical label string.
    ///
    /// Fails with [`Error::InvalidLabel`] if the string doesn't have the shape
    /// `@?<repo>//<package-path>:<name>`.
    pub fn parse(label: impl AsRef<str>) -> Result<Self, Error> {
        let s = label.as_ref();
        let external = s.starts_with('@');
        let rest = if external { &s[1..] } else { s };

        let slash_slash = rest
            .find("//")
            .ok_or_else(|| Error::InvalidLabel(s.to_string()))?;
        let repo = &rest[..slash_slash];
        if !repo.chars().all(is_word_char) {
            return Err(Error::InvalidLabel(s.to_string()));
        }

        let after_slashes = &rest[slash_slash + 2..];
        let colon = after_slashes
            .find(':')
            .ok_or_else(|| Error::InvalidLabel(s.to_string()))?;
        let package_path = &after_slashes[..colon];
        let name = &after_slashes[colon + 1..];
        if name.is_empty() || !package_path.chars().all(is_path_char) || !name.chars().all(is_path_char) {
            return Err(Error::InvalidLabel(s.to_string()));
        }

        // repo_end/path_end are byte offsets into `repr`, which we rebuild so that `external`
        // always has a canonical leading '@' and there's no ambiguity about where it starts.
        let repr = format!(
            "{}{}//{}:{}",
            if external { "@" } else { "" },
            repo,
            package_path,
            name
        );
        let prefix_len = if external { 1 } else { 0 };
        let repo_end = prefix_len + repo.len();
        let path_end = repo_end + 2 + package_path.len();

        Ok(Self {
            repr: repr.into_boxed_str(),
            external,
            repo_end,
            path_end,
        })
    }

    /// Constructs a label from its parts, without validating character classes.
    ///
    /// Used internally by the parser and transformers once components are already known-good.
    pub fn from_parts(external: bool, repo: &str, package_path: &str, name: &str) -> Self {
        let repr = format!(
            "{}{}//{}:{}",
            if external { "@" } else { "" },
            repo,
            package_path,
            name
        );
        let prefix_len = if external { 1 } else { 0 };
        let repo_end = prefix_len + repo.len();
        let path_end = repo_end + 2 + package_path.len();
        Self {
            repr: repr.into_boxed_str(),
            external,
            repo_end,
            path_end,
        }
    }

    /// Returns the canonical string form of this label.
    pub fn as_str(&self) -> &str {
        &self.repr
    }

    /// Returns true if this label begins with `@`, i.e. refers to an external repository.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Returns the repository component (empty string for the main repository).
    pub fn repo(&self) -> &str {
        let start = if self.external { 1 } else { 0 };
        &self.repr[start..self.repo_end]
    }

    /// Returns the package path component (possibly empty, for the top-level package).
    pub fn package_path(&self) -> &str {
        &self.repr[self.repo_end + 2..self.path_end]
    }

    /// Returns the target name.
    pub fn name(&self) -> &str {
        &self.repr[self.path_end + 1..]
    }

    /// Returns the label of the package that owns this target, shortened to just `:name` when
    /// `within_package` is the same package (used by the emitter).
    pub fn package(&self) -> PackageAddr {
        PackageAddr::new(self.external, self.repo().to_string(), self.package_path().to_string())
    }

    /// Peels this label down to its parent address: the owning package.
    ///
    /// Mirrors [`PackageAddr::parent`] for uniformity; see spec module §4.1.
    pub fn parent(&self) -> Addr {
        Addr::Package(self.package())
    }

    /// Returns a shortened reference suitable for emission when both labels are known to live in
    /// the same package: `:name`. Otherwise returns the full canonical label.
    pub fn shorten_within(&self, pkg: &PackageAddr) -> String {
        if !self.external
            && self.repo() == pkg.repo
            && self.package_path() == pkg.path
        {
            format!(":{}", self.name())
        } else {
            self.repr.to_string()
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.repr == other.repr
    }
}
impl Eq for Label {}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.repr.cmp(&other.repr)
    }
}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repr.hash(state)
    }
}

/// The address of a package: the combination of repository and package path that a `Package`
/// container node is keyed by.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PackageAddr {
    pub external: bool,
    pub repo: String,
    pub path: String,
}

impl PackageAddr {
    fn new(external: bool, repo: String, path: String) -> Self {
        Self {
            external,
            repo,
            path,
        }
    }

    /// Returns the repository address that owns this package.
    pub fn repository(&self) -> RepoAddr {
        RepoAddr {
            external: self.external,
            repo: self.repo.clone(),
        }
    }

    /// True for the top-most package in a repository (`<repo>//:name` form, empty path).
    pub fn is_top_level(&self) -> bool {
        self.path.is_empty()
    }

    /// Peels one path segment off, returning the parent package, or `None` if this is already
    /// the top-level package (whose parent is the repository, not another package).
    pub fn parent_package(&self) -> Option<PackageAddr> {
        if self.path.is_empty() {
            return None;
        }
        let parent_path = match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        };
        Some(PackageAddr::new(
            self.external,
            self.repo.clone(),
            parent_path.to_string(),
        ))
    }
}

impl fmt::Display for PackageAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}//{}",
            if self.external { "@" } else { "" },
            self.repo,
            self.path
        )
    }
}

/// The address of a repository container.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RepoAddr {
    pub external: bool,
    pub repo: String,
}

impl fmt::Display for RepoAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}//", if self.external { "@" } else { "" }, self.repo)
    }
}

/// A generalized address: any node in the forest can be reached by walking `parent()` from a
/// `Label` up through zero or more `Addr::Package`/`Addr::Repository` links to `Addr::Root` (for
/// the main repository's tree) or `Addr::ExternalRoot` (for every `@`-prefixed repository's tree;
/// spec module §3's "two forests").
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Addr {
    Root,
    ExternalRoot,
    Repository(RepoAddr),
    Package(PackageAddr),
}

impl Addr {
    /// Returns the parent of this address, or `None` if this is a forest root (neither root has a
    /// parent).
    pub fn parent(&self) -> Option<Addr> {
        match self {
            Addr::Root | Addr::ExternalRoot => None,
            Addr::Repository(repo) => {
                Some(if repo.external { Addr::ExternalRoot } else { Addr::Root })
            }
            Addr::Package(pkg) => match pkg.parent_package() {
                Some(parent) => Some(Addr::Package(parent)),
                None => Some(Addr::Repository(pkg.repository())),
            },
        }
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Addr::Root => write!(f, "<root>"),
            Addr::ExternalRoot => write!(f, "<external-root>"),
            Addr::Repository(r) => write!(f, "{}", r),
            Addr::Package(p) => write!(f, "{}", p),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '+' | '=')
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        let cases = [
            "//pkg:a",
            "//pkg/sub:a",
            "@foo//pkg:a",
            "//:toplevel",
            "@foo//:toplevel",
        ];
        for case in cases {
            let label = Label::parse(case).unwrap();
            assert_eq!(label.as_str(), case, "roundtrip for {}", case);
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["pkg:a", "//pkg", "//pkg:", "@//pkg:a:b".to_string().as_str()] {
            assert!(Label::parse(bad).is_err(), "expected error for {}", bad);
        }
    }

    #[test]
    fn parent_chain_reaches_root() {
        let label = Label::parse("//a/b:t").unwrap();
        let pkg = label.parent();
        assert_eq!(pkg.to_string(), "//a/b");
        let parent_pkg = pkg.parent().unwrap();
        assert_eq!(parent_pkg.to_string(), "//a");
        let repo = parent_pkg.parent().unwrap();
        assert_eq!(repo.to_string(), "//");
        let root = repo.parent().unwrap();
        assert!(matches!(root, Addr::Root));
        assert!(root.parent().is_none());
    }

    #[test]
    fn external_parent_chain_reaches_the_external_root_not_the_internal_one() {
        let label = Label::parse("@foo//a/b:t").unwrap();
        let pkg = label.parent();
        assert_eq!(pkg.to_string(), "@foo//a/b");
        let parent_pkg = pkg.parent().unwrap();
        assert_eq!(parent_pkg.to_string(), "@foo//a");
        let repo = parent_pkg.parent().unwrap();
        assert_eq!(repo.to_string(), "@foo//");
        let root = repo.parent().unwrap();
        assert!(matches!(root, Addr::ExternalRoot));
        assert!(root.parent().is_none());
    }

    #[test]
    fn shorten_within_same_package() {
        let label = Label::parse("//pkg:a.h").unwrap();
        let pkg = PackageAddr {
            external: false,
            repo: "".to_string(),
            path: "pkg".to_string(),
        };
        assert_eq!(label.shorten_within(&pkg), ":a.h");
        let other = PackageAddr {
            external: false,
            repo: "".to_string(),
            path: "other".to_string(),
        };
        assert_eq!(label.shorten_within(&other), "//pkg:a.h");
    }
}
