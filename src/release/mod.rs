// src/release/mod.rs

//! Release model: packages carved into named slices.
//!
//! A release definition is a directory with a top-level manifest and one
//! file per package under `slices/`. Loading a definition produces an
//! immutable [`Release`] with every structural invariant checked; from
//! there, [`select`] builds ordered [`Selection`]s of slices on demand.
//!
//! The model stays fully owned by the Release. Slices refer to each other
//! only through [`SliceKey`] values, so the dependency graph is rebuilt
//! from names whenever ordering is needed.

mod conflict;
mod loader;
mod order;
mod parser;
mod select;
mod serialize;

pub use loader::{read_release, RELEASE_FILENAME};
pub use select::{select, Selection};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use sequoia_openpgp as openpgp;

use crate::error::Result;
use crate::names::SliceKey;

/// A collection of package slices targeting a particular distribution
/// version.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    /// Directory the release definition was read from.
    pub path: PathBuf,
    pub packages: BTreeMap<String, Package>,
    pub archives: BTreeMap<String, Archive>,
    /// Archive assigned to packages that do not name one themselves.
    pub default_archive: String,
}

/// The location binary packages are obtained from.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    pub name: String,
    pub version: String,
    pub suites: Vec<String>,
    pub components: Vec<String>,
    pub pub_keys: Vec<openpgp::Cert>,
}

/// A binary package and the slices carved out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    /// Definition file path relative to the release root.
    pub path: String,
    pub archive: String,
    pub slices: BTreeMap<String, Slice>,
}

/// A named subset of a package's contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub package: String,
    pub name: String,
    /// Slices that must be present whenever this one is, in declaration
    /// order.
    pub essential: Vec<SliceKey>,
    pub contents: BTreeMap<String, PathInfo>,
    pub scripts: SliceScripts,
}

/// Scripts run while building a slice into the target root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceScripts {
    pub mutate: String,
}

impl Slice {
    /// The key other slices use to refer to this one.
    pub fn key(&self) -> SliceKey {
        SliceKey::new(&self.package, &self.name)
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.package, self.name)
    }
}

/// What a content path produces in the target root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    /// Create a directory.
    Dir,
    /// Extract a file from the package. A `None` source means the file
    /// comes from the same path it is extracted to.
    Copy(Option<String>),
    /// Extract every package path matching the wildcard pattern.
    Glob,
    /// Write a file with the given content.
    Text(String),
    /// Create a symbolic link.
    Symlink(String),
    /// Reserve a directory tree for content produced at build time.
    Generate(GenerateKind),
}

impl PathKind {
    /// The option keyword the kind answers to in a path declaration.
    pub fn name(&self) -> &'static str {
        match self {
            PathKind::Dir => "dir",
            PathKind::Copy(_) => "copy",
            PathKind::Glob => "glob",
            PathKind::Text(_) => "text",
            PathKind::Symlink(_) => "symlink",
            PathKind::Generate(_) => "generate",
        }
    }

    /// Whether paths of this kind claim other paths by wildcard.
    pub(crate) fn is_wildcard(&self) -> bool {
        matches!(self, PathKind::Glob | PathKind::Generate(_))
    }
}

/// Content produced into a generate directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateKind {
    /// A manifest describing everything extracted into the root.
    Manifest,
    /// A value this engine does not understand. Tolerated until the
    /// owning slice is actually selected.
    Unknown(String),
}

impl GenerateKind {
    pub(crate) fn from_label(label: &str) -> Self {
        match label {
            "manifest" => GenerateKind::Manifest,
            other => GenerateKind::Unknown(other.to_string()),
        }
    }

    /// The value as written in a declaration.
    pub fn label(&self) -> &str {
        match self {
            GenerateKind::Manifest => "manifest",
            GenerateKind::Unknown(label) => label,
        }
    }
}

/// Lifetime marker for a content path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathUntil {
    /// The path stays in the target root.
    #[default]
    None,
    /// The path exists only while mutation scripts run and is removed
    /// afterwards.
    Mutate,
}

/// Full details about one content path of a slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    pub kind: PathKind,
    /// Unix permission bits; zero inherits the source mode.
    pub mode: u32,
    /// Whether mutation scripts may rewrite the content.
    pub mutable: bool,
    pub until: PathUntil,
    /// Architectures the path is restricted to; empty means all.
    pub arch: Vec<String>,
}

impl PathInfo {
    /// Whether this path produces the same file or directory entry as
    /// `other`. The mutable flag must agree too, as it is a shared
    /// admission that the content is not fully determined upfront.
    pub fn same_content(&self, other: &PathInfo) -> bool {
        self.kind == other.kind && self.mode == other.mode && self.mutable == other.mutable
    }
}

impl Release {
    /// Check release-wide invariants: content conflicts between slices
    /// and cycles in the essential graph.
    fn validate(&self) -> Result<()> {
        let keys = conflict::check(self)?;
        order::order(&self.packages, &keys)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(kind: PathKind) -> PathInfo {
        PathInfo {
            kind,
            mode: 0,
            mutable: false,
            until: PathUntil::None,
            arch: Vec::new(),
        }
    }

    #[test]
    fn test_same_content() {
        let a = info(PathKind::Copy(None));
        let b = info(PathKind::Copy(None));
        assert!(a.same_content(&b));

        let b = info(PathKind::Copy(Some("/bin/ls".to_string())));
        assert!(!a.same_content(&b));

        let a = info(PathKind::Text("hello".to_string()));
        let b = info(PathKind::Text("hello".to_string()));
        assert!(a.same_content(&b));

        let mut b = b.clone();
        b.mode = 0o600;
        assert!(!a.same_content(&b));

        let mut b = info(PathKind::Text("hello".to_string()));
        b.mutable = true;
        assert!(!a.same_content(&b));

        // Until and arch are not content.
        let mut b = info(PathKind::Text("hello".to_string()));
        b.until = PathUntil::Mutate;
        b.arch = vec!["amd64".to_string()];
        assert!(a.same_content(&b));
    }

    #[test]
    fn test_generate_kind_label() {
        assert_eq!(GenerateKind::from_label("manifest"), GenerateKind::Manifest);
        assert_eq!(
            GenerateKind::from_label("bogus"),
            GenerateKind::Unknown("bogus".to_string())
        );
        assert_eq!(GenerateKind::Manifest.label(), "manifest");
        assert_eq!(GenerateKind::Unknown("bogus".to_string()).label(), "bogus");
    }

    #[test]
    fn test_slice_display() {
        let slice = Slice {
            package: "libc6".to_string(),
            name: "libs".to_string(),
            essential: Vec::new(),
            contents: BTreeMap::new(),
            scripts: SliceScripts::default(),
        };
        assert_eq!(slice.to_string(), "libc6_libs");
        assert_eq!(slice.key(), SliceKey::new("libc6", "libs"));
    }
}
