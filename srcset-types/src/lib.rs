//! Types used throughout `srcset`.
//!
//! The goal of this crate is to be very lightweight, so take care with adding dependencies.

use std::fmt;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use smallvec::SmallVec;

/// List of glob patterns, most source sets only have one or two.
pub type Patterns = SmallVec<[CompactString; 2]>;

/// Name of a source set, e.g. `c`, `private-headers`.
///
/// ### Specification
/// * Non-empty.
/// * Only ASCII alphanumerics, `-`, and `_`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceSetName(CompactString);

impl SourceSetName {
    pub fn new(name: &str) -> Result<Self, InvalidName> {
        if name.is_empty() {
            return Err(InvalidName::Empty);
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(InvalidName::Character {
                name: name.to_string(),
                c,
            });
        }
        Ok(SourceSetName(CompactString::new(name)))
    }

    /// Create a [`SourceSetName`] from a string known to be valid at compile time.
    pub const fn const_new(name: &'static str) -> Self {
        SourceSetName(CompactString::const_new(name))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SourceSetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SourceSetName {
    type Err = InvalidName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceSetName::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidName {
    #[error("source set name cannot be empty")]
    Empty,
    #[error("invalid character {c:?} in source set name '{name}'")]
    Character { name: String, c: char },
}

/// Definition of a single source set: where to look and what to pick up.
///
/// Immutable once constructed, see [`SourceSetSpecBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSetSpec {
    name: SourceSetName,
    root_directory: PathBuf,
    include_patterns: Patterns,
    exclude_patterns: Patterns,
}

impl SourceSetSpec {
    /// Returns a new [`SourceSetSpecBuilder`].
    pub fn builder(name: SourceSetName, root_directory: impl Into<PathBuf>) -> SourceSetSpecBuilder {
        SourceSetSpecBuilder {
            name,
            root_directory: root_directory.into(),
            include_patterns: Patterns::new(),
            exclude_patterns: Patterns::new(),
        }
    }

    pub fn name(&self) -> &SourceSetName {
        &self.name
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn include_patterns(&self) -> &[CompactString] {
        &self.include_patterns[..]
    }

    pub fn exclude_patterns(&self) -> &[CompactString] {
        &self.exclude_patterns[..]
    }
}

/// A builder for a [`SourceSetSpec`].
#[derive(Debug, Clone)]
pub struct SourceSetSpecBuilder {
    name: SourceSetName,
    root_directory: PathBuf,
    include_patterns: Patterns,
    exclude_patterns: Patterns,
}

impl SourceSetSpecBuilder {
    /// Append an include pattern, order is preserved.
    pub fn include(mut self, pattern: impl Into<CompactString>) -> Self {
        self.include_patterns.push(pattern.into());
        self
    }

    /// Append an exclude pattern, order is preserved.
    pub fn exclude(mut self, pattern: impl Into<CompactString>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    pub fn includes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        self.include_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        self.exclude_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Consumes this builder constructing a [`SourceSetSpec`].
    pub fn build(self) -> SourceSetSpec {
        SourceSetSpec {
            name: self.name,
            root_directory: self.root_directory,
            include_patterns: self.include_patterns,
            exclude_patterns: self.exclude_patterns,
        }
    }
}

/// The concrete files of a [`SourceSetSpec`] for one snapshot of the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSourceSet {
    name: SourceSetName,
    /// Canonical root the relative paths are based on.
    root: PathBuf,
    /// Absolute paths, ordered by their relative path.
    files: Vec<PathBuf>,
    /// Paths relative to `root`, same order as `files`.
    relative: Vec<PathBuf>,
    fingerprint: Fingerprint,
}

impl ResolvedSourceSet {
    /// Create a [`ResolvedSourceSet`] from relative paths that are already sorted and unique.
    pub fn new(
        name: SourceSetName,
        root: PathBuf,
        relative: Vec<PathBuf>,
        fingerprint: Fingerprint,
    ) -> Self {
        debug_assert!(
            relative.windows(2).all(|w| w[0] != w[1]),
            "duplicate paths in resolved source set"
        );
        let files = relative.iter().map(|rel| root.join(rel)).collect();
        ResolvedSourceSet {
            name,
            root,
            files,
            relative,
            fingerprint,
        }
    }

    pub fn name(&self) -> &SourceSetName {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths of every file in this set.
    pub fn files(&self) -> &[PathBuf] {
        &self.files[..]
    }

    /// Paths relative to [`ResolvedSourceSet::root`].
    pub fn relative_files(&self) -> &[PathBuf] {
        &self.relative[..]
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns true if the absolute `path` is a member of this set.
    pub fn contains(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(rel) => self.relative.iter().any(|r| r == rel),
            Err(_) => false,
        }
    }

    /// Hash over the ordered membership of this set.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

/// A 128-bit hash identifying some content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(u128);

impl Fingerprint {
    pub const fn new(val: u128) -> Self {
        Fingerprint(val)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
