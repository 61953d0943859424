//! Lazily resolved source sets that can be invalidated when the filesystem changes.
//!
//! Nothing in here watches the filesystem, callers tell us when something changed, see the
//! `srcset-watch` crate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use srcset_ore::assert_none;
use srcset_types::{ResolvedSourceSet, SourceSetName, SourceSetSpec};

use crate::error::ResolveError;
use crate::resolve::{resolve_with, ResolveOptions};

/// A [`SourceSetSpec`] that is resolved on first use and cached until invalidated.
///
/// Errors are never cached, the next [`LazySourceSet::get`] tries again.
#[derive(Debug)]
pub struct LazySourceSet {
    spec: SourceSetSpec,
    options: ResolveOptions,
    /// Absolute, but not canonical, root. The root might not exist yet.
    root: PathBuf,
    resolved: Mutex<Option<Arc<ResolvedSourceSet>>>,
}

impl LazySourceSet {
    pub fn new(spec: SourceSetSpec, options: ResolveOptions) -> Self {
        let given = spec.root_directory();
        let root = std::path::absolute(given).unwrap_or_else(|_| given.to_path_buf());

        LazySourceSet {
            spec,
            options,
            root,
            resolved: Mutex::new(None),
        }
    }

    pub fn spec(&self) -> &SourceSetSpec {
        &self.spec
    }

    /// Return the cached resolution, resolving first if there is none.
    ///
    /// Concurrent callers wait for a single in-progress resolution.
    pub fn get(&self) -> Result<Arc<ResolvedSourceSet>, ResolveError> {
        let mut cached = self.resolved.lock().expect("lazy source set lock poisoned");
        if let Some(resolved) = &*cached {
            return Ok(Arc::clone(resolved));
        }

        let resolved = Arc::new(resolve_with(&self.spec, &self.options)?);
        *cached = Some(Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Drop the cached resolution. Returns true if there was one.
    pub fn invalidate(&self) -> bool {
        let mut cached = self.resolved.lock().expect("lazy source set lock poisoned");
        let was_resolved = cached.take().is_some();
        if was_resolved {
            tracing::debug!(name = %self.spec.name(), "invalidated source set");
        }
        was_resolved
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
            .lock()
            .expect("lazy source set lock poisoned")
            .is_some()
    }

    /// Resolve again, replacing the cached value.
    ///
    /// Returns true if the membership of the set changed compared to the previous resolution,
    /// or if there was no previous resolution.
    pub fn refresh(&self) -> Result<bool, ResolveError> {
        let mut cached = self.resolved.lock().expect("lazy source set lock poisoned");
        let previous = cached.take().map(|resolved| resolved.fingerprint());
        let resolved = resolve_with(&self.spec, &self.options)?;
        let changed = previous != Some(resolved.fingerprint());
        *cached = Some(Arc::new(resolved));
        Ok(changed)
    }

    /// Returns true if a change to `path` can affect this set, i.e. `path` is at or beneath the
    /// root, or is an ancestor of the root which may have created or removed it.
    pub fn covers(&self, path: &Path) -> bool {
        self.roots()
            .iter()
            .any(|root| path.starts_with(root) || root.starts_with(path))
    }

    /// The absolute root followed by its canonical form, if the root exists and they differ.
    ///
    /// Checked on every call, the root can be created or replaced by a symlink at any time.
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.root.clone()];
        if let Ok(canonical) = std::fs::canonicalize(&self.root) {
            if canonical != self.root {
                roots.push(canonical);
            }
        }
        roots
    }
}

/// A collection of [`LazySourceSet`]s, keyed by name.
#[derive(Debug, Default)]
pub struct SourceSetCache {
    sets: BTreeMap<SourceSetName, LazySourceSet>,
}

impl SourceSetCache {
    pub fn new() -> Self {
        SourceSetCache::default()
    }

    /// Create a cache for all of `specs`, resolved with the same `options`.
    ///
    /// # Panics
    /// * If two specs share a name.
    pub fn from_specs<I>(specs: I, options: &ResolveOptions) -> Self
    where
        I: IntoIterator<Item = SourceSetSpec>,
    {
        let mut cache = SourceSetCache::new();
        for spec in specs {
            cache.insert(LazySourceSet::new(spec, options.clone()));
        }
        cache
    }

    /// Add a set to the cache.
    ///
    /// # Panics
    /// * If a set with the same name is already cached.
    pub fn insert(&mut self, set: LazySourceSet) {
        let name = set.spec().name().clone();
        let prev = self.sets.insert(name.clone(), set);
        assert_none!(prev, "source set '{name}' cached more than once");
    }

    pub fn get(&self, name: &SourceSetName) -> Option<Result<Arc<ResolvedSourceSet>, ResolveError>> {
        self.sets.get(name).map(LazySourceSet::get)
    }

    pub fn set(&self, name: &SourceSetName) -> Option<&LazySourceSet> {
        self.sets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &SourceSetName> {
        self.sets.keys()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Every distinct root directory in the cache.
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self
            .sets
            .values()
            .filter_map(|set| set.roots().pop())
            .collect();
        roots.sort();
        roots.dedup();
        roots
    }

    /// Invalidate every set whose root contains `path`, returning the names of the sets that
    /// had a cached resolution.
    pub fn invalidate_path(&self, path: &Path) -> Vec<SourceSetName> {
        self.sets
            .iter()
            .filter(|(_, set)| set.covers(path))
            .filter(|(_, set)| set.invalidate())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn invalidate_all(&self) -> usize {
        self.sets.values().filter(|set| set.invalidate()).count()
    }
}
