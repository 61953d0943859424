//! Turning a [`SourceSetSpec`] into a [`ResolvedSourceSet`].

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use srcset_cfg::ConfigSet;
use srcset_types::{ResolvedSourceSet, SourceSetSpec};
use walkdir::WalkDir;

use crate::error::{ResolveError, WalkFailure};
use crate::pattern::PatternSet;

/// Knobs for a single resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Descend into symlinked directories and include symlinked files.
    pub follow_symlinks: bool,
    /// Apply [`DEFAULT_EXCLUDES`](crate::pattern::DEFAULT_EXCLUDES).
    pub default_excludes: bool,
    /// Abort the traversal once it has run for this long.
    pub timeout: Option<Duration>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            follow_symlinks: false,
            default_excludes: true,
            timeout: None,
        }
    }
}

impl ResolveOptions {
    /// Read options from the current values in `configs`.
    pub fn from_configs(configs: &ConfigSet) -> Self {
        let timeout_ms = crate::RESOLVE_TIMEOUT_MS.read(configs);
        ResolveOptions {
            follow_symlinks: crate::FOLLOW_SYMLINKS.read(configs),
            default_excludes: crate::DEFAULT_EXCLUDES.read(configs),
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Resolve `spec` with the default [`ResolveOptions`].
pub fn resolve(spec: &SourceSetSpec) -> Result<ResolvedSourceSet, ResolveError> {
    resolve_with(spec, &ResolveOptions::default())
}

/// Resolve `spec`, walking everything underneath its root directory.
///
/// Files are kept if their path relative to the root matches an include pattern and no exclude
/// pattern. The result is sorted by relative path.
///
/// # Errors
///
/// * [`ResolveError::InvalidPattern`] if any pattern fails to compile, checked before touching
///   the filesystem.
/// * [`ResolveError::NotFound`] or [`ResolveError::NotADirectory`] for a bad root.
/// * [`ResolveError::PartialResolution`] if some paths could not be read.
/// * [`ResolveError::Timeout`] if [`ResolveOptions::timeout`] elapsed.
pub fn resolve_with(
    spec: &SourceSetSpec,
    options: &ResolveOptions,
) -> Result<ResolvedSourceSet, ResolveError> {
    let start = Instant::now();
    let deadline = options.timeout.map(|timeout| start + timeout);
    let name = spec.name();

    let patterns = PatternSet::compile(
        spec.include_patterns(),
        spec.exclude_patterns(),
        options.default_excludes,
    )
    .map_err(|errors| ResolveError::InvalidPattern {
        name: name.clone(),
        errors,
    })?;

    let root = match open_root(spec)? {
        Root::Directory(root) => root,
        Root::Unreadable(root, failure) => {
            tracing::warn!(?root, %failure, "root of source set is unreadable");
            let resolved = finish(spec, root, Vec::new());
            return Err(ResolveError::PartialResolution {
                resolved: Box::new(resolved),
                failures: vec![failure],
            });
        }
    };
    tracing::debug!(%name, ?root, "resolving source set");

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .follow_links(options.follow_symlinks)
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && patterns.is_pruned(entry.file_name())));

    let mut matched: Vec<(Vec<u8>, PathBuf)> = Vec::new();
    let mut failures = Vec::new();
    for entry in walker {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                let elapsed = start.elapsed();
                tracing::warn!(%name, ?elapsed, "source set resolution timed out");
                return Err(ResolveError::Timeout {
                    name: name.clone(),
                    elapsed,
                });
            }
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let failure = WalkFailure::from_walkdir(&root, err);
                tracing::warn!(%name, %failure, "failed to read path");
                failures.push(failure);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        if patterns.is_match(relative) {
            matched.push((sort_key(relative), relative.to_path_buf()));
        }
    }

    // The walk yields every relative path at most once, so sorting is all that's needed.
    matched.sort_by(|a, b| a.0.cmp(&b.0));
    let relative = matched.into_iter().map(|(_, path)| path).collect();
    let resolved = finish(spec, root, relative);

    tracing::info!(
        %name,
        num_files = resolved.len(),
        num_failures = failures.len(),
        elapsed = ?start.elapsed(),
        "resolved source set"
    );

    if failures.is_empty() {
        Ok(resolved)
    } else {
        Err(ResolveError::PartialResolution {
            resolved: Box::new(resolved),
            failures,
        })
    }
}

enum Root {
    Directory(PathBuf),
    Unreadable(PathBuf, WalkFailure),
}

fn open_root(spec: &SourceSetSpec) -> Result<Root, ResolveError> {
    let root = spec.root_directory();
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ResolveError::NotFound {
                name: spec.name().clone(),
                root: root.to_path_buf(),
            });
        }
        Err(err) => {
            let failure = WalkFailure::from_io(root.to_path_buf(), &err);
            return Ok(Root::Unreadable(absolute(root), failure));
        }
    };
    if !metadata.is_dir() {
        return Err(ResolveError::NotADirectory {
            name: spec.name().clone(),
            root: root.to_path_buf(),
        });
    }

    match std::fs::canonicalize(root) {
        Ok(canonical) => Ok(Root::Directory(canonical)),
        Err(err) => {
            let failure = WalkFailure::from_io(root.to_path_buf(), &err);
            Ok(Root::Unreadable(absolute(root), failure))
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn finish(spec: &SourceSetSpec, root: PathBuf, relative: Vec<PathBuf>) -> ResolvedSourceSet {
    let fingerprint = srcset_ore::hash::fingerprint_seq(
        relative.iter().map(|path| path.as_os_str().as_encoded_bytes()),
    );
    ResolvedSourceSet::new(spec.name().clone(), root, relative, fingerprint)
}

/// Platform independent ordering key, the raw bytes of each component joined with `/`.
fn sort_key(relative: &Path) -> Vec<u8> {
    let mut key = Vec::with_capacity(relative.as_os_str().len());
    for (i, component) in relative.components().enumerate() {
        if i > 0 {
            key.push(b'/');
        }
        key.extend_from_slice(component.as_os_str().as_encoded_bytes());
    }
    key
}
