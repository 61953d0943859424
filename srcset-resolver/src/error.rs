//! Errors produced while resolving a source set.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use compact_str::CompactString;
use srcset_types::{ResolvedSourceSet, SourceSetName};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The root directory of the source set does not exist.
    #[error("root of source set '{name}' does not exist: {root:?}")]
    NotFound { name: SourceSetName, root: PathBuf },
    /// The root exists but is something other than a directory.
    #[error("root of source set '{name}' is not a directory: {root:?}")]
    NotADirectory { name: SourceSetName, root: PathBuf },
    /// One or more patterns failed to parse, every bad pattern is reported.
    #[error("source set '{name}' has invalid patterns: {}", DisplayList(.errors))]
    InvalidPattern {
        name: SourceSetName,
        errors: Vec<PatternError>,
    },
    /// Part of the tree could not be read. `resolved` holds everything that could be.
    #[error(
        "source set '{}' partially resolved, {} path(s) could not be read: {}",
        .resolved.name(),
        .failures.len(),
        DisplayList(.failures)
    )]
    PartialResolution {
        resolved: Box<ResolvedSourceSet>,
        failures: Vec<WalkFailure>,
    },
    /// Traversal took longer than the configured timeout.
    #[error("timed out resolving source set '{name}' after {elapsed:?}")]
    Timeout {
        name: SourceSetName,
        elapsed: Duration,
    },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::NotFound { .. } => ErrorKind::NotFound,
            ResolveError::NotADirectory { .. } => ErrorKind::NotADirectory,
            ResolveError::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            ResolveError::PartialResolution { .. } => ErrorKind::PartialResolution,
            ResolveError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Name of the source set that failed.
    pub fn name(&self) -> &SourceSetName {
        match self {
            ResolveError::NotFound { name, .. }
            | ResolveError::NotADirectory { name, .. }
            | ResolveError::InvalidPattern { name, .. }
            | ResolveError::Timeout { name, .. } => name,
            ResolveError::PartialResolution { resolved, .. } => resolved.name(),
        }
    }

    /// The files that were resolved before the failure, if any were.
    pub fn partial(&self) -> Option<&ResolvedSourceSet> {
        match self {
            ResolveError::PartialResolution { resolved, .. } => Some(resolved),
            _ => None,
        }
    }
}

/// Coarse classification of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    NotFound,
    NotADirectory,
    InvalidPattern,
    PartialResolution,
    Timeout,
}

impl ErrorKind {
    /// Process exit status for this kind of error, following `sysexits.h`.
    pub const fn exit_code(self) -> i32 {
        match self {
            // EX_NOINPUT
            ErrorKind::NotFound | ErrorKind::NotADirectory => 66,
            // EX_DATAERR
            ErrorKind::InvalidPattern => 65,
            // EX_IOERR
            ErrorKind::PartialResolution => 74,
            // EX_TEMPFAIL
            ErrorKind::Timeout => 75,
        }
    }
}

/// Whether a pattern was given as an include or an exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Include,
    Exclude,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Include => f.write_str("include"),
            PatternKind::Exclude => f.write_str("exclude"),
        }
    }
}

/// A single pattern that could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} pattern #{index} '{pattern}': {reason}")]
pub struct PatternError {
    pub kind: PatternKind,
    /// Position of the pattern within its list.
    pub index: usize,
    pub pattern: CompactString,
    pub reason: String,
}

/// A path that could not be read during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkFailure {
    pub path: PathBuf,
    /// Underlying I/O error kind, `None` for symlink loops.
    pub io_kind: Option<io::ErrorKind>,
    pub message: String,
}

impl WalkFailure {
    pub(crate) fn from_walkdir(root: &std::path::Path, err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map(|path| path.to_path_buf())
            .unwrap_or_else(|| root.to_path_buf());
        let io_kind = err.io_error().map(|io| io.kind());
        WalkFailure {
            path,
            io_kind,
            message: err.to_string(),
        }
    }

    pub(crate) fn from_io(path: PathBuf, err: &io::Error) -> Self {
        WalkFailure {
            path,
            io_kind: Some(err.kind()),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for WalkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self.path, self.message)
    }
}

/// Formats a list of items separated by `; `.
struct DisplayList<'a, T>(&'a [T]);

impl<T: fmt::Display> fmt::Display for DisplayList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}
