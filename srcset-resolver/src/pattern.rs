//! Compiling include and exclude patterns into matchers.
//!
//! Patterns are relative to the root of a source set and always use `/` as a separator:
//!
//! * `*` and `?` match within a single path component.
//! * `**` matches any number of components, including none, so `**/*.c` matches `a.c`.
//! * A trailing `/` selects everything under a directory, `gen/` is the same as `gen/**`.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;

use compact_str::CompactString;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{PatternError, PatternKind};

/// Files that version control systems and editors leave behind, never part of a source set.
pub static DEFAULT_EXCLUDES: &[&str] = &[
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    "**/.DS_Store",
    "**/.cvsignore",
    "**/.gitattributes",
    "**/.gitignore",
    "**/.gitmodules",
    "**/.hgignore",
    "**/vssver.scc",
];

/// Directories skipped entirely when default excludes are enabled.
pub static DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &[".bzr", ".git", ".hg", ".svn", "CVS"];

/// Compiled include and exclude patterns for a single source set.
#[derive(Debug, Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: GlobSet,
    default_excludes: bool,
}

impl PatternSet {
    /// Compile the provided patterns.
    ///
    /// # Errors
    ///
    /// * Every pattern that is empty, absolute, or not valid glob syntax.
    pub fn compile(
        include: &[CompactString],
        exclude: &[CompactString],
        default_excludes: bool,
    ) -> Result<Self, Vec<PatternError>> {
        let mut errors = Vec::new();
        let include = build_set(PatternKind::Include, include, &mut errors);
        let mut exclude_builder = GlobSetBuilder::new();
        add_all(&mut exclude_builder, PatternKind::Exclude, exclude, &mut errors);
        if default_excludes {
            for pattern in DEFAULT_EXCLUDES {
                let glob = compile_one(pattern).expect("default excludes are valid");
                exclude_builder.add(glob);
            }
        }
        let exclude = finish(PatternKind::Exclude, exclude_builder, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(PatternSet {
            include,
            exclude,
            default_excludes,
        })
    }

    /// Returns true if the relative `path` is included and not excluded.
    pub fn is_match(&self, path: &Path) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }

    /// Returns true if a directory named `name` should not be descended into.
    pub fn is_pruned(&self, name: &OsStr) -> bool {
        self.default_excludes && DEFAULT_EXCLUDED_DIRECTORIES.iter().any(|dir| name == *dir)
    }
}

fn build_set(
    kind: PatternKind,
    patterns: &[CompactString],
    errors: &mut Vec<PatternError>,
) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    add_all(&mut builder, kind, patterns, errors);
    finish(kind, builder, errors)
}

fn add_all(
    builder: &mut GlobSetBuilder,
    kind: PatternKind,
    patterns: &[CompactString],
    errors: &mut Vec<PatternError>,
) {
    for (index, raw) in patterns.iter().enumerate() {
        let glob = normalize(raw).and_then(|pattern| compile_one(&pattern));
        match glob {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(reason) => errors.push(PatternError {
                kind,
                index,
                pattern: raw.clone(),
                reason,
            }),
        }
    }
}

fn finish(kind: PatternKind, builder: GlobSetBuilder, errors: &mut Vec<PatternError>) -> GlobSet {
    // Individual globs were already validated, so this only fails on resource limits.
    builder.build().unwrap_or_else(|err| {
        errors.push(PatternError {
            kind,
            index: 0,
            pattern: CompactString::const_new(""),
            reason: err.to_string(),
        });
        GlobSet::empty()
    })
}

fn compile_one(pattern: &str) -> Result<globset::Glob, String> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|err| err.kind().to_string())
}

/// Normalize a raw pattern, rejecting ones that can never match a relative path.
fn normalize(raw: &str) -> Result<Cow<'_, str>, String> {
    let mut pattern = raw;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }

    if pattern.is_empty() {
        return Err("empty pattern".to_string());
    }
    if pattern.starts_with('/') || Path::new(pattern).is_absolute() {
        return Err("patterns must be relative to the source set root".to_string());
    }

    if pattern.ends_with('/') {
        Ok(Cow::Owned(format!("{pattern}**")))
    } else {
        Ok(Cow::Borrowed(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(include: &[&str], exclude: &[&str]) -> PatternSet {
        let include: Vec<CompactString> = include.iter().map(|p| CompactString::new(p)).collect();
        let exclude: Vec<CompactString> = exclude.iter().map(|p| CompactString::new(p)).collect();
        PatternSet::compile(&include, &exclude, true).unwrap()
    }

    #[test]
    fn double_star_matches_zero_directories() {
        let patterns = set(&["**/*.c"], &[]);
        assert!(patterns.is_match(Path::new("a.c")));
        assert!(patterns.is_match(Path::new("srcs/a.c")));
        assert!(patterns.is_match(Path::new("srcs/deep/er/a.c")));
        assert!(!patterns.is_match(Path::new("srcs/b.h")));
    }

    #[test]
    fn single_star_stays_in_component() {
        let patterns = set(&["*.c", "srcs/?.h"], &[]);
        assert!(patterns.is_match(Path::new("main.c")));
        assert!(!patterns.is_match(Path::new("srcs/main.c")));
        assert!(patterns.is_match(Path::new("srcs/a.h")));
        assert!(!patterns.is_match(Path::new("srcs/ab.h")));
    }

    #[test]
    fn exclude_wins() {
        let patterns = set(&["**/*"], &["**/*.h", "gen/"]);
        assert!(patterns.is_match(Path::new("srcs/a.c")));
        assert!(!patterns.is_match(Path::new("srcs/b.h")));
        assert!(!patterns.is_match(Path::new("gen/a.c")));
        assert!(!patterns.is_match(Path::new("gen/nested/a.c")));
    }

    #[test]
    fn leading_dot_slash_is_ignored() {
        let patterns = set(&["./srcs/*.c"], &[]);
        assert!(patterns.is_match(Path::new("srcs/a.c")));
    }

    #[test]
    fn default_excludes() {
        let patterns = set(&["**/*"], &[]);
        assert!(!patterns.is_match(Path::new("srcs/.DS_Store")));
        assert!(!patterns.is_match(Path::new("srcs/a.c~")));
        assert!(!patterns.is_match(Path::new(".gitignore")));
        assert!(patterns.is_pruned(OsStr::new(".git")));
        assert!(!patterns.is_pruned(OsStr::new("srcs")));

        let plain = PatternSet::compile(&[CompactString::new("**/*")], &[], false).unwrap();
        assert!(plain.is_match(Path::new("srcs/.DS_Store")));
        assert!(!plain.is_pruned(OsStr::new(".git")));
    }

    #[test]
    fn empty_include_matches_nothing() {
        let patterns = set(&[], &[]);
        assert!(!patterns.is_match(Path::new("a.c")));
    }

    #[test]
    fn reports_every_invalid_pattern() {
        let include = [CompactString::new("srcs/[a"), CompactString::new("**/*.c")];
        let exclude = [
            CompactString::new("/abs/*.c"),
            CompactString::new(""),
            CompactString::new("{a,b"),
        ];
        let errors = PatternSet::compile(&include, &exclude, false).unwrap_err();

        let found: Vec<_> = errors.iter().map(|err| (err.kind, err.index)).collect();
        assert_eq!(
            found,
            [
                (PatternKind::Include, 0),
                (PatternKind::Exclude, 0),
                (PatternKind::Exclude, 1),
                (PatternKind::Exclude, 2),
            ]
        );
        assert_eq!(errors[2].reason, "empty pattern");
    }
}
