//! Resolve source sets, named groups of files picked out of a directory by glob patterns, into
//! concrete, ordered lists of files.
//!
//! ```ignore
//! let spec = SourceSetSpec::builder(SourceSetName::const_new("c"), "srcs")
//!     .include("**/*.c")
//!     .build();
//! let resolved = srcset_resolver::resolve(&spec)?;
//! ```

use srcset_cfg::{Config, ConfigSetBuilder};

pub mod cache;
pub mod error;
pub mod pattern;
pub mod resolve;
pub mod worker;

pub use cache::{LazySourceSet, SourceSetCache};
pub use error::{ErrorKind, PatternError, PatternKind, ResolveError, WalkFailure};
pub use resolve::{resolve, resolve_with, ResolveOptions};
pub use worker::ResolveWorker;

pub static FOLLOW_SYMLINKS: Config<bool> = Config::new(
    "follow_symlinks",
    "Descend into symlinked directories and include symlinked files.",
    false,
);

pub static DEFAULT_EXCLUDES: Config<bool> = Config::new(
    "default_excludes",
    "Skip files left behind by version control systems and editors.",
    true,
);

pub static RESOLVE_THREADS: Config<u64> = Config::new(
    "resolve_threads",
    "Number of threads used to resolve source sets in parallel.",
    4,
);

pub static RESOLVE_TIMEOUT_MS: Config<u64> = Config::new(
    "resolve_timeout_ms",
    "Abort resolving a source set after this many milliseconds, 0 disables the timeout.",
    0,
);

/// Register every [`Config`] this crate reads.
pub fn register_configs(builder: &mut ConfigSetBuilder) {
    builder
        .register(&FOLLOW_SYMLINKS)
        .register(&DEFAULT_EXCLUDES)
        .register(&RESOLVE_THREADS)
        .register(&RESOLVE_TIMEOUT_MS);
}
