//! Resolving many source sets at once.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use rayon::prelude::*;
use srcset_cfg::ConfigSet;
use srcset_types::{ResolvedSourceSet, SourceSetSpec};

use crate::error::ResolveError;
use crate::resolve::{resolve_with, ResolveOptions};

/// Worker pool for resolving source sets.
///
/// Walking a directory tree is blocking I/O, so we spawn a dedicated thread pool and run the
/// walks there. Every source set is independent, results are handed back in the order the
/// specs were provided.
#[derive(Clone)]
pub struct ResolveWorker {
    /// Thread pool the walks run on.
    pool: Arc<rayon::ThreadPool>,
}

impl ResolveWorker {
    /// Create a worker with `num_threads` threads, `0` lets the pool pick.
    pub fn new(num_threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|idx| format!("srcset-resolve-{idx}"))
            .build()?;
        Ok(ResolveWorker {
            pool: Arc::new(pool),
        })
    }

    /// Create a worker sized by [`RESOLVE_THREADS`](crate::RESOLVE_THREADS).
    pub fn from_configs(configs: &ConfigSet) -> Result<Self, rayon::ThreadPoolBuildError> {
        let num_threads = crate::RESOLVE_THREADS.read(configs);
        let num_threads = usize::try_from(num_threads).unwrap_or(usize::MAX);
        ResolveWorker::new(num_threads)
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Resolve a single spec on the pool.
    pub fn resolve(
        &self,
        spec: SourceSetSpec,
        options: ResolveOptions,
    ) -> impl Future<Output = Result<ResolvedSourceSet, ResolveError>> + 'static {
        self.run(move || resolve_with(&spec, &options))
    }

    /// Resolve every spec concurrently, results are in the same order as `specs`.
    pub async fn resolve_all(
        &self,
        specs: Vec<SourceSetSpec>,
        options: ResolveOptions,
    ) -> Vec<Result<ResolvedSourceSet, ResolveError>> {
        let futures = specs
            .into_iter()
            .map(|spec| self.resolve(spec, options.clone()));
        futures::future::join_all(futures).await
    }

    /// Blocking version of [`ResolveWorker::resolve_all`].
    pub fn resolve_all_blocking(
        &self,
        specs: &[SourceSetSpec],
        options: &ResolveOptions,
    ) -> Vec<Result<ResolvedSourceSet, ResolveError>> {
        self.pool
            .install(|| specs.par_iter().map(|spec| resolve_with(spec, options)).collect())
    }

    /// Run blocking `work` on the pool, returning a future that resolves with its output.
    pub fn run<T, W>(&self, work: W) -> impl Future<Output = T> + 'static
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
    {
        self.run_typed(work)
            .map(|result| result.expect("resolve worker dropped a job"))
    }

    /// Like [`ResolveWorker::run`] but returns the receiver directly, so callers can name it.
    pub fn run_typed<T, W>(&self, work: W) -> tokio::sync::oneshot::Receiver<T>
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pool.spawn(move || {
            let result = work();
            // We don't care if the receiver went away.
            let _ = tx.send(result);
        });
        rx
    }
}

impl fmt::Debug for ResolveWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveWorker")
            .field("num_threads", &self.num_threads())
            .finish()
    }
}
