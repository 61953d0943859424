//! Keep a [`SourceSetCache`] honest by invalidating source sets as their files change.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, DebouncedEvent, Debouncer};
use srcset_cfg::{Config, ConfigSet, ConfigSetBuilder};
use srcset_resolver::SourceSetCache;
use srcset_types::SourceSetName;

pub static WATCH_DEBOUNCE_MS: Config<u64> = Config::new(
    "watch_debounce_ms",
    "Coalesce filesystem events over this many milliseconds before invalidating.",
    500,
);

/// Register every [`Config`] this crate reads.
pub fn register_configs(builder: &mut ConfigSetBuilder) {
    builder.register(&WATCH_DEBOUNCE_MS);
}

/// A [`SourceSetCache`] whose roots are watched, any change underneath a root invalidates the
/// source sets rooted there.
///
/// Roots that don't exist yet are watched through their nearest existing ancestor. Once one is
/// created it gets watched itself and its source sets are invalidated.
pub struct WatchedSourceSets {
    cache: Arc<SourceSetCache>,
    /// Dropping the debouncer closes the event channel, which ends the watch thread.
    _watches: Arc<Mutex<Watches>>,
    _watcher: std::thread::JoinHandle<()>,
}

struct Watches {
    debouncer: Debouncer<RecommendedWatcher>,
    roots: RootWatches,
}

impl Watches {
    fn sync(&mut self) -> Result<Vec<PathBuf>, notify::Error> {
        self.roots.sync(self.debouncer.watcher())
    }
}

impl WatchedSourceSets {
    /// Start watching every root in `cache`, events are coalesced over `debounce`.
    pub fn new(cache: Arc<SourceSetCache>, debounce: Duration) -> Result<Self, anyhow::Error> {
        let (tx, rx) = std::sync::mpsc::channel();
        let debouncer = notify_debouncer_mini::new_debouncer(debounce, tx)?;
        let mut watches = Watches {
            debouncer,
            roots: RootWatches::new(cache.roots()),
        };
        watches.sync()?;
        let watches = Arc::new(Mutex::new(watches));

        let cache_ = Arc::clone(&cache);
        let watches_ = Arc::downgrade(&watches);
        let watcher = std::thread::Builder::new()
            .name("srcset-watch".to_string())
            .spawn(move || watch_loop(&cache_, &watches_, rx))?;

        Ok(WatchedSourceSets {
            cache,
            _watches: watches,
            _watcher: watcher,
        })
    }

    /// Like [`WatchedSourceSets::new`] with the debounce from [`WATCH_DEBOUNCE_MS`].
    pub fn from_configs(
        cache: Arc<SourceSetCache>,
        configs: &ConfigSet,
    ) -> Result<Self, anyhow::Error> {
        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS.read(configs));
        WatchedSourceSets::new(cache, debounce)
    }

    pub fn cache(&self) -> &Arc<SourceSetCache> {
        &self.cache
    }
}

fn watch_loop(
    cache: &SourceSetCache,
    watches: &Weak<Mutex<Watches>>,
    rx: Receiver<DebounceEventResult>,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let invalidated = invalidate_for_events(cache, &events);
                if !invalidated.is_empty() {
                    tracing::info!(
                        ?invalidated,
                        num_events = events.len(),
                        "invalidated source sets"
                    );
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(?err, "error from file watcher, invalidating everything");
                cache.invalidate_all();
            }
            Err(_) => {
                tracing::debug!("file watcher closed");
                return;
            }
        }

        let Some(watches) = watches.upgrade() else {
            return;
        };
        let synced = watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sync();
        match synced {
            // Files may have landed in a new root before we started watching it.
            Ok(created) => {
                let invalidated = invalidate_for_paths(cache, created);
                if !invalidated.is_empty() {
                    tracing::info!(?invalidated, "source set roots created");
                }
            }
            Err(err) => tracing::warn!(?err, "failed to update watched roots"),
        }
    }
}

/// Which paths we watch on behalf of a set of source set roots.
///
/// Existing roots are watched recursively. A missing root is pending: its nearest existing
/// ancestor is watched non-recursively so we hear about the root (or a directory on the way to
/// it) being created.
#[derive(Debug, Default)]
struct RootWatches {
    recursive: BTreeSet<PathBuf>,
    ancestors: BTreeSet<PathBuf>,
    pending: BTreeSet<PathBuf>,
}

impl RootWatches {
    fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        RootWatches {
            pending: roots.into_iter().collect(),
            ..RootWatches::default()
        }
    }

    fn is_covered(&self, path: &Path) -> bool {
        self.recursive.iter().any(|root| path.starts_with(root))
    }

    /// Bring the watches on `watcher` in line with what exists on disk, returning the roots
    /// that were newly watched recursively.
    fn sync(&mut self, watcher: &mut dyn Watcher) -> Result<Vec<PathBuf>, notify::Error> {
        let removed: Vec<_> = self
            .recursive
            .iter()
            .filter(|root| !root.is_dir())
            .cloned()
            .collect();
        for root in removed {
            if let Err(err) = watcher.unwatch(&root) {
                tracing::debug!(?root, ?err, "unwatching removed root");
            }
            tracing::debug!(?root, "source set root removed");
            self.recursive.remove(&root);
            self.pending.insert(root);
        }

        let mut result = Ok(());
        let mut created = Vec::new();
        let ready: Vec<_> = self
            .pending
            .iter()
            .filter(|root| root.is_dir())
            .cloned()
            .collect();
        for root in ready {
            // Nested under another watched root, those events already reach us.
            if self.is_covered(&root) {
                continue;
            }
            if let Err(err) = watcher.watch(&root, RecursiveMode::Recursive) {
                result = Err(err);
                break;
            }
            tracing::debug!(?root, "watching source set root");
            self.pending.remove(&root);
            self.recursive.insert(root.clone());
            created.push(root);
        }

        let wanted: BTreeSet<PathBuf> = self
            .pending
            .iter()
            .filter_map(|root| root.ancestors().skip(1).find(|path| path.is_dir()))
            .filter(|ancestor| !self.is_covered(ancestor))
            .map(Path::to_path_buf)
            .collect();
        let mut ancestors = BTreeSet::new();
        for ancestor in wanted {
            if !self.ancestors.contains(&ancestor) {
                if let Err(err) = watcher.watch(&ancestor, RecursiveMode::NonRecursive) {
                    result = result.and(Err(err));
                    continue;
                }
                tracing::debug!(?ancestor, "watching ancestor of missing root");
            }
            ancestors.insert(ancestor);
        }
        for stale in self.ancestors.difference(&ancestors) {
            if let Err(err) = watcher.unwatch(stale) {
                tracing::debug!(ancestor = ?stale, ?err, "unwatching ancestor");
            }
        }
        self.ancestors = ancestors;

        result.map(|()| created)
    }
}

/// Invalidate every source set affected by `events`, returning the distinct names.
pub fn invalidate_for_events(
    cache: &SourceSetCache,
    events: &[DebouncedEvent],
) -> BTreeSet<SourceSetName> {
    invalidate_for_paths(cache, events.iter().map(|event| event.path.clone()))
}

/// Invalidate every source set that a change to one of `paths` can affect.
pub fn invalidate_for_paths<I>(cache: &SourceSetCache, paths: I) -> BTreeSet<SourceSetName>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut invalidated = BTreeSet::new();
    for path in paths {
        invalidated.extend(cache.invalidate_path(&path));
    }
    invalidated
}
